//! # Core Type Definitions
//!
//! This module contains all core types for the Sigflow schedule compiler:
//! - Arena handles (`FunctorId`, `SignalId`, `EventId`, `NodeKey`)
//! - Functor declarations and their resolved form (`FunctorDecl`, `Functor`, `Input`)
//! - The external-event domain (`ExternalEvent`)
//! - Error types (`SigflowError`)
//!
//! ## Determinism Guarantees
//!
//! All handles in this module:
//! - Are dense integers assigned in declaration order
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Never depend on hashing or allocation order

use crate::primitives::EVENT_LABEL_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ARENA HANDLES
// =============================================================================

/// Handle of a functor, assigned in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctorId(pub u32);

impl FunctorId {
    /// Position of the functor in the functor arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a produced signal.
///
/// The handle doubles as the signal's storage slot: slots are dense,
/// zero-based and follow the order of first registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId(pub u32);

impl SignalId {
    /// Storage slot of this signal.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Handle of an external event.
///
/// One event exists per impure functor, numbered in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl EventId {
    /// Position of the event in the event enumeration.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the dependency graph.
///
/// Produced signals are nodes, and so is the event pseudo-signal of every
/// impure functor. The pseudo-signal has no storage slot; it only places
/// the functor's event test in the right layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    /// A produced data signal.
    Signal(SignalId),
    /// The event pseudo-signal of an impure functor.
    Event(FunctorId),
}

// =============================================================================
// EXTERNAL EVENT
// =============================================================================

/// The external event supplied to one process pass.
///
/// `NoEvent` is the explicit sentinel: no impure functor is triggered
/// by its event test.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ExternalEvent {
    /// No event is active for this pass.
    #[default]
    NoEvent,
    /// The event of one impure functor is active.
    Event(EventId),
}

impl ExternalEvent {
    /// Check whether this pass's event is the given one.
    #[must_use]
    pub fn matches(self, event: EventId) -> bool {
        self == Self::Event(event)
    }
}

// =============================================================================
// FUNCTOR DECLARATION (INPUT)
// =============================================================================

fn default_pure() -> bool {
    true
}

/// A functor as declared by the user, before any validation.
///
/// Names are plain strings here; the compiler maps them to handles once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctorDecl {
    /// Unique functor name.
    pub name: String,
    /// Consumed signal names, in parameter order.
    #[serde(default)]
    pub consumes: Vec<String>,
    /// Produced signal names.
    #[serde(default)]
    pub provides: Vec<String>,
    /// Pure functors fire only on input changes; impure ones also on their event.
    #[serde(default = "default_pure")]
    pub pure: bool,
}

impl FunctorDecl {
    /// Declare a pure functor.
    #[must_use]
    pub fn pure(name: impl Into<String>, consumes: &[&str], provides: &[&str]) -> Self {
        Self {
            name: name.into(),
            consumes: consumes.iter().map(|s| (*s).to_string()).collect(),
            provides: provides.iter().map(|s| (*s).to_string()).collect(),
            pure: true,
        }
    }

    /// Declare an impure functor (a source reacting to its own event).
    #[must_use]
    pub fn impure(name: impl Into<String>, consumes: &[&str], provides: &[&str]) -> Self {
        Self {
            pure: false,
            ..Self::pure(name, consumes, provides)
        }
    }
}

// =============================================================================
// RESOLVED FUNCTOR
// =============================================================================

/// A consumed input after name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Input {
    /// A signal produced by some functor.
    Signal(SignalId),
    /// A name no functor produces. Treated as never changing.
    External(String),
}

/// A functor after validation, with every name mapped to a handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Functor {
    /// Arena handle.
    pub id: FunctorId,
    /// Unique functor name.
    pub name: String,
    /// Consumed inputs, in declaration order.
    pub consumes: Vec<Input>,
    /// Produced signals, in declaration order.
    pub provides: Vec<SignalId>,
    /// Purity flag.
    pub is_pure: bool,
    /// The functor's event, present exactly when it is impure.
    pub event: Option<EventId>,
}

impl Functor {
    /// Consumed inputs that are produced signals.
    pub fn consumed_signals(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.consumes.iter().filter_map(|input| match input {
            Input::Signal(id) => Some(*id),
            Input::External(_) => None,
        })
    }

    /// Consumed inputs that no functor produces.
    pub fn external_inputs(&self) -> impl Iterator<Item = &str> + '_ {
        self.consumes.iter().filter_map(|input| match input {
            Input::Signal(_) => None,
            Input::External(name) => Some(name.as_str()),
        })
    }

    /// A functor owns at least one graph node when it provides a signal
    /// or has an event. Pure functors without outputs are never scheduled.
    #[must_use]
    pub fn is_schedulable(&self) -> bool {
        !self.provides.is_empty() || self.event.is_some()
    }

    /// Label of this functor's event pseudo-signal.
    #[must_use]
    pub fn event_label(&self) -> String {
        format!("{}{}", EVENT_LABEL_PREFIX, self.name)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// What kind of name failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// A functor name.
    Functor,
    /// A signal name.
    Signal,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Functor => write!(f, "functor"),
            Self::Signal => write!(f, "signal"),
        }
    }
}

/// Errors that can occur in the Sigflow compiler.
///
/// - Every graph error is detected before any schedule is synthesized
/// - Use `Result<T, SigflowError>` for fallible operations
/// - The CORE never panics
#[derive(Debug, Error)]
pub enum SigflowError {
    /// A functor or signal name is empty or uses reserved characters.
    #[error("Invalid {kind} name: {name:?}")]
    InvalidName {
        /// Kind of the rejected name.
        kind: NameKind,
        /// The rejected name.
        name: String,
    },

    /// Two functors share a name.
    #[error("Duplicate functor: {0}")]
    DuplicateFunctor(String),

    /// A functor lists the same consumed signal twice.
    #[error("Functor {functor} consumes {signal} more than once")]
    DuplicateInput {
        /// The offending functor.
        functor: String,
        /// The repeated signal.
        signal: String,
    },

    /// Two functors (or one functor twice) produce the same signal.
    #[error("Signal {signal} is produced by both {first} and {second}")]
    DuplicateProducer {
        /// The contested signal.
        signal: String,
        /// Functor that registered the signal first.
        first: String,
        /// Functor that tried to register it again.
        second: String,
    },

    /// A functor consumes a signal no functor produces, with dangling inputs disallowed.
    #[error("Functor {functor} consumes {signal}, which no functor produces")]
    DanglingDependency {
        /// The consuming functor.
        functor: String,
        /// The unproduced signal.
        signal: String,
    },

    /// The dependency graph has no topological layering.
    #[error("Cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// Nodes along one cycle, in dependency order.
        cycle: Vec<String>,
    },

    /// The declaration exceeds the compiler's capacity limits.
    #[error("Too many {kind}s: limit is {limit}")]
    CapacityExceeded {
        /// What overflowed.
        kind: NameKind,
        /// The limit.
        limit: usize,
    },

    /// The requested functor does not exist in the plan.
    #[error("Unknown functor: {0}")]
    UnknownFunctor(String),

    /// The requested event does not exist (the functor is pure or unknown).
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// An emitter could not render the plan.
    #[error("Emit error: {0}")]
    EmitError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_event_matches_only_itself() {
        let event = ExternalEvent::Event(EventId(2));
        assert!(event.matches(EventId(2)));
        assert!(!event.matches(EventId(1)));
        assert!(!ExternalEvent::NoEvent.matches(EventId(0)));
    }

    #[test]
    fn decl_defaults_to_pure() {
        let decl: FunctorDecl = serde_json::from_str(r#"{"name":"g","consumes":["a"]}"#)
            .expect("parse");
        assert!(decl.pure);
        assert!(decl.provides.is_empty());
    }

    #[test]
    fn functor_splits_inputs() {
        let functor = Functor {
            id: FunctorId(0),
            name: "i".to_string(),
            consumes: vec![
                Input::Signal(SignalId(3)),
                Input::External("env".to_string()),
            ],
            provides: vec![SignalId(4)],
            is_pure: true,
            event: None,
        };

        assert_eq!(functor.consumed_signals().collect::<Vec<_>>(), vec![SignalId(3)]);
        assert_eq!(functor.external_inputs().collect::<Vec<_>>(), vec!["env"]);
        assert!(functor.is_schedulable());
    }

    #[test]
    fn pure_functor_without_outputs_is_not_schedulable() {
        let functor = Functor {
            id: FunctorId(0),
            name: "sink".to_string(),
            consumes: vec![Input::Signal(SignalId(0))],
            provides: vec![],
            is_pure: true,
            event: None,
        };
        assert!(!functor.is_schedulable());
    }

    #[test]
    fn cyclic_error_names_the_cycle() {
        let err = SigflowError::CyclicDependency {
            cycle: vec!["x".to_string(), "y".to_string(), "x".to_string()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency: x -> y -> x");
    }
}
