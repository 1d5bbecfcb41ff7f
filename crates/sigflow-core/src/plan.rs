//! # Compiled Plan
//!
//! The validated output of the compiler and the data contract handed to
//! emitters:
//! - Signal table: `(name, slot)` for every produced signal
//! - Functor table: `(name, consumes, provides, is_pure)`
//! - Event enumeration: impure functors, plus the `NoEvent` sentinel
//! - Layer table: per layer, `(functor, condition signals, marked signals)`
//! - Startup layer designation (always layer 0)
//!
//! A plan is immutable once built. Every lookup goes through the
//! name-to-handle maps built at compile time.

use crate::primitives::{STARTUP_LAYER, change_words};
use crate::schedule::{PlannedLayer, Schedule, ScheduleMode};
use crate::{CompileOptions, EventId, Functor, FunctorId, Input, NodeKey, SigflowError, SignalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A produced signal in the signal table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEntry {
    /// Signal name.
    pub name: String,
    /// Producing functor.
    pub producer: FunctorId,
}

/// One row of the layer table, with every handle resolved to a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerEntry<'p> {
    /// Functor to evaluate.
    pub functor: &'p str,
    /// Signals whose change fires the functor.
    pub condition: Vec<&'p str>,
    /// Whether the functor also fires on its own event.
    pub on_event: bool,
    /// Signals marked changed after the functor fires.
    pub marks: Vec<&'p str>,
}

/// The compiled, validated plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPlan {
    /// Options the plan was compiled with.
    pub(crate) options: CompileOptions,

    /// Functor arena, indexed by FunctorId
    pub(crate) functors: Vec<Functor>,

    /// Signal table, indexed by SignalId (slot)
    pub(crate) signals: Vec<SignalEntry>,

    /// Event enumeration: EventId -> impure functor
    pub(crate) events: Vec<FunctorId>,

    /// Layers in evaluation order
    pub(crate) layers: Vec<PlannedLayer>,

    /// Functor name -> FunctorId
    pub(crate) functor_index: BTreeMap<String, FunctorId>,

    /// Signal name -> SignalId
    pub(crate) signal_index: BTreeMap<String, SignalId>,
}

impl CompiledPlan {
    // =========================================================================
    // TABLES
    // =========================================================================

    /// The signal table: `(name, slot)` in slot order.
    pub fn signal_table(&self) -> impl Iterator<Item = (&str, SignalId)> + '_ {
        self.signals
            .iter()
            .enumerate()
            .map(|(slot, entry)| (entry.name.as_str(), SignalId(slot as u32)))
    }

    /// The functor table, in declaration order.
    #[must_use]
    pub fn functors(&self) -> &[Functor] {
        &self.functors
    }

    /// The event enumeration: `(event, functor)` in declaration order.
    pub fn events(&self) -> impl Iterator<Item = (EventId, &Functor)> + '_ {
        self.events
            .iter()
            .enumerate()
            .filter_map(|(i, id)| self.functor(*id).map(|f| (EventId(i as u32), f)))
    }

    /// Layers in evaluation order.
    #[must_use]
    pub fn layers(&self) -> &[PlannedLayer] {
        &self.layers
    }

    /// The layer table with names resolved, one row per step.
    #[must_use]
    pub fn layer_table(&self) -> Vec<Vec<LayerEntry<'_>>> {
        self.layers
            .iter()
            .map(|layer| {
                layer
                    .steps
                    .iter()
                    .map(|step| LayerEntry {
                        functor: self.functor_name(step.functor),
                        condition: step
                            .trigger
                            .changed
                            .iter()
                            .map(|&s| self.signal_name(s))
                            .collect(),
                        on_event: step.trigger.event.is_some(),
                        marks: step.marks.iter().map(|&s| self.signal_name(s)).collect(),
                    })
                    .collect()
            })
            .collect()
    }

    /// Index of the unconditional startup layer.
    #[must_use]
    pub fn startup_layer(&self) -> usize {
        STARTUP_LAYER
    }

    /// The startup schedule.
    #[must_use]
    pub fn startup_schedule(&self) -> Schedule<'_> {
        Schedule::new(ScheduleMode::Startup, &self.layers)
    }

    /// The process schedule.
    #[must_use]
    pub fn process_schedule(&self) -> Schedule<'_> {
        Schedule::new(ScheduleMode::Process, &self.layers)
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    /// Get a functor by handle.
    #[must_use]
    pub fn functor(&self, id: FunctorId) -> Option<&Functor> {
        self.functors.get(id.index())
    }

    /// Get a functor by name.
    pub fn functor_by_name(&self, name: &str) -> Result<&Functor, SigflowError> {
        self.functor_index
            .get(name)
            .and_then(|&id| self.functor(id))
            .ok_or_else(|| SigflowError::UnknownFunctor(name.to_string()))
    }

    /// Get the event of an impure functor by the functor's name.
    pub fn event_for(&self, functor: &str) -> Result<EventId, SigflowError> {
        self.functor_index
            .get(functor)
            .and_then(|&id| self.functor(id))
            .and_then(|f| f.event)
            .ok_or_else(|| SigflowError::UnknownEvent(functor.to_string()))
    }

    /// Get the stable slot of a produced signal.
    #[must_use]
    pub fn slot_of(&self, name: &str) -> Option<SignalId> {
        self.signal_index.get(name).copied()
    }

    /// Name of a produced signal.
    #[must_use]
    pub fn signal_name(&self, signal: SignalId) -> &str {
        self.signals
            .get(signal.slot())
            .map(|entry| entry.name.as_str())
            .unwrap_or_default()
    }

    /// Name of a functor.
    #[must_use]
    pub fn functor_name(&self, functor: FunctorId) -> &str {
        self.functor(functor)
            .map(|f| f.name.as_str())
            .unwrap_or_default()
    }

    /// Display label of a graph node.
    #[must_use]
    pub fn node_label(&self, key: NodeKey) -> String {
        match key {
            NodeKey::Signal(signal) => self.signal_name(signal).to_string(),
            NodeKey::Event(functor) => self
                .functor(functor)
                .map(Functor::event_label)
                .unwrap_or_default(),
        }
    }

    /// Layer holding a node, if any.
    #[must_use]
    pub fn layer_of(&self, key: NodeKey) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.nodes.contains(&key))
    }

    /// Names of consumed inputs that no functor produces.
    #[must_use]
    pub fn external_inputs(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .functors
            .iter()
            .flat_map(|f| f.consumes.iter())
            .filter_map(|input| match input {
                Input::External(name) => Some(name.as_str()),
                Input::Signal(_) => None,
            })
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Options the plan was compiled with.
    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Number of produced signals (storage slots).
    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Number of declared functors.
    #[must_use]
    pub fn functor_count(&self) -> usize {
        self.functors.len()
    }

    /// Number of external events, excluding the sentinel.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of 32-bit words needed for the change flags.
    #[must_use]
    pub fn storage_words(&self) -> usize {
        change_words(self.signals.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
