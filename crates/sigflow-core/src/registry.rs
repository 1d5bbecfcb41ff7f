//! # Signal Registry
//!
//! Assigns every produced signal a dense, stable storage slot and
//! rejects duplicate producers.
//!
//! - Slots follow the order of first registration
//! - Names consumed but never produced are not registered here
//! - Name-to-handle lookup is built once, during registration

use crate::primitives::MAX_SIGNAL_COUNT;
use crate::{FunctorDecl, FunctorId, NameKind, SigflowError, SignalId};
use std::collections::BTreeMap;

/// The Signal Registry records which functor produces which signal.
#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    /// Slot -> signal name
    names: Vec<String>,

    /// Slot -> producing functor
    producers: Vec<FunctorId>,

    /// Signal name -> slot
    index: BTreeMap<String, SignalId>,

    /// FunctorId -> functor name, for diagnostics
    functors: Vec<String>,
}

impl SignalRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a functor and every signal it provides.
    ///
    /// Returns the functor's handle. Fails with `DuplicateProducer` if any
    /// provided name is already registered (also when the functor lists
    /// the same output twice). On failure nothing is recorded.
    pub fn register(&mut self, decl: &FunctorDecl) -> Result<FunctorId, SigflowError> {
        let id = FunctorId(self.functors.len() as u32);

        for (pos, name) in decl.provides.iter().enumerate() {
            if let Some(existing) = self.index.get(name) {
                let first = self
                    .producer_of(*existing)
                    .and_then(|f| self.functors.get(f.index()))
                    .cloned()
                    .unwrap_or_default();
                return Err(SigflowError::DuplicateProducer {
                    signal: name.clone(),
                    first,
                    second: decl.name.clone(),
                });
            }
            if decl.provides[..pos].contains(name) {
                return Err(SigflowError::DuplicateProducer {
                    signal: name.clone(),
                    first: decl.name.clone(),
                    second: decl.name.clone(),
                });
            }
        }

        if self.names.len() + decl.provides.len() > MAX_SIGNAL_COUNT {
            return Err(SigflowError::CapacityExceeded {
                kind: NameKind::Signal,
                limit: MAX_SIGNAL_COUNT,
            });
        }

        for name in &decl.provides {
            let slot = SignalId(self.names.len() as u32);
            self.names.push(name.clone());
            self.producers.push(id);
            self.index.insert(name.clone(), slot);
        }
        self.functors.push(decl.name.clone());

        Ok(id)
    }

    /// Get the stable slot of a produced signal.
    #[must_use]
    pub fn slot_of(&self, name: &str) -> Option<SignalId> {
        self.index.get(name).copied()
    }

    /// Get the name of a registered signal.
    #[must_use]
    pub fn name_of(&self, signal: SignalId) -> Option<&str> {
        self.names.get(signal.slot()).map(String::as_str)
    }

    /// Get the functor producing a registered signal.
    #[must_use]
    pub fn producer_of(&self, signal: SignalId) -> Option<FunctorId> {
        self.producers.get(signal.slot()).copied()
    }

    /// All produced signal names, in slot order.
    ///
    /// This order is authoritative for slot indices and storage size.
    #[must_use]
    pub fn all_signals(&self) -> &[String] {
        &self.names
    }

    /// Number of registered signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no signal is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of registered functors.
    #[must_use]
    pub fn functor_count(&self) -> usize {
        self.functors.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_registration_order() {
        let mut registry = SignalRegistry::new();
        registry
            .register(&FunctorDecl::impure("a", &[], &["a"]))
            .expect("register");
        registry
            .register(&FunctorDecl::pure("ef", &["a"], &["e", "f"]))
            .expect("register");

        assert_eq!(registry.slot_of("a"), Some(SignalId(0)));
        assert_eq!(registry.slot_of("e"), Some(SignalId(1)));
        assert_eq!(registry.slot_of("f"), Some(SignalId(2)));
        assert_eq!(registry.all_signals(), &["a", "e", "f"]);
        assert_eq!(registry.producer_of(SignalId(2)), Some(FunctorId(1)));
    }

    #[test]
    fn consumed_only_names_get_no_slot() {
        let mut registry = SignalRegistry::new();
        registry
            .register(&FunctorDecl::pure("g", &["env"], &["g"]))
            .expect("register");

        assert_eq!(registry.slot_of("env"), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_producer_rejected() {
        let mut registry = SignalRegistry::new();
        registry
            .register(&FunctorDecl::pure("x", &[], &["s"]))
            .expect("register");
        let err = registry
            .register(&FunctorDecl::pure("y", &[], &["t", "s"]))
            .expect_err("duplicate");

        match err {
            SigflowError::DuplicateProducer {
                signal,
                first,
                second,
            } => {
                assert_eq!(signal, "s");
                assert_eq!(first, "x");
                assert_eq!(second, "y");
            }
            other => unreachable!("unexpected error: {other}"),
        }

        // Failed registration leaves no partial state
        assert_eq!(registry.slot_of("t"), None);
        assert_eq!(registry.functor_count(), 1);
    }

    #[test]
    fn repeated_output_in_one_functor_rejected() {
        let mut registry = SignalRegistry::new();
        let result = registry.register(&FunctorDecl::pure("x", &[], &["s", "s"]));
        assert!(matches!(
            result,
            Err(SigflowError::DuplicateProducer { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn functor_without_outputs_still_gets_handle() {
        let mut registry = SignalRegistry::new();
        let a = registry
            .register(&FunctorDecl::pure("sink", &["x"], &[]))
            .expect("register");
        let b = registry
            .register(&FunctorDecl::pure("x", &[], &["x"]))
            .expect("register");

        assert_eq!(a, FunctorId(0));
        assert_eq!(b, FunctorId(1));
        assert_eq!(registry.slot_of("x"), Some(SignalId(0)));
    }
}
