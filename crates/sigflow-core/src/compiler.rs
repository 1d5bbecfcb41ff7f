//! # Compiler
//!
//! Runs the whole pipeline, fail-fast:
//!
//! ```text
//! declarations -> name checks -> SignalRegistry -> dangling check
//!              -> DependencyGraph -> LayerPlanner -> ScheduleSynthesizer
//!              -> CompiledPlan
//! ```
//!
//! Every error is reported before any schedule is synthesized; a failed
//! compilation produces no partial plan.

use crate::primitives::{MAX_FUNCTOR_COUNT, MAX_NAME_LENGTH, RESERVED_NAME_CHARS};
use crate::{
    CompiledPlan, DependencyGraph, EventId, Functor, FunctorDecl, FunctorId, Input, LayerPlanner,
    NameKind, ScheduleSynthesizer, SigflowError, SignalEntry, SignalId, SignalRegistry,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Compiler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Accept consumed signals that no functor produces.
    ///
    /// When `true`, such inputs are environment inputs that never change;
    /// when `false` (the default), they fail with `DanglingDependency`.
    #[serde(default)]
    pub allow_dangling_inputs: bool,
}

/// The schedule compiler.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a strict compiler (dangling inputs rejected).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler that accepts dangling inputs.
    #[must_use]
    pub fn permissive() -> Self {
        Self::with_options(CompileOptions {
            allow_dangling_inputs: true,
        })
    }

    /// Create a compiler with explicit options.
    #[must_use]
    pub fn with_options(options: CompileOptions) -> Self {
        Self { options }
    }

    /// The compiler's options.
    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a functor list into a plan.
    pub fn compile(&self, decls: &[FunctorDecl]) -> Result<CompiledPlan, SigflowError> {
        Self::validate_decls(decls)?;

        let mut registry = SignalRegistry::new();
        for decl in decls {
            registry.register(decl)?;
        }

        let functors = Self::resolve(decls, &registry);
        self.check_dangling(&functors)?;

        let graph = DependencyGraph::build(&functors, &registry);
        let layering = LayerPlanner::plan(&graph)?;
        let layers = ScheduleSynthesizer::synthesize(&graph, &layering, &functors);

        for functor in functors.iter().filter(|f| !f.is_schedulable()) {
            tracing::warn!(functor = %functor.name, "pure functor provides nothing; never scheduled");
        }

        tracing::debug!(
            functors = functors.len(),
            signals = registry.len(),
            nodes = graph.node_count(),
            layers = layers.len(),
            "plan compiled"
        );

        let signals = registry
            .all_signals()
            .iter()
            .enumerate()
            .filter_map(|(slot, name)| {
                registry
                    .producer_of(SignalId(slot as u32))
                    .map(|producer| SignalEntry {
                        name: name.clone(),
                        producer,
                    })
            })
            .collect::<Vec<_>>();

        Ok(CompiledPlan {
            options: self.options,
            events: functors
                .iter()
                .filter(|f| f.event.is_some())
                .map(|f| f.id)
                .collect(),
            functor_index: functors.iter().map(|f| (f.name.clone(), f.id)).collect(),
            signal_index: signals
                .iter()
                .enumerate()
                .map(|(slot, entry)| (entry.name.clone(), SignalId(slot as u32)))
                .collect(),
            signals,
            functors,
            layers,
        })
    }

    /// Check names, functor uniqueness and per-functor input uniqueness.
    fn validate_decls(decls: &[FunctorDecl]) -> Result<(), SigflowError> {
        if decls.len() > MAX_FUNCTOR_COUNT {
            return Err(SigflowError::CapacityExceeded {
                kind: NameKind::Functor,
                limit: MAX_FUNCTOR_COUNT,
            });
        }

        let mut names = BTreeSet::new();
        for decl in decls {
            check_name(NameKind::Functor, &decl.name)?;
            if !names.insert(decl.name.as_str()) {
                return Err(SigflowError::DuplicateFunctor(decl.name.clone()));
            }

            let mut inputs = BTreeSet::new();
            for signal in &decl.consumes {
                check_name(NameKind::Signal, signal)?;
                if !inputs.insert(signal.as_str()) {
                    return Err(SigflowError::DuplicateInput {
                        functor: decl.name.clone(),
                        signal: signal.clone(),
                    });
                }
            }
            for signal in &decl.provides {
                check_name(NameKind::Signal, signal)?;
            }
        }
        Ok(())
    }

    /// Map every name to its handle and number the events.
    fn resolve(decls: &[FunctorDecl], registry: &SignalRegistry) -> Vec<Functor> {
        let mut next_event = 0u32;
        decls
            .iter()
            .enumerate()
            .map(|(i, decl)| {
                let event = if decl.pure {
                    None
                } else {
                    next_event += 1;
                    Some(EventId(next_event - 1))
                };
                Functor {
                    id: FunctorId(i as u32),
                    name: decl.name.clone(),
                    consumes: decl
                        .consumes
                        .iter()
                        .map(|name| match registry.slot_of(name) {
                            Some(signal) => Input::Signal(signal),
                            None => Input::External(name.clone()),
                        })
                        .collect(),
                    provides: decl
                        .provides
                        .iter()
                        .filter_map(|name| registry.slot_of(name))
                        .collect(),
                    is_pure: decl.pure,
                    event,
                }
            })
            .collect()
    }

    fn check_dangling(&self, functors: &[Functor]) -> Result<(), SigflowError> {
        let mut dangling: BTreeMap<&str, &str> = BTreeMap::new();
        for functor in functors {
            for name in functor.external_inputs() {
                if !self.options.allow_dangling_inputs {
                    return Err(SigflowError::DanglingDependency {
                        functor: functor.name.clone(),
                        signal: name.to_string(),
                    });
                }
                dangling.entry(name).or_insert(functor.name.as_str());
            }
        }
        for (signal, functor) in dangling {
            tracing::warn!(%signal, first_consumer = %functor, "input has no producer; treated as unchanging");
        }
        Ok(())
    }
}

/// Reject empty, overlong, whitespace-bearing or reserved names.
fn check_name(kind: NameKind, name: &str) -> Result<(), SigflowError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && !name.chars().any(|c| c.is_whitespace() || c.is_control())
        && !name.contains(RESERVED_NAME_CHARS);
    if valid {
        Ok(())
    } else {
        Err(SigflowError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
