//! # Schedule Synthesis
//!
//! Turns a layering into per-layer evaluation steps.
//!
//! A step fires when any consumed signal changed in the current pass, or,
//! for an impure functor, when the pass's external event is its own.
//! Firing means: invoke the functor, then mark every signal it provides.
//!
//! Two schedules are derived from the same layers:
//! - **Startup**: layer 0 fires unconditionally, later layers conditionally
//! - **Process**: every layer fires conditionally
//!
//! Because layers follow the acyclic dependency order, one forward pass
//! reaches every dependent functor exactly once.

use crate::primitives::STARTUP_LAYER;
use crate::runtime::ChangeSet;
use crate::{
    DependencyGraph, EventId, ExternalEvent, Functor, FunctorId, FunctorResolver, Layering,
    NodeKey, SignalId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// TRIGGER & STEP
// =============================================================================

/// The firing predicate of one step.
///
/// `OR(changed(c) for c in changed) OR (event == this.event)`.
/// Unproduced inputs never change and are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Consumed signals whose change fires the step.
    pub changed: Vec<SignalId>,
    /// The functor's own event, for impure functors.
    pub event: Option<EventId>,
}

impl Trigger {
    /// Build the trigger of a functor.
    #[must_use]
    pub fn for_functor(functor: &Functor) -> Self {
        Self {
            changed: functor.consumed_signals().collect(),
            event: functor.event,
        }
    }

    /// Evaluate the predicate against a pass's flags and event.
    pub fn is_satisfied<C: ChangeSet + ?Sized>(&self, flags: &C, event: ExternalEvent) -> bool {
        self.changed.iter().any(|&s| flags.is_changed(s))
            || self.event.is_some_and(|own| event.matches(own))
    }

    /// True when no input change and no event can ever satisfy the trigger.
    ///
    /// Such a step only fires during startup.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.changed.is_empty() && self.event.is_none()
    }
}

/// One functor's entry in a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// The functor to evaluate.
    pub functor: FunctorId,
    /// When it fires.
    pub trigger: Trigger,
    /// Signals marked changed when it fires.
    pub marks: Vec<SignalId>,
}

/// One layer of the compiled plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedLayer {
    /// Position of the layer (0 = startup layer).
    pub index: usize,
    /// Signals and event pseudo-signals in this layer, in registration order.
    pub nodes: Vec<NodeKey>,
    /// Distinct functors to evaluate, in `FunctorId` order.
    pub steps: Vec<Step>,
}

// =============================================================================
// SCHEDULE
// =============================================================================

/// Which pass a schedule drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleMode {
    /// The first pass: seeds every layer-0 output.
    Startup,
    /// An incremental pass driven by one external event.
    Process,
}

/// How the steps of a layer are gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firing {
    /// Every step fires.
    Unconditional,
    /// Steps fire when their trigger is satisfied.
    Conditional,
}

/// A view of the plan's layers in one mode.
#[derive(Debug, Clone, Copy)]
pub struct Schedule<'p> {
    mode: ScheduleMode,
    layers: &'p [PlannedLayer],
}

impl<'p> Schedule<'p> {
    /// Create a schedule over planned layers.
    #[must_use]
    pub fn new(mode: ScheduleMode, layers: &'p [PlannedLayer]) -> Self {
        Self { mode, layers }
    }

    /// The schedule's mode.
    #[must_use]
    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    /// Gating of a layer in this mode.
    #[must_use]
    pub fn firing(&self, layer: usize) -> Firing {
        match self.mode {
            ScheduleMode::Startup if layer == STARTUP_LAYER => Firing::Unconditional,
            _ => Firing::Conditional,
        }
    }

    /// Layers in evaluation order, with their gating.
    pub fn layers(&self) -> impl Iterator<Item = (&'p PlannedLayer, Firing)> + '_ {
        self.layers
            .iter()
            .map(move |layer| (layer, self.firing(layer.index)))
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total number of steps across all layers.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.steps.len()).sum()
    }
}

// =============================================================================
// SYNTHESIZER
// =============================================================================

/// Builds planned layers from a layering.
pub struct ScheduleSynthesizer;

impl ScheduleSynthesizer {
    /// Synthesize one `PlannedLayer` per layer.
    ///
    /// `functors` must be indexed by `FunctorId`.
    #[must_use]
    pub fn synthesize(
        graph: &DependencyGraph,
        layering: &Layering,
        functors: &[Functor],
    ) -> Vec<PlannedLayer> {
        let resolver = FunctorResolver::new(graph);

        layering
            .iter()
            .enumerate()
            .map(|(index, members)| {
                let nodes = members
                    .iter()
                    .filter_map(|&n| graph.node(n).map(|node| node.key))
                    .collect();
                let steps = resolver
                    .functors_in(members)
                    .into_iter()
                    .filter_map(|id| functors.get(id.index()))
                    .map(|functor| Step {
                        functor: functor.id,
                        trigger: Trigger::for_functor(functor),
                        marks: functor.provides.clone(),
                    })
                    .collect();
                PlannedLayer {
                    index,
                    nodes,
                    steps,
                }
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
