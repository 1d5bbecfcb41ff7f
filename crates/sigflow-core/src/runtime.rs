//! # Pass Runtime
//!
//! Reference executor for compiled schedules.
//!
//! The CORE never runs functor bodies: a [`FunctorHost`] does. This module
//! only walks a schedule the way generated code must:
//!
//! ```text
//! Reset -> Layer(0) -> Layer(1) -> ... -> Layer(N) -> Idle
//! ```
//!
//! - Change flags and the event live in a [`PassContext`] owned by one pass
//! - The event is fixed at pass entry
//! - A flag set in layer k is read only by layers k+1 and later
//! - No functor fires more than once per pass

use crate::primitives::{CHANGE_WORD_BITS, change_words};
use crate::schedule::{Firing, Schedule, ScheduleMode};
use crate::{CompiledPlan, ExternalEvent, Functor, FunctorId, SignalId};

// =============================================================================
// CHANGE FLAGS
// =============================================================================

/// The mark/test capability over per-signal change flags.
pub trait ChangeSet {
    /// Mark a slot changed. Slots outside the set are ignored.
    fn mark(&mut self, slot: SignalId);

    /// Test whether a slot changed. Slots outside the set never change.
    fn is_changed(&self, slot: SignalId) -> bool;

    /// Clear every flag.
    fn reset(&mut self);
}

/// Change flags packed into 32-bit words, one bit per signal slot.
///
/// Same layout as the bitfield in emitted C code. Only built through
/// [`ChangeFlags::new`], so the word count always matches `len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFlags {
    words: Vec<u32>,
    len: usize,
}

impl ChangeFlags {
    /// Create cleared flags for `len` slots.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; change_words(len)],
            len,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if any slot is marked.
    #[must_use]
    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// All marked slots, ascending.
    #[must_use]
    pub fn changed_slots(&self) -> Vec<SignalId> {
        (0..self.len)
            .map(|slot| SignalId(slot as u32))
            .filter(|&s| self.is_changed(s))
            .collect()
    }

    /// Raw storage words.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    fn locate(slot: SignalId) -> (usize, u32) {
        (
            slot.slot() / CHANGE_WORD_BITS,
            1 << (slot.slot() % CHANGE_WORD_BITS),
        )
    }
}

impl Default for ChangeFlags {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ChangeSet for ChangeFlags {
    fn mark(&mut self, slot: SignalId) {
        if slot.slot() >= self.len {
            return;
        }
        let (word, bit) = Self::locate(slot);
        if let Some(w) = self.words.get_mut(word) {
            *w |= bit;
        }
    }

    fn is_changed(&self, slot: SignalId) -> bool {
        let (word, bit) = Self::locate(slot);
        slot.slot() < self.len && self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    fn reset(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }
}

// =============================================================================
// PASS CONTEXT
// =============================================================================

/// Where a pass is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassPhase {
    /// Flags cleared, event latched.
    Reset,
    /// Evaluating the given layer.
    Layer(usize),
    /// The pass has completed.
    Idle,
}

/// All mutable state of one pass.
///
/// Created at pass entry, borrowed mutably by every layer, dropped when
/// the pass returns. Never shared between passes.
#[derive(Debug)]
pub struct PassContext {
    event: ExternalEvent,
    flags: ChangeFlags,
    phase: PassPhase,
}

impl PassContext {
    /// Enter a pass: latch the event and clear every flag.
    #[must_use]
    pub fn enter(event: ExternalEvent, signal_count: usize) -> Self {
        Self {
            event,
            flags: ChangeFlags::new(signal_count),
            phase: PassPhase::Reset,
        }
    }

    /// The event latched at entry.
    #[must_use]
    pub fn event(&self) -> ExternalEvent {
        self.event
    }

    /// Current change flags.
    #[must_use]
    pub fn flags(&self) -> &ChangeFlags {
        &self.flags
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PassPhase {
        self.phase
    }
}

// =============================================================================
// HOST & RUNNER
// =============================================================================

/// Runs functor bodies on behalf of the runner.
///
/// Implemented for any `FnMut(&Functor)`.
pub trait FunctorHost {
    /// Evaluate one functor with its current inputs.
    fn invoke(&mut self, functor: &Functor);
}

impl<F: FnMut(&Functor)> FunctorHost for F {
    fn invoke(&mut self, functor: &Functor) {
        self(functor);
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Which schedule ran.
    pub mode: ScheduleMode,
    /// The event latched at entry.
    pub event: ExternalEvent,
    /// Functors fired, in evaluation order.
    pub fired: Vec<FunctorId>,
    /// Final change flags.
    pub flags: ChangeFlags,
}

impl PassReport {
    /// Check whether a functor fired during the pass.
    #[must_use]
    pub fn fired(&self, functor: FunctorId) -> bool {
        self.fired.contains(&functor)
    }
}

/// Executes the startup and process schedules of a plan.
pub struct ScheduleRunner<'p> {
    plan: &'p CompiledPlan,
}

impl<'p> ScheduleRunner<'p> {
    /// Create a runner for a compiled plan.
    #[must_use]
    pub fn new(plan: &'p CompiledPlan) -> Self {
        Self { plan }
    }

    /// Run the startup pass.
    ///
    /// Layer 0 fires unconditionally; later layers follow their triggers
    /// with no external event active.
    pub fn startup<H: FunctorHost + ?Sized>(&self, host: &mut H) -> PassReport {
        self.run(self.plan.startup_schedule(), ExternalEvent::NoEvent, host)
    }

    /// Run one process pass for the given event.
    pub fn process<H: FunctorHost + ?Sized>(
        &self,
        event: ExternalEvent,
        host: &mut H,
    ) -> PassReport {
        self.run(self.plan.process_schedule(), event, host)
    }

    fn run<H: FunctorHost + ?Sized>(
        &self,
        schedule: Schedule<'_>,
        event: ExternalEvent,
        host: &mut H,
    ) -> PassReport {
        let mut ctx = PassContext::enter(event, self.plan.signal_count());
        let mut fired = Vec::new();

        for (layer, firing) in schedule.layers() {
            ctx.phase = PassPhase::Layer(layer.index);

            // Decide every step against the flags as they stood at layer
            // entry. Steps of one layer never consume each other's outputs.
            let ready: Vec<_> = layer
                .steps
                .iter()
                .filter(|step| {
                    firing == Firing::Unconditional
                        || step.trigger.is_satisfied(&ctx.flags, ctx.event)
                })
                .collect();

            for step in ready {
                if let Some(functor) = self.plan.functor(step.functor) {
                    tracing::trace!(functor = %functor.name, layer = layer.index, "fire");
                    host.invoke(functor);
                }
                for &signal in &step.marks {
                    ctx.flags.mark(signal);
                }
                fired.push(step.functor);
            }
        }

        ctx.phase = PassPhase::Idle;
        tracing::debug!(
            mode = ?schedule.mode(),
            layers = schedule.layer_count(),
            fired = fired.len(),
            phase = ?ctx.phase(),
            "pass complete"
        );

        PassReport {
            mode: schedule.mode(),
            event: ctx.event(),
            fired,
            flags: ctx.flags,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
