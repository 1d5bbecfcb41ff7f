//! # sigflow-core
//!
//! The deterministic schedule compiler for Sigflow - THE LOGIC.
//!
//! Sigflow turns a declarative list of *functors* (named units consuming and
//! producing named signals, each pure or impure) into a static scheduler for
//! an event-driven evaluation loop:
//!
//! 1. Every produced signal gets a dense, stable storage slot
//! 2. Signals and event pseudo-signals form a dependency graph
//! 3. The graph is layered topologically; cycles are rejected
//! 4. Each layer becomes a list of steps, each fired only when an input
//!    changed or, for impure functors, when their own event is active
//!
//! ## Architectural Constraints
//!
//! - Functor bodies are opaque: the CORE decides *when* they run, never *what*
//! - The graph is frozen at compile time
//! - No async, no file or network I/O (pure Rust)
//! - Deterministic: same declarations, same plan, same bytes
//!
//! ## Example
//!
//! ```
//! use sigflow_core::{Compiler, ExternalEvent, Functor, FunctorDecl, ScheduleRunner};
//!
//! let plan = Compiler::new()
//!     .compile(&[
//!         FunctorDecl::impure("sensor", &[], &["raw"]),
//!         FunctorDecl::pure("filter", &["raw"], &["smooth"]),
//!     ])
//!     .expect("valid graph");
//!
//! let runner = ScheduleRunner::new(&plan);
//! let event = ExternalEvent::Event(plan.event_for("sensor").expect("impure"));
//! let report = runner.process(event, &mut |_: &Functor| {});
//! assert_eq!(report.fired.len(), 2);
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod compiler;
pub mod dependency;
pub mod emit;
pub mod formats;
pub mod plan;
pub mod planner;
pub mod primitives;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod schedule;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    EventId, ExternalEvent, Functor, FunctorDecl, FunctorId, Input, NameKind, NodeKey,
    SigflowError, SignalId,
};

// =============================================================================
// RE-EXPORTS: Compiler Pipeline
// =============================================================================

pub use compiler::{CompileOptions, Compiler};
pub use dependency::{DependencyGraph, DependencyNode};
pub use plan::{CompiledPlan, LayerEntry, SignalEntry};
pub use planner::{LayerPlanner, Layering};
pub use registry::SignalRegistry;
pub use resolver::FunctorResolver;
pub use schedule::{
    Firing, PlannedLayer, Schedule, ScheduleMode, ScheduleSynthesizer, Step, Trigger,
};

// =============================================================================
// RE-EXPORTS: Runtime & Emission
// =============================================================================

pub use emit::{Artifact, CEmitter, Emitter};
pub use runtime::{
    ChangeFlags, ChangeSet, FunctorHost, PassContext, PassPhase, PassReport, ScheduleRunner,
};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::plan_hash;
pub use formats::{MAX_PLAN_PAYLOAD_SIZE, PlanHeader, plan_checksum, plan_from_bytes, plan_to_bytes};
