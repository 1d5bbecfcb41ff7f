//! # Property-Based Tests
//!
//! Layering, scheduling and determinism invariants over random acyclic
//! functor graphs.

use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;
use sigflow_core::{
    Compiler, ExternalEvent, Functor, FunctorDecl, NodeKey, ScheduleRunner, SigflowError,
    plan_to_bytes,
};
use std::collections::BTreeSet;

// =============================================================================
// GENERATORS
// =============================================================================

/// Functor `i` provides `s<i>` and consumes up to three signals of earlier
/// functors, so every generated graph is acyclic.
fn dag_decls(shape: &[(bool, Vec<Index>)]) -> Vec<FunctorDecl> {
    shape
        .iter()
        .enumerate()
        .map(|(i, (impure, picks))| {
            let consumes: BTreeSet<String> = if i == 0 {
                BTreeSet::new()
            } else {
                picks.iter().map(|p| format!("s{}", p.index(i))).collect()
            };
            FunctorDecl {
                name: format!("f{i}"),
                consumes: consumes.into_iter().collect(),
                provides: vec![format!("s{i}")],
                pure: !impure,
            }
        })
        .collect()
}

fn dag_shape() -> impl Strategy<Value = Vec<(bool, Vec<Index>)>> {
    vec((any::<bool>(), vec(any::<Index>(), 0..4)), 1..24)
}

/// Functors reachable from `root` through consumption, `root` included.
fn downstream_of(decls: &[FunctorDecl], root: usize) -> BTreeSet<String> {
    let mut reached = BTreeSet::from([decls[root].name.clone()]);
    let mut produced: BTreeSet<String> = decls[root].provides.iter().cloned().collect();
    // Consumers always follow their producers in declaration order
    for decl in &decls[root + 1..] {
        if decl.consumes.iter().any(|c| produced.contains(c)) {
            reached.insert(decl.name.clone());
            produced.extend(decl.provides.iter().cloned());
        }
    }
    reached
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every node lands in exactly one layer.
    #[test]
    fn layers_partition_the_nodes(shape in dag_shape()) {
        let decls = dag_decls(&shape);
        let plan = Compiler::new().compile(&decls).expect("acyclic graph compiles");

        let mut seen = BTreeSet::new();
        for layer in plan.layers() {
            for &key in &layer.nodes {
                prop_assert!(seen.insert(key), "node {:?} in two layers", key);
            }
        }
        prop_assert_eq!(seen.len(), plan.signal_count() + plan.event_count());
    }

    /// Every consumed signal sits in a strictly earlier layer than the outputs
    /// and the event of its consumer.
    #[test]
    fn consumers_strictly_after_producers(shape in dag_shape()) {
        let decls = dag_decls(&shape);
        let plan = Compiler::new().compile(&decls).expect("compile");

        for functor in plan.functors() {
            let own: Vec<NodeKey> = functor
                .provides
                .iter()
                .map(|&s| NodeKey::Signal(s))
                .chain(functor.event.map(|_| NodeKey::Event(functor.id)))
                .collect();
            for input in functor.consumed_signals() {
                let before = plan.layer_of(NodeKey::Signal(input)).expect("input layer");
                for &key in &own {
                    let after = plan.layer_of(key).expect("output layer");
                    prop_assert!(before < after);
                }
            }
        }
    }

    /// A pass with no event and no seeded change fires nothing.
    #[test]
    fn idle_pass_fires_nothing(shape in dag_shape()) {
        let plan = Compiler::new().compile(&dag_decls(&shape)).expect("compile");
        let report = ScheduleRunner::new(&plan).process(ExternalEvent::NoEvent, &mut |_: &Functor| {});

        prop_assert!(report.fired.is_empty());
        prop_assert!(!report.flags.any());
    }

    /// An event fires exactly its functor and everything downstream, once each.
    #[test]
    fn event_fires_exactly_its_downstream(shape in dag_shape(), pick in any::<Index>()) {
        let decls = dag_decls(&shape);
        let plan = Compiler::new().compile(&decls).expect("compile");

        let impure: Vec<usize> = (0..decls.len()).filter(|&i| !decls[i].pure).collect();
        prop_assume!(!impure.is_empty());
        let root = impure[pick.index(impure.len())];

        let event = plan.event_for(&decls[root].name).expect("event");
        let mut invoked = Vec::new();
        let report = ScheduleRunner::new(&plan)
            .process(ExternalEvent::Event(event), &mut |f: &Functor| invoked.push(f.name.clone()));

        let unique: BTreeSet<String> = invoked.iter().cloned().collect();
        prop_assert_eq!(unique.len(), invoked.len(), "a functor fired twice");
        prop_assert_eq!(unique, downstream_of(&decls, root));
        prop_assert_eq!(report.fired.len(), invoked.len());
    }

    /// Startup reaches every functor.
    #[test]
    fn startup_fires_everything(shape in dag_shape()) {
        let plan = Compiler::new().compile(&dag_decls(&shape)).expect("compile");
        let report = ScheduleRunner::new(&plan).startup(&mut |_: &Functor| {});

        // Functor 0 has no inputs, and every other functor either has no
        // inputs (layer 0) or consumes an output that startup marks.
        prop_assert_eq!(report.fired.len(), plan.functor_count());
        prop_assert_eq!(report.flags.changed_slots().len(), plan.signal_count());
    }

    /// Same declarations, same bytes.
    #[test]
    fn compilation_is_deterministic(shape in dag_shape()) {
        let decls = dag_decls(&shape);
        let first = Compiler::new().compile(&decls).expect("compile");
        let second = Compiler::new().compile(&decls).expect("compile");

        prop_assert_eq!(
            plan_to_bytes(&first).expect("serialize"),
            plan_to_bytes(&second).expect("serialize")
        );
    }

    /// Closing a chain into a ring is always rejected as a cycle.
    #[test]
    fn ring_is_rejected(len in 1usize..12) {
        let decls: Vec<FunctorDecl> = (0..len)
            .map(|i| {
                let prev = format!("s{}", (i + len - 1) % len);
                let out = format!("s{i}");
                FunctorDecl::pure(format!("f{i}"), &[prev.as_str()], &[out.as_str()])
            })
            .collect();

        match Compiler::new().compile(&decls) {
            Err(SigflowError::CyclicDependency { cycle }) => {
                prop_assert!(cycle.len() >= 2);
                prop_assert_eq!(cycle.first(), cycle.last());
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }
}
