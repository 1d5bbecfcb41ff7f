//! # Functor Resolver
//!
//! Maps signals and event pseudo-signals back to the functor producing them,
//! and collapses a layer's nodes into the distinct functors to evaluate.

use crate::{DependencyGraph, FunctorId, NodeKey};
use std::collections::BTreeSet;

/// Resolves graph nodes to their owning functors.
pub struct FunctorResolver<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> FunctorResolver<'g> {
    /// Create a resolver over a dependency graph.
    #[must_use]
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    /// Get the functor producing a node key.
    ///
    /// Total over every key present in the graph.
    #[must_use]
    pub fn functor_for(&self, key: NodeKey) -> Option<FunctorId> {
        self.graph
            .node_index(key)
            .and_then(|n| self.functor_for_node(n))
    }

    /// Get the functor producing a node, by arena index.
    #[must_use]
    pub fn functor_for_node(&self, node: usize) -> Option<FunctorId> {
        self.graph.node(node).map(|entry| entry.owner)
    }

    /// Distinct functors owning the given nodes, in `FunctorId` order.
    ///
    /// Several outputs of one functor (and its event) landing in the same
    /// layer collapse into a single entry.
    #[must_use]
    pub fn functors_in(&self, nodes: &[usize]) -> Vec<FunctorId> {
        nodes
            .iter()
            .filter_map(|&n| self.functor_for_node(n))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventId, Functor, FunctorDecl, SignalId, SignalRegistry};

    fn source_with_two_outputs() -> (Vec<Functor>, SignalRegistry) {
        let mut registry = SignalRegistry::new();
        registry
            .register(&FunctorDecl::impure("imu", &[], &["ax", "ay"]))
            .expect("register");
        let functor = Functor {
            id: FunctorId(0),
            name: "imu".to_string(),
            consumes: vec![],
            provides: vec![SignalId(0), SignalId(1)],
            is_pure: false,
            event: Some(EventId(0)),
        };
        (vec![functor], registry)
    }

    #[test]
    fn every_node_resolves_to_its_functor() {
        let (functors, registry) = source_with_two_outputs();
        let graph = DependencyGraph::build(&functors, &registry);
        let resolver = FunctorResolver::new(&graph);

        assert_eq!(resolver.functor_for(NodeKey::Signal(SignalId(0))), Some(FunctorId(0)));
        assert_eq!(resolver.functor_for(NodeKey::Signal(SignalId(1))), Some(FunctorId(0)));
        assert_eq!(resolver.functor_for(NodeKey::Event(FunctorId(0))), Some(FunctorId(0)));
        assert_eq!(resolver.functor_for(NodeKey::Signal(SignalId(7))), None);
    }

    #[test]
    fn outputs_of_one_functor_collapse() {
        let (functors, registry) = source_with_two_outputs();
        let graph = DependencyGraph::build(&functors, &registry);
        let resolver = FunctorResolver::new(&graph);

        let all: Vec<usize> = (0..graph.node_count()).collect();
        assert_eq!(resolver.functors_in(&all), vec![FunctorId(0)]);
    }
}
