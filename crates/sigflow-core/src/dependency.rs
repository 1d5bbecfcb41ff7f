//! # Dependency Graph
//!
//! Maps every produced signal, and the event pseudo-signal of every impure
//! functor, to the nodes it depends on.
//!
//! Nodes live in an arena indexed by `usize`, in registration order: for
//! each functor, one node per provided signal, then its event node.
//! Duplicate producers are already rejected by the
//! [`SignalRegistry`](crate::SignalRegistry); cycle detection belongs to the
//! [`LayerPlanner`](crate::LayerPlanner).

use crate::{Functor, FunctorId, NodeKey, SignalRegistry};
use std::collections::{BTreeMap, BTreeSet};

/// One node of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// What this node stands for.
    pub key: NodeKey,
    /// The functor producing this node.
    pub owner: FunctorId,
    /// Display label (signal name or `event:<functor>`).
    pub label: String,
    /// Node indices this node depends on.
    pub depends_on: BTreeSet<usize>,
}

/// The dependency graph over signals and event pseudo-signals.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node arena, in registration order
    nodes: Vec<DependencyNode>,

    /// NodeKey -> node index
    index: BTreeMap<NodeKey, usize>,

    /// Unproduced input name -> consuming functors
    external_inputs: BTreeMap<String, BTreeSet<FunctorId>>,
}

impl DependencyGraph {
    /// Build the graph from resolved functors.
    ///
    /// Functors are expected in `FunctorId` order, with names resolved
    /// against `registry`.
    #[must_use]
    pub fn build(functors: &[Functor], registry: &SignalRegistry) -> Self {
        let mut graph = Self::default();

        // First pass: allocate every node so dependencies can be resolved
        for functor in functors {
            for signal in &functor.provides {
                let label = registry.name_of(*signal).unwrap_or_default().to_string();
                graph.push_node(NodeKey::Signal(*signal), functor.id, label);
            }
            if functor.event.is_some() {
                graph.push_node(NodeKey::Event(functor.id), functor.id, functor.event_label());
            }
        }

        // Second pass: edges from the functor's consumed signals
        for functor in functors {
            let deps: BTreeSet<usize> = functor
                .consumed_signals()
                .filter_map(|s| graph.index.get(&NodeKey::Signal(s)).copied())
                .collect();

            for key in Self::keys_of(functor) {
                if let Some(&node) = graph.index.get(&key) {
                    graph.nodes[node].depends_on.clone_from(&deps);
                }
            }

            for name in functor.external_inputs() {
                graph
                    .external_inputs
                    .entry(name.to_string())
                    .or_default()
                    .insert(functor.id);
            }
        }

        graph
    }

    fn push_node(&mut self, key: NodeKey, owner: FunctorId, label: String) {
        self.index.insert(key, self.nodes.len());
        self.nodes.push(DependencyNode {
            key,
            owner,
            label,
            depends_on: BTreeSet::new(),
        });
    }

    fn keys_of(functor: &Functor) -> impl Iterator<Item = NodeKey> + '_ {
        functor
            .provides
            .iter()
            .map(|s| NodeKey::Signal(*s))
            .chain(functor.event.map(|_| NodeKey::Event(functor.id)))
    }

    /// All nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    /// Get a node by index.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&DependencyNode> {
        self.nodes.get(index)
    }

    /// Get the arena index of a node key.
    #[must_use]
    pub fn node_index(&self, key: NodeKey) -> Option<usize> {
        self.index.get(&key).copied()
    }

    /// Number of nodes (signals plus event pseudo-signals).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Reverse edges: for every node, the nodes that depend on it.
    #[must_use]
    pub fn dependents(&self) -> Vec<Vec<usize>> {
        let mut dependents = vec![Vec::new(); self.nodes.len()];
        for (node, entry) in self.nodes.iter().enumerate() {
            for &dep in &entry.depends_on {
                dependents[dep].push(node);
            }
        }
        dependents
    }

    /// Consumed names no functor produces, with their consumers.
    #[must_use]
    pub fn external_inputs(&self) -> &BTreeMap<String, BTreeSet<FunctorId>> {
        &self.external_inputs
    }
}

// =============================================================================
// TESTS
// =============================================================================
