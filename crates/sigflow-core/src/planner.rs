//! # Topological Layer Planner
//!
//! Partitions the dependency graph into minimal-depth layers (Kahn-style):
//! - Layer 0 holds every node without dependencies
//! - Layer k holds every node whose dependencies lie in layers 0..k-1
//!
//! Each round places at least one node, so planning is bounded by the node
//! count. A round that places nothing while nodes remain means the graph
//! has a cycle; the planner then reports one concrete cycle by name.

use crate::{DependencyGraph, SigflowError};
use std::collections::BTreeMap;

/// A layering: node indices per layer, each layer sorted by node index.
pub type Layering = Vec<Vec<usize>>;

/// The Layer Planner computes the layering of a dependency graph.
pub struct LayerPlanner;

impl LayerPlanner {
    /// Compute the unique minimal-depth layering.
    ///
    /// Returns `SigflowError::CyclicDependency` when no layering exists.
    pub fn plan(graph: &DependencyGraph) -> Result<Layering, SigflowError> {
        let dependents = graph.dependents();
        let mut pending: Vec<usize> = graph
            .nodes()
            .iter()
            .map(|node| node.depends_on.len())
            .collect();

        let mut layers = Vec::new();
        let mut placed = 0;
        let mut current: Vec<usize> = (0..pending.len()).filter(|&n| pending[n] == 0).collect();

        while !current.is_empty() {
            placed += current.len();
            let mut next = Vec::new();
            for &node in &current {
                for &dependent in &dependents[node] {
                    pending[dependent] = pending[dependent].saturating_sub(1);
                    if pending[dependent] == 0 {
                        next.push(dependent);
                    }
                }
            }
            next.sort_unstable();
            layers.push(current);
            current = next;
        }

        if placed < graph.node_count() {
            return Err(SigflowError::CyclicDependency {
                cycle: Self::find_cycle(graph, &pending),
            });
        }

        Ok(layers)
    }

    /// Walk unresolved dependencies until a node repeats.
    ///
    /// Every unplaced node has at least one unplaced dependency, so the
    /// walk always closes a cycle. The returned labels start and end with
    /// the same node.
    fn find_cycle(graph: &DependencyGraph, pending: &[usize]) -> Vec<String> {
        let label = |n: usize| graph.node(n).map(|node| node.label.clone()).unwrap_or_default();

        let Some(start) = (0..pending.len()).find(|&n| pending[n] > 0) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut seen: BTreeMap<usize, usize> = BTreeMap::new();
        let mut node = start;

        loop {
            if let Some(&pos) = seen.get(&node) {
                // Report in dependency order: each entry depends on the next
                let mut cycle: Vec<String> = path[pos..].iter().map(|&n| label(n)).collect();
                cycle.push(label(node));
                return cycle;
            }
            seen.insert(node, path.len());
            path.push(node);

            let next = graph
                .node(node)
                .and_then(|entry| entry.depends_on.iter().copied().find(|&d| pending[d] > 0));
            match next {
                Some(dep) => node = dep,
                None => return vec![label(node)],
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Compiler, FunctorDecl};

    fn layer_labels(decls: &[FunctorDecl]) -> Result<Vec<Vec<String>>, SigflowError> {
        let plan = Compiler::permissive().compile(decls)?;
        Ok(plan
            .layers()
            .iter()
            .map(|layer| layer.nodes.iter().map(|&k| plan.node_label(k)).collect())
            .collect())
    }

    #[test]
    fn chain_produces_one_layer_per_link() {
        let layers = layer_labels(&[
            FunctorDecl::pure("a", &[], &["a"]),
            FunctorDecl::pure("b", &["a"], &["b"]),
            FunctorDecl::pure("c", &["b"], &["c"]),
        ])
        .expect("layering");

        assert_eq!(layers, vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn layers_are_minimal_depth() {
        // d depends on a directly and on c through b: depth is the longest path
        let layers = layer_labels(&[
            FunctorDecl::pure("a", &[], &["a"]),
            FunctorDecl::pure("b", &["a"], &["b"]),
            FunctorDecl::pure("c", &["b"], &["c"]),
            FunctorDecl::pure("d", &["a", "c"], &["d"]),
            FunctorDecl::pure("x", &["a"], &["x"]),
        ])
        .expect("layering");

        assert_eq!(
            layers,
            vec![vec!["a"], vec!["b", "x"], vec!["c"], vec!["d"]]
        );
    }

    #[test]
    fn two_node_cycle_detected() {
        let result = layer_labels(&[
            FunctorDecl::pure("x", &["y"], &["x"]),
            FunctorDecl::pure("y", &["x"], &["y"]),
        ]);

        match result {
            Err(SigflowError::CyclicDependency { cycle }) => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&"x".to_string()));
                assert!(cycle.contains(&"y".to_string()));
            }
            other => unreachable!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_detected() {
        let result = layer_labels(&[FunctorDecl::pure("acc", &["acc"], &["acc"])]);
        match result {
            Err(SigflowError::CyclicDependency { cycle }) => {
                assert_eq!(cycle, vec!["acc".to_string(), "acc".to_string()]);
            }
            other => unreachable!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_downstream_of_valid_prefix_detected() {
        let result = layer_labels(&[
            FunctorDecl::impure("src", &[], &["s"]),
            FunctorDecl::pure("p", &["s", "q"], &["p"]),
            FunctorDecl::pure("q", &["p"], &["q"]),
            FunctorDecl::pure("tail", &["q"], &["t"]),
        ]);

        match result {
            Err(SigflowError::CyclicDependency { cycle }) => {
                assert!(!cycle.contains(&"s".to_string()));
                assert!(!cycle.contains(&"t".to_string()));
                assert!(cycle.contains(&"p".to_string()));
            }
            other => unreachable!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn empty_graph_has_no_layers() {
        let layers = layer_labels(&[]).expect("layering");
        assert!(layers.is_empty());
    }
}
