//! Transitive reduction.
//!
//! An edge `a -> c` is redundant when `c` is still reachable from `a` with
//! that edge removed. Redundancy is decided against a single adjacency
//! snapshot taken before any edge is dropped, so the result does not depend
//! on edge order.

use std::collections::HashSet;

use petgraph::algo::has_path_connecting;

use skillgraph_core::{PrereqEdge, SkillGraph};

/// Removes every transitively implied edge. Returns the reduced graph and
/// the removed edges in their original order.
pub fn reduce_transitive(mut graph: SkillGraph) -> (SkillGraph, Vec<PrereqEdge>) {
    let snapshot = graph.index();

    let redundant: HashSet<usize> = snapshot
        .graph()
        .edge_indices()
        .filter_map(|edge| {
            let (from, to) = snapshot.graph().edge_endpoints(edge)?;
            snapshot
                .reaches_without(from, to, edge)
                .then(|| snapshot.edge_position(edge))
        })
        .collect();

    if redundant.is_empty() {
        return (graph, Vec::new());
    }

    let mut removed = Vec::with_capacity(redundant.len());
    let edges = std::mem::take(graph.edges_mut());
    for (position, edge) in edges.into_iter().enumerate() {
        if redundant.contains(&position) {
            tracing::debug!(%edge, "removed transitively implied edge");
            removed.push(edge);
        } else {
            graph.edges_mut().push(edge);
        }
    }
    (graph, removed)
}

/// Returns the reduced edges whose endpoints are no longer connected in
/// `graph`.
///
/// Inside a cycle, two edges can each be implied by a path through the
/// other. Once cycle breaking cuts that path, neither prerequisite survives
/// in any form.
pub fn stranded_reductions(graph: &SkillGraph, reduced: &[PrereqEdge]) -> Vec<PrereqEdge> {
    let snapshot = graph.index();
    reduced
        .iter()
        .filter(|edge| {
            match (
                snapshot.node_index(edge.from.as_str()),
                snapshot.node_index(edge.to.as_str()),
            ) {
                (Some(from), Some(to)) => !has_path_connecting(snapshot.graph(), from, to, None),
                _ => false,
            }
        })
        .cloned()
        .collect()
}
