//! Cycle breaking.
//!
//! Fragments are generated without a global view, so together they can
//! close cycles that no single fragment contains. The breaker runs Kahn's
//! algorithm over a fresh snapshot; any node it cannot peel off is "stuck".
//! Among the edges whose endpoints are both stuck and lie in the same
//! strongly connected component, the one accumulated last is removed and the
//! loop restarts from scratch.
//!
//! Restricting candidates to a shared component keeps edges that merely hang
//! off a cycle (both endpoints stuck, but the target only downstream of it)
//! out of the removal set.

use std::collections::VecDeque;

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use skillgraph_core::{IndexedGraph, PrereqEdge, SkillGraph};

use crate::error::MergeError;

/// Nodes left unprocessed by Kahn's algorithm, as a membership mask.
fn stuck_nodes(snapshot: &IndexedGraph) -> Vec<bool> {
    let graph = snapshot.graph();
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.edges_directed(n, Direction::Incoming).count())
        .collect();

    let mut queue: VecDeque<NodeIndex<u32>> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();
    let mut stuck = vec![true; graph.node_count()];

    while let Some(node) = queue.pop_front() {
        stuck[node.index()] = false;
        for edge in graph.edges_directed(node, Direction::Outgoing) {
            let target = edge.target().index();
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                queue.push_back(edge.target());
            }
        }
    }
    stuck
}

/// Position of the edge to remove: the latest-accumulated edge between two
/// stuck nodes of the same strongly connected component.
fn pick_cycle_edge(snapshot: &IndexedGraph, stuck: &[bool]) -> Option<usize> {
    let mut component = vec![usize::MAX; snapshot.node_count()];
    for (id, scc) in tarjan_scc(snapshot.graph()).into_iter().enumerate() {
        for node in scc {
            component[node.index()] = id;
        }
    }

    snapshot
        .edge_endpoints()
        .filter(|(from, to, _)| {
            stuck[from.index()] && stuck[to.index()] && component[from.index()] == component[to.index()]
        })
        .map(|(_, _, position)| position)
        .max()
}

/// Removes edges until the graph is acyclic.
///
/// `max_iterations` bounds the number of Kahn runs. Every run that finds a
/// cycle removes one edge, so `edge_count + 1` runs always suffice; running
/// out means the breaker is broken and the graph must not be used.
pub fn break_cycles(
    mut graph: SkillGraph,
    max_iterations: usize,
) -> Result<(SkillGraph, Vec<PrereqEdge>), MergeError> {
    let mut removed = Vec::new();

    for _ in 0..max_iterations {
        let snapshot = graph.index();
        let stuck = stuck_nodes(&snapshot);
        let stuck_count = stuck.iter().filter(|s| **s).count();
        if stuck_count == 0 {
            return Ok((graph, removed));
        }

        let Some(position) = pick_cycle_edge(&snapshot, &stuck) else {
            return Err(MergeError::CycleBreakExhausted {
                iterations: removed.len(),
                stuck: stuck_count,
            });
        };
        let edge = graph.edges_mut().remove(position);
        tracing::warn!(%edge, stuck = stuck_count, "removed edge to break prerequisite cycle");
        removed.push(edge);
    }

    let stuck = stuck_nodes(&graph.index()).into_iter().filter(|s| *s).count();
    if stuck == 0 {
        return Ok((graph, removed));
    }
    Err(MergeError::CycleBreakExhausted {
        iterations: max_iterations,
        stuck,
    })
}
