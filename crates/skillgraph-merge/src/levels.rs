//! Level assignment.
//!
//! A node's level is the length of its longest prerequisite chain: 0 without
//! prerequisites, otherwise one more than the deepest direct prerequisite.
//! Levels are always recomputed from scratch.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use petgraph::Direction;

use skillgraph_core::SkillGraph;

/// Recomputes every node's level in place. Edges with unknown endpoints are
/// ignored.
///
/// Levels are relaxed along a topological order, so chains of any length are
/// handled without recursion. Nodes on a cycle are never released and keep
/// level 0.
pub fn assign_levels(graph: &mut SkillGraph) {
    let snapshot = graph.index();
    let dag = snapshot.graph();

    let mut in_degree: Vec<usize> = dag
        .node_indices()
        .map(|n| dag.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut queue: VecDeque<NodeIndex<u32>> = dag
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();
    let mut levels = vec![0u32; dag.node_count()];
    let mut released = 0usize;

    while let Some(node) = queue.pop_front() {
        released += 1;
        let next = levels[node.index()] + 1;
        for dependent in dag.neighbors_directed(node, Direction::Outgoing) {
            let slot = &mut levels[dependent.index()];
            *slot = (*slot).max(next);
            in_degree[dependent.index()] -= 1;
            if in_degree[dependent.index()] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if released < dag.node_count() {
        tracing::error!(
            stuck = dag.node_count() - released,
            "cycle reached during level assignment; stuck skills get level 0"
        );
        for node in dag.node_indices() {
            if in_degree[node.index()] > 0 {
                levels[node.index()] = 0;
            }
        }
    }

    for node in dag.node_indices() {
        if let Some(skill) = graph.node_mut(snapshot.skill_id(node).as_str()) {
            skill.level = levels[node.index()];
        }
    }
}
