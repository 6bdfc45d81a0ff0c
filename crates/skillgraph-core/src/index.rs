//! Petgraph view over a [`SkillGraph`].
//!
//! [`IndexedGraph`] is a snapshot: it copies the node ids and edge endpoints
//! into a `DiGraph` whose edge weights are positions in
//! [`SkillGraph::edges`]. Passes compute over the snapshot and then edit the
//! owning graph by edge position, so a pass never observes a half-edited
//! adjacency.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::graph::SkillGraph;
use crate::id::SkillId;

/// Indexed adjacency snapshot of a skill graph.
#[derive(Debug, Clone)]
pub struct IndexedGraph {
    graph: DiGraph<SkillId, usize, u32>,
    lookup: HashMap<SkillId, NodeIndex<u32>>,
}

impl IndexedGraph {
    /// Builds the snapshot. Edges whose endpoints are not nodes of `skills`
    /// are left out.
    pub fn build(skills: &SkillGraph) -> Self {
        let mut graph = DiGraph::with_capacity(skills.node_count(), skills.edge_count());
        let mut lookup = HashMap::with_capacity(skills.node_count());

        for id in skills.nodes().keys() {
            let idx = graph.add_node(id.clone());
            lookup.insert(id.clone(), idx);
        }

        for (position, edge) in skills.edges().iter().enumerate() {
            if let (Some(&from), Some(&to)) = (lookup.get(&edge.from), lookup.get(&edge.to)) {
                graph.add_edge(from, to, position);
            }
        }

        IndexedGraph { graph, lookup }
    }

    /// Returns a read-only reference to the underlying petgraph graph.
    pub fn graph(&self) -> &DiGraph<SkillId, usize, u32> {
        &self.graph
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex<u32>> {
        self.lookup.get(id).copied()
    }

    pub fn skill_id(&self, idx: NodeIndex<u32>) -> &SkillId {
        &self.graph[idx]
    }

    /// Position in [`SkillGraph::edges`] of the edge at `idx`.
    pub fn edge_position(&self, idx: EdgeIndex<u32>) -> usize {
        self.graph[idx]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `(source, target, edge position)` for every indexed edge.
    pub fn edge_endpoints(&self) -> impl Iterator<Item = (NodeIndex<u32>, NodeIndex<u32>, usize)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target(), *edge.weight()))
    }

    /// Returns `true` if `target` is reachable from `source` without
    /// traversing the edge `skip`.
    ///
    /// This is the redundancy test of transitive reduction: an edge `a -> c`
    /// is implied when `c` is still reachable from `a` with the edge removed.
    pub fn reaches_without(
        &self,
        source: NodeIndex<u32>,
        target: NodeIndex<u32>,
        skip: EdgeIndex<u32>,
    ) -> bool {
        let mut visited = vec![false; self.graph.node_count()];
        let mut stack = vec![source];
        visited[source.index()] = true;

        while let Some(current) = stack.pop() {
            for edge in self.graph.edges_directed(current, Direction::Outgoing) {
                if edge.id() == skip {
                    continue;
                }
                let next = edge.target();
                if next == target {
                    return true;
                }
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    stack.push(next);
                }
            }
        }
        false
    }

    /// Returns `true` if the indexed edges form a cycle (self-loops included).
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::PrereqEdge;
    use crate::node::SkillNode;

    fn chain_with_shortcut() -> SkillGraph {
        let mut graph = SkillGraph::new();
        for id in ["a", "b", "c"] {
            graph.insert_node(SkillNode::new(id, id.to_uppercase()));
        }
        graph.add_edge(PrereqEdge::new("a", "b")).unwrap();
        graph.add_edge(PrereqEdge::new("b", "c")).unwrap();
        graph.add_edge(PrereqEdge::new("a", "c")).unwrap();
        graph
    }

    #[test]
    fn build_maps_ids_and_positions() {
        let graph = chain_with_shortcut();
        let indexed = graph.index();
        assert_eq!(indexed.node_count(), 3);
        assert_eq!(indexed.edge_count(), 3);
        let a = indexed.node_index("a").unwrap();
        assert_eq!(indexed.skill_id(a), &SkillId::from("a"));
        let positions: Vec<usize> = indexed.edge_endpoints().map(|(_, _, p)| p).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn build_skips_dangling_edges() {
        let mut graph = chain_with_shortcut();
        graph.edges_mut().push(PrereqEdge::new("a", "ghost"));
        let indexed = graph.index();
        assert_eq!(indexed.edge_count(), 3);
        assert!(indexed.node_index("ghost").is_none());
    }

    #[test]
    fn shortcut_is_reachable_without_itself() {
        let graph = chain_with_shortcut();
        let indexed = graph.index();
        let a = indexed.node_index("a").unwrap();
        let b = indexed.node_index("b").unwrap();
        let c = indexed.node_index("c").unwrap();

        let shortcut = indexed.graph().find_edge(a, c).unwrap();
        assert!(indexed.reaches_without(a, c, shortcut));

        let first_hop = indexed.graph().find_edge(a, b).unwrap();
        assert!(!indexed.reaches_without(a, b, first_hop));
    }

    #[test]
    fn cycle_detection() {
        let mut graph = chain_with_shortcut();
        assert!(!graph.index().has_cycle());
        graph.edges_mut().push(PrereqEdge::new("c", "a"));
        assert!(graph.index().has_cycle());
    }
}
