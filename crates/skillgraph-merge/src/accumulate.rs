//! Node and edge accumulation.
//!
//! Folds one normalized [`Fragment`] into the running graph by identity:
//! nodes are unioned by id, edges by undirected endpoint pair, question
//! associations by question text. The first occurrence of anything always
//! wins; later occurrences only contribute to the `required_by` lists.

use std::collections::HashSet;

use skillgraph_core::{EdgeKey, Fragment, SkillGraph, SkillId};

/// What an accumulation step changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulateStats {
    /// Ids inserted for the first time, in fragment order.
    pub new_nodes: Vec<SkillId>,
    /// Incoming nodes whose id was already present.
    pub merged_nodes: usize,
    pub new_edges: usize,
    /// Incoming edges dropped because the pair (in either direction) was
    /// already present.
    pub duplicate_edges: usize,
    pub self_loops: usize,
}

/// Folds `fragment` into `graph`.
pub fn accumulate(mut graph: SkillGraph, fragment: Fragment) -> (SkillGraph, AccumulateStats) {
    let mut stats = AccumulateStats::default();

    for node in fragment.nodes {
        match graph.node_mut(node.id.as_str()) {
            Some(existing) => {
                existing.absorb_required_by(&node.required_by);
                stats.merged_nodes += 1;
            }
            None => {
                stats.new_nodes.push(node.id.clone());
                graph.insert_node(node);
            }
        }
    }

    let mut seen: HashSet<EdgeKey> = graph.edges().iter().map(|e| e.undirected_key()).collect();
    for edge in fragment.edges {
        if edge.is_self_loop() {
            tracing::debug!(skill = %edge.from, "dropping self-loop edge");
            stats.self_loops += 1;
            continue;
        }
        if seen.insert(edge.undirected_key()) {
            graph.edges_mut().push(edge);
            stats.new_edges += 1;
        } else {
            stats.duplicate_edges += 1;
        }
    }

    for (question, skills) in fragment.questions {
        for skill in &skills {
            if let Some(node) = graph.node_mut(skill.as_str()) {
                node.add_required_by(&question);
            }
        }
        let entry = graph.questions_mut().entry(question).or_default();
        for skill in skills {
            if !entry.contains(&skill) {
                entry.push(skill);
            }
        }
    }

    (graph, stats)
}
