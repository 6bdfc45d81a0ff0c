//! Semantic deduplication.
//!
//! The accumulator only merges nodes with identical ids. Independently
//! generated batches routinely describe the same skill under a different id
//! (`dict_ops` vs `dictionary_operations`), so this pass walks the nodes in
//! arrival order, keeps a growing list of canonical nodes, and folds every
//! node that an [`Equivalence`] matches against an earlier canonical node
//! into it. The resulting [`IdRemap`] is then applied to edges and question
//! associations.
//!
//! Matching is heuristic. False merges and missed merges are accepted; every
//! decision is logged and returned as a [`MergeDecision`] so it can be
//! reviewed downstream.

pub mod equivalence;
pub mod remap;

pub use equivalence::{normalize_name, token_overlap, Equivalence, MatchReason, NameOverlap};
pub use remap::IdRemap;

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use skillgraph_core::{EdgeKey, PrereqEdge, QuestionMap, SkillGraph, SkillId, SkillNode};

/// Audit record for one absorbed node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeDecision {
    pub absorbed: SkillId,
    pub absorbed_name: String,
    pub canonical: SkillId,
    pub canonical_name: String,
    pub reason: MatchReason,
}

/// Everything a dedup pass did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    pub remap: IdRemap,
    pub decisions: Vec<MergeDecision>,
    /// Edges dropped because remapping turned them into self-loops or
    /// duplicates of an earlier edge.
    pub collapsed_edges: Vec<PrereqEdge>,
}

/// Merges semantically duplicate nodes and rewrites every reference.
pub fn deduplicate(graph: SkillGraph, equivalence: &dyn Equivalence) -> (SkillGraph, DedupReport) {
    let (nodes, edges, questions) = graph.into_parts();
    let mut report = DedupReport::default();

    let mut canonical: IndexMap<SkillId, SkillNode> = IndexMap::with_capacity(nodes.len());
    for node in nodes.into_values() {
        let matched = canonical
            .values()
            .find_map(|c| equivalence.explain(c, &node).map(|reason| (c.id.clone(), reason)));

        let Some((canonical_id, reason)) = matched else {
            canonical.insert(node.id.clone(), node);
            continue;
        };

        // `canonical_id` was just read out of the map.
        let Some(target) = canonical.get_mut(&canonical_id) else {
            continue;
        };
        tracing::info!(
            absorbed = %node.id,
            absorbed_name = %node.name,
            canonical = %target.id,
            canonical_name = %target.name,
            ?reason,
            "merged duplicate skill"
        );
        report.decisions.push(MergeDecision {
            absorbed: node.id.clone(),
            absorbed_name: node.name.clone(),
            canonical: target.id.clone(),
            canonical_name: target.name.clone(),
            reason,
        });
        absorb(target, &node);
        report.remap.insert(node.id, canonical_id);
    }

    let (edges, collapsed) = remap_edges(edges, &report.remap);
    report.collapsed_edges = collapsed;
    let questions = remap_questions(questions, &report.remap);

    (SkillGraph::from_parts(canonical, edges, questions), report)
}

/// Folds the duplicate's auxiliary data into the canonical node.
fn absorb(target: &mut SkillNode, duplicate: &SkillNode) {
    target.absorb_required_by(&duplicate.required_by);
    target.absorb_contexts(&duplicate.contexts);
    if target.description.is_empty() && !duplicate.description.is_empty() {
        target.description = duplicate.description.clone();
    }
}

/// Rewrites edge endpoints through `remap`, dropping edges that collapse
/// into self-loops or repeat an earlier undirected pair.
pub fn remap_edges(edges: Vec<PrereqEdge>, remap: &IdRemap) -> (Vec<PrereqEdge>, Vec<PrereqEdge>) {
    let mut kept = Vec::with_capacity(edges.len());
    let mut collapsed = Vec::new();
    let mut seen: HashSet<EdgeKey> = HashSet::with_capacity(edges.len());

    for mut edge in edges {
        edge.from = remap.resolve(&edge.from).clone();
        edge.to = remap.resolve(&edge.to).clone();
        if edge.is_self_loop() || !seen.insert(edge.undirected_key()) {
            tracing::debug!(%edge, "edge collapsed by id remap");
            collapsed.push(edge);
        } else {
            kept.push(edge);
        }
    }
    (kept, collapsed)
}

/// Rewrites question skill lists through `remap`, removing duplicates that
/// the rewrite introduces.
pub fn remap_questions(questions: QuestionMap, remap: &IdRemap) -> QuestionMap {
    questions
        .into_iter()
        .map(|(question, skills)| {
            let mut rewritten: Vec<SkillId> = Vec::with_capacity(skills.len());
            for skill in &skills {
                let resolved = remap.resolve(skill);
                if !rewritten.contains(resolved) {
                    rewritten.push(resolved.clone());
                }
            }
            (question, rewritten)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::Tier;

    fn graph_of(nodes: Vec<SkillNode>, edges: Vec<PrereqEdge>) -> SkillGraph {
        let nodes = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        SkillGraph::from_parts(nodes, edges, QuestionMap::new())
    }

    #[test]
    fn first_canonical_wins_and_edges_follow() {
        let mut duplicate = SkillNode::new("dictionary_operations", "Dictionary operations");
        duplicate.add_required_by("Count words");
        duplicate.description = "get/set/iterate".into();
        let mut graph = graph_of(
            vec![
                SkillNode::new("dict_ops", "Dictionary Operations"),
                duplicate,
                SkillNode::new("word_count", "Word counting"),
            ],
            vec![PrereqEdge::new("dictionary_operations", "word_count")],
        );
        graph.questions_mut().insert(
            "Count words".into(),
            vec![SkillId::from("dictionary_operations"), SkillId::from("word_count")],
        );

        let (graph, report) = deduplicate(graph, &NameOverlap::default());

        assert_eq!(graph.node_count(), 2);
        assert!(graph.contains_node("dict_ops"));
        assert!(!graph.contains_node("dictionary_operations"));
        assert_eq!(graph.edges(), &[PrereqEdge::new("dict_ops", "word_count")]);
        assert_eq!(
            graph.questions()["Count words"],
            vec![SkillId::from("dict_ops"), SkillId::from("word_count")]
        );

        let canonical = graph.node("dict_ops").unwrap();
        assert_eq!(canonical.required_by, vec!["Count words"]);
        assert_eq!(canonical.description, "get/set/iterate");

        assert_eq!(report.decisions.len(), 1);
        assert_eq!(report.decisions[0].reason, MatchReason::ExactName);
        assert_eq!(
            report.remap.get("dictionary_operations"),
            Some(&SkillId::from("dict_ops"))
        );
    }

    #[test]
    fn remap_collapses_edges() {
        let graph = graph_of(
            vec![
                SkillNode::new("a", "Loops"),
                SkillNode::new("a2", "loops"),
                SkillNode::new("b", "Recursion"),
            ],
            vec![
                PrereqEdge::new("a", "b"),
                PrereqEdge::new("b", "a2"),
                PrereqEdge::new("a", "a2"),
            ],
        );
        let (graph, report) = deduplicate(graph, &NameOverlap::default());
        assert_eq!(graph.edges(), &[PrereqEdge::new("a", "b")]);
        assert_eq!(report.collapsed_edges.len(), 2);
    }

    #[test]
    fn tier_mismatch_blocks_token_match() {
        let graph = graph_of(
            vec![
                SkillNode::new("file_io", "File reading writing").with_tier(Tier::Foundational),
                SkillNode::new("file_rw", "File reading and writing").with_tier(Tier::Advanced),
            ],
            vec![],
        );
        let (graph, report) = deduplicate(graph, &NameOverlap::default());
        assert_eq!(graph.node_count(), 2);
        assert!(report.decisions.is_empty());
    }

    #[test]
    fn custom_equivalence_is_used() {
        let graph = graph_of(
            vec![SkillNode::new("x1", "Alpha"), SkillNode::new("x2", "Beta")],
            vec![],
        );
        let always = |_: &SkillNode, _: &SkillNode| true;
        let (graph, report) = deduplicate(graph, &always);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(report.decisions[0].reason, MatchReason::Equivalent);
    }
}
