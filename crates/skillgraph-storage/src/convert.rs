//! Decompose/recompose conversions between SkillGraph and flat storage rows.
//!
//! [`decompose`] breaks a [`SkillGraph`] into a [`DecomposedGraph`] of
//! position-tagged rows. [`recompose`] rebuilds the graph in position order
//! and refuses rows that would produce an inconsistent graph (duplicate
//! skills, edges or question entries pointing at unknown skills).

use indexmap::IndexMap;

use skillgraph_core::{PrereqEdge, QuestionMap, SkillGraph, SkillId, SkillNode};

use crate::error::StorageError;

/// One `(question, skill)` association row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRow {
    /// Position of the question in the graph's question map.
    pub question_position: u32,
    pub question: String,
    /// Position of the skill within the question's list.
    pub slot: u32,
    pub skill: SkillId,
}

/// All components of a SkillGraph as flat vectors for storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecomposedGraph {
    /// Skills with their insertion position.
    pub skills: Vec<(u32, SkillNode)>,
    /// Edges with their position in the edge list.
    pub edges: Vec<(u32, PrereqEdge)>,
    pub questions: Vec<QuestionRow>,
}

/// Decomposes a SkillGraph into flat rows suitable for storage.
pub fn decompose(graph: &SkillGraph) -> DecomposedGraph {
    let skills = graph
        .nodes()
        .values()
        .enumerate()
        .map(|(position, node)| (position as u32, node.clone()))
        .collect();

    let edges = graph
        .edges()
        .iter()
        .enumerate()
        .map(|(position, edge)| (position as u32, edge.clone()))
        .collect();

    let questions = graph
        .questions()
        .iter()
        .enumerate()
        .flat_map(|(question_position, (question, skills))| {
            skills.iter().enumerate().map(move |(slot, skill)| QuestionRow {
                question_position: question_position as u32,
                question: question.clone(),
                slot: slot as u32,
                skill: skill.clone(),
            })
        })
        .collect();

    DecomposedGraph {
        skills,
        edges,
        questions,
    }
}

/// Rebuilds a SkillGraph from decomposed rows.
///
/// Rows may arrive in any order; positions decide the final order.
pub fn recompose(mut decomposed: DecomposedGraph) -> Result<SkillGraph, StorageError> {
    decomposed.skills.sort_by_key(|(position, _)| *position);
    decomposed.edges.sort_by_key(|(position, _)| *position);
    decomposed
        .questions
        .sort_by_key(|row| (row.question_position, row.slot));

    let mut nodes: IndexMap<SkillId, SkillNode> = IndexMap::with_capacity(decomposed.skills.len());
    for (_, node) in decomposed.skills {
        let id = node.id.clone();
        if nodes.insert(id.clone(), node).is_some() {
            return Err(StorageError::IntegrityError {
                reason: format!("skill {id} stored twice"),
            });
        }
    }

    let mut edges = Vec::with_capacity(decomposed.edges.len());
    for (position, edge) in decomposed.edges {
        for endpoint in [&edge.from, &edge.to] {
            if !nodes.contains_key(endpoint) {
                return Err(StorageError::IntegrityError {
                    reason: format!("edge #{position} ({edge}) references unknown skill {endpoint}"),
                });
            }
        }
        edges.push(edge);
    }

    let mut questions = QuestionMap::new();
    for row in decomposed.questions {
        if !nodes.contains_key(&row.skill) {
            return Err(StorageError::IntegrityError {
                reason: format!(
                    "question {:?} references unknown skill {}",
                    row.question, row.skill
                ),
            });
        }
        questions.entry(row.question).or_default().push(row.skill);
    }

    Ok(SkillGraph::from_parts(nodes, edges, questions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::{RelationKind, Tier};

    fn sample() -> SkillGraph {
        let mut graph = SkillGraph::new();
        graph.insert_node(SkillNode::new("variables", "Variables").with_tier(Tier::Foundational));
        let mut loops = SkillNode::new("loops", "Loops");
        loops.level = 1;
        loops.contexts.push("for over a list".into());
        graph.insert_node(loops);
        graph
            .add_edge(PrereqEdge {
                kind: RelationKind::BuildsOn,
                ..PrereqEdge::new("variables", "loops").with_reason("loop counters")
            })
            .unwrap();
        graph.questions_mut().insert(
            "Sum 1..n".into(),
            vec![SkillId::from("loops"), SkillId::from("variables")],
        );
        graph
    }

    #[test]
    fn decompose_recompose_roundtrip() {
        let graph = sample();
        let decomposed = decompose(&graph);
        assert_eq!(decomposed.skills.len(), 2);
        assert_eq!(decomposed.edges.len(), 1);
        assert_eq!(decomposed.questions.len(), 2);
        assert_eq!(recompose(decomposed).unwrap(), graph);
    }

    #[test]
    fn recompose_orders_by_position() {
        let graph = sample();
        let mut decomposed = decompose(&graph);
        decomposed.skills.reverse();
        decomposed.questions.reverse();
        let rebuilt = recompose(decomposed).unwrap();
        let ids: Vec<_> = rebuilt.nodes().keys().map(SkillId::as_str).collect();
        assert_eq!(ids, vec!["variables", "loops"]);
        assert_eq!(rebuilt.questions()["Sum 1..n"][0], SkillId::from("loops"));
    }

    #[test]
    fn recompose_rejects_unknown_endpoint() {
        let mut decomposed = decompose(&sample());
        decomposed.skills.retain(|(_, node)| node.id.as_str() != "variables");
        assert!(matches!(
            recompose(decomposed),
            Err(StorageError::IntegrityError { .. })
        ));
    }

    #[test]
    fn recompose_rejects_duplicate_skill() {
        let mut decomposed = decompose(&sample());
        let copy = decomposed.skills[0].1.clone();
        decomposed.skills.push((9, copy));
        assert!(matches!(
            recompose(decomposed),
            Err(StorageError::IntegrityError { .. })
        ));
    }
}
