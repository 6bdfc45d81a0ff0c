//! Dangling reference cleanup.
//!
//! Collaborators can name skill ids they never define, and dedup can leave
//! question entries pointing at nothing. Both are recovered here by dropping
//! the reference; nothing in this module fails.

use serde::Serialize;

use skillgraph_core::{PrereqEdge, SkillGraph, SkillId};

/// A question association entry removed by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedAssociation {
    pub question: String,
    pub skill: SkillId,
}

/// What [`validate_paths`] removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub dropped_edges: Vec<PrereqEdge>,
    pub dropped_associations: Vec<DroppedAssociation>,
    /// Questions removed because none of their skills survived.
    pub dropped_questions: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_edges.is_empty()
            && self.dropped_associations.is_empty()
            && self.dropped_questions.is_empty()
    }
}

/// Drops edges whose endpoints are not both nodes of the graph.
pub fn prune_dangling_edges(mut graph: SkillGraph) -> (SkillGraph, Vec<PrereqEdge>) {
    let edges = std::mem::take(graph.edges_mut());
    let (kept, dropped): (Vec<_>, Vec<_>) = edges
        .into_iter()
        .partition(|edge| graph.contains_node(edge.from.as_str()) && graph.contains_node(edge.to.as_str()));
    for edge in &dropped {
        tracing::warn!(%edge, "dropped edge referencing an unknown skill");
    }
    *graph.edges_mut() = kept;
    (graph, dropped)
}

/// Filters every question's skill list to existing nodes and removes
/// questions left without skills. Dangling edges are dropped as well.
///
/// Surviving associations are mirrored into the `required_by` list of each
/// referenced node, covering questions that named a skill before any
/// fragment defined it.
pub fn validate_paths(graph: SkillGraph) -> (SkillGraph, ValidationReport) {
    let (mut graph, dropped_edges) = prune_dangling_edges(graph);
    let mut report = ValidationReport {
        dropped_edges,
        ..ValidationReport::default()
    };

    let questions = std::mem::take(graph.questions_mut());
    for (question, skills) in questions {
        let mut kept = Vec::with_capacity(skills.len());
        for skill in skills {
            if let Some(node) = graph.node_mut(skill.as_str()) {
                node.add_required_by(&question);
                kept.push(skill);
            } else {
                tracing::debug!(%question, %skill, "dropped dangling question association");
                report.dropped_associations.push(DroppedAssociation {
                    question: question.clone(),
                    skill,
                });
            }
        }
        if kept.is_empty() {
            tracing::debug!(%question, "dropped question without surviving skills");
            report.dropped_questions.push(question);
        } else {
            graph.questions_mut().insert(question, kept);
        }
    }

    (graph, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::SkillNode;

    fn sample() -> SkillGraph {
        let mut graph = SkillGraph::new();
        graph.insert_node(SkillNode::new("loops", "Loops"));
        graph.insert_node(SkillNode::new("strings", "Strings"));
        graph.add_edge(PrereqEdge::new("loops", "strings")).unwrap();
        graph.edges_mut().push(PrereqEdge::new("ghost", "loops"));
        let questions = graph.questions_mut();
        questions.insert(
            "Reverse a string".into(),
            vec![SkillId::from("strings"), SkillId::from("slicing")],
        );
        questions.insert("Parse YAML".into(), vec![SkillId::from("yaml")]);
        questions.insert("Print 1..10".into(), vec![SkillId::from("loops")]);
        graph
    }

    #[test]
    fn filters_and_drops() {
        let (graph, report) = validate_paths(sample());

        assert_eq!(graph.edges(), &[PrereqEdge::new("loops", "strings")]);
        assert_eq!(report.dropped_edges, vec![PrereqEdge::new("ghost", "loops")]);

        let questions: Vec<_> = graph.questions().keys().map(String::as_str).collect();
        assert_eq!(questions, vec!["Reverse a string", "Print 1..10"]);
        assert_eq!(
            graph.questions()["Reverse a string"],
            vec![SkillId::from("strings")]
        );
        assert_eq!(report.dropped_associations.len(), 2);
        assert_eq!(report.dropped_questions, vec!["Parse YAML".to_string()]);
    }

    #[test]
    fn associations_backfill_required_by() {
        let (graph, _) = validate_paths(sample());
        assert_eq!(graph.node("strings").unwrap().required_by, vec!["Reverse a string"]);
        assert_eq!(graph.node("loops").unwrap().required_by, vec!["Print 1..10"]);
    }

    #[test]
    fn clean_graph_reports_nothing() {
        let (graph, _) = validate_paths(sample());
        let (again, report) = validate_paths(graph.clone());
        assert!(report.is_clean());
        assert_eq!(again, graph);
    }
}
