//! Whole-graph invariant check.
//!
//! [`check_graph`] scans a finished graph and reports ALL violations at once.
//! It is pure: it reads the graph and never repairs it. The engine runs it
//! at the end of every finishing pass so an inconsistent graph is never
//! handed to storage.

pub mod diagnostics;

pub use diagnostics::InvariantViolation;

use std::collections::HashSet;

use petgraph::algo::tarjan_scc;

use skillgraph_core::{EdgeKey, SkillGraph};

use crate::levels::assign_levels;

/// Checks every structural invariant of a merged graph.
///
/// Redundancy and level checks are only meaningful on an acyclic graph and
/// are skipped when a cycle is found.
pub fn check_graph(graph: &SkillGraph) -> Result<(), Vec<InvariantViolation>> {
    let mut violations = Vec::new();

    let mut seen: HashSet<EdgeKey> = HashSet::with_capacity(graph.edge_count());
    for edge in graph.edges() {
        if edge.is_self_loop() {
            violations.push(InvariantViolation::SelfLoop {
                skill: edge.from.clone(),
            });
            continue;
        }
        if !seen.insert(edge.undirected_key()) {
            violations.push(InvariantViolation::DuplicateEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
            });
        }
        for endpoint in [&edge.from, &edge.to] {
            if !graph.contains_node(endpoint.as_str()) {
                violations.push(InvariantViolation::DanglingEdge {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
    }

    let snapshot = graph.index();
    let mut acyclic = !violations
        .iter()
        .any(|v| matches!(v, InvariantViolation::SelfLoop { .. }));
    for component in tarjan_scc(snapshot.graph()) {
        if component.len() > 1 {
            acyclic = false;
            let mut skills: Vec<_> = component;
            skills.sort();
            violations.push(InvariantViolation::Cycle {
                skills: skills
                    .into_iter()
                    .map(|idx| snapshot.skill_id(idx).clone())
                    .collect(),
            });
        }
    }

    if acyclic {
        for edge in snapshot.graph().edge_indices() {
            let Some((from, to)) = snapshot.graph().edge_endpoints(edge) else {
                continue;
            };
            if snapshot.reaches_without(from, to, edge) {
                violations.push(InvariantViolation::RedundantEdge {
                    from: snapshot.skill_id(from).clone(),
                    to: snapshot.skill_id(to).clone(),
                });
            }
        }

        let mut expected = graph.clone();
        assign_levels(&mut expected);
        for (stored, recomputed) in graph.nodes().values().zip(expected.nodes().values()) {
            if stored.level != recomputed.level {
                violations.push(InvariantViolation::LevelMismatch {
                    skill: stored.id.clone(),
                    stored: stored.level,
                    expected: recomputed.level,
                });
            }
        }
    }

    for (question, skills) in graph.questions() {
        if skills.is_empty() {
            violations.push(InvariantViolation::EmptyQuestion {
                question: question.clone(),
            });
        }
        for skill in skills {
            if !graph.contains_node(skill.as_str()) {
                violations.push(InvariantViolation::DanglingQuestion {
                    question: question.clone(),
                    skill: skill.clone(),
                });
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
