//! Invariant violations reported by [`check_graph`](super::check_graph).
//!
//! Every variant carries enough context to locate the offending nodes,
//! edges or questions without another graph query.

use serde::Serialize;

use skillgraph_core::SkillId;

/// A structural invariant a finished graph fails to satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    /// An edge from a skill to itself.
    #[error("self-loop on {skill}")]
    SelfLoop { skill: SkillId },

    /// The same endpoint pair appears more than once, in either direction.
    #[error("duplicate edge between {from} and {to}")]
    DuplicateEdge {
        /// Endpoints of the later occurrence.
        from: SkillId,
        to: SkillId,
    },

    /// An edge endpoint is not a node of the graph.
    #[error("edge {from} -> {to} references unknown skill {missing}")]
    DanglingEdge {
        from: SkillId,
        to: SkillId,
        missing: SkillId,
    },

    /// A strongly connected component with more than one skill.
    #[error("cycle through {} skill(s): {}", .skills.len(), join(.skills))]
    Cycle {
        /// Members of the component, in graph order.
        skills: Vec<SkillId>,
    },

    /// An edge implied by a longer path.
    #[error("edge {from} -> {to} is implied by another path")]
    RedundantEdge { from: SkillId, to: SkillId },

    /// A stored level disagrees with the level recomputed from the edges.
    #[error("skill {skill} has level {stored}, expected {expected}")]
    LevelMismatch {
        skill: SkillId,
        stored: u32,
        expected: u32,
    },

    /// A question references a skill that is not a node of the graph.
    #[error("question {question:?} references unknown skill {skill}")]
    DanglingQuestion { question: String, skill: SkillId },

    /// A question with an empty skill list.
    #[error("question {question:?} has no skills")]
    EmptyQuestion { question: String },
}

fn join(skills: &[SkillId]) -> String {
    skills
        .iter()
        .map(SkillId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
