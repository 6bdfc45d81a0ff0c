//! Skill nodes and their auxiliary sub-records.
//!
//! A [`SkillNode`] is one unit of knowledge in the graph. Besides identity and
//! display data it carries a derived topological `level`, the list of
//! questions known to require it, and two placeholder sub-records
//! ([`MasteryEvidence`], [`EffortEstimate`]) that downstream consumers fill in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::SkillId;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Proficiency band of a skill. Ordered from most basic to most advanced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Foundational,
    #[default]
    Core,
    Advanced,
}

impl Tier {
    /// Returns the canonical lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Foundational => "foundational",
            Tier::Core => "core",
            Tier::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = CoreError;

    /// Parses a tier label, accepting the synonyms generators tend to use.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foundational" | "foundation" | "basic" | "beginner" => Ok(Tier::Foundational),
            "core" | "intermediate" => Ok(Tier::Core),
            "advanced" | "expert" => Ok(Tier::Advanced),
            _ => Err(CoreError::UnknownTier {
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

/// How much is known about student mastery of a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// No evidence collected yet.
    #[default]
    Unmeasured,
    Low,
    Medium,
    High,
}

/// Mastery evidence for a skill. The default value is the unmeasured
/// baseline: no attempts, no score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryEvidence {
    /// Number of graded attempts observed.
    pub attempts: u32,
    /// Number of those attempts that were correct.
    pub correct: u32,
    /// Aggregate score in `[0, 1]`, once measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub confidence: Confidence,
}

impl MasteryEvidence {
    /// Returns `true` while no evidence has been recorded.
    pub fn is_unmeasured(&self) -> bool {
        self.attempts == 0 && self.score.is_none() && self.confidence == Confidence::Unmeasured
    }
}

/// Time needed to learn a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffortEstimate {
    /// Estimated minutes of practice, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
    /// `true` when the value is a generator estimate rather than a measurement.
    pub is_estimate: bool,
}

impl Default for EffortEstimate {
    fn default() -> Self {
        EffortEstimate {
            minutes: None,
            is_estimate: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SkillNode
// ---------------------------------------------------------------------------

/// A skill in the merged graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillNode {
    /// Stable identifier.
    pub id: SkillId,
    /// Human-readable display name.
    pub name: String,
    #[serde(default)]
    pub tier: Tier,
    /// Topological depth. Derived from the edge set on every merge pass.
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub description: String,
    /// Short textual contexts in which the skill shows up.
    #[serde(default)]
    pub contexts: Vec<String>,
    /// Question texts known to require this skill, without duplicates.
    #[serde(default)]
    pub required_by: Vec<String>,
    #[serde(default)]
    pub mastery: MasteryEvidence,
    #[serde(default)]
    pub effort: EffortEstimate,
}

impl SkillNode {
    /// Creates a node with every optional field at its default.
    pub fn new(id: impl Into<SkillId>, name: impl Into<String>) -> Self {
        SkillNode {
            id: id.into(),
            name: name.into(),
            tier: Tier::default(),
            level: 0,
            description: String::new(),
            contexts: Vec::new(),
            required_by: Vec::new(),
            mastery: MasteryEvidence::default(),
            effort: EffortEstimate::default(),
        }
    }

    /// Builder-style tier override.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Records that `question` requires this skill.
    ///
    /// Returns `false` if the question was already listed.
    pub fn add_required_by(&mut self, question: &str) -> bool {
        if self.required_by.iter().any(|q| q == question) {
            return false;
        }
        self.required_by.push(question.to_string());
        true
    }

    /// Unions another question list into `required_by`, keeping first-seen order.
    pub fn absorb_required_by<'a>(&mut self, questions: impl IntoIterator<Item = &'a String>) {
        for question in questions {
            self.add_required_by(question);
        }
    }

    /// Unions another context list into `contexts`, keeping first-seen order.
    pub fn absorb_contexts<'a>(&mut self, contexts: impl IntoIterator<Item = &'a String>) {
        for context in contexts {
            if !self.contexts.contains(context) {
                self.contexts.push(context.clone());
            }
        }
    }
}
