//! Prerequisite edges between skills.
//!
//! An edge `from -> to` means "`to` requires `from`". Because both directions
//! of an edge between the same pair encode contradictory "requires" claims,
//! duplicate detection uses the undirected [`EdgeKey`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::SkillId;

/// The kind of relationship an edge expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Hard prerequisite.
    #[default]
    Requires,
    /// The dependent skill extends the prerequisite.
    BuildsOn,
    /// Soft ordering hint.
    Recommended,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Requires => "requires",
            RelationKind::BuildsOn => "builds_on",
            RelationKind::Recommended => "recommended",
        }
    }
}

impl FromStr for RelationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "requires" | "prerequisite" | "depends_on" => Ok(RelationKind::Requires),
            "builds_on" | "extends" => Ok(RelationKind::BuildsOn),
            "recommended" | "suggested" => Ok(RelationKind::Recommended),
            _ => Err(CoreError::UnknownRelation {
                value: s.to_string(),
            }),
        }
    }
}

/// A directed prerequisite edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrereqEdge {
    /// The prerequisite skill.
    pub from: SkillId,
    /// The dependent skill.
    pub to: SkillId,
    /// Optional human-readable justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub kind: RelationKind,
}

impl PrereqEdge {
    /// Creates a plain `requires` edge with no justification.
    pub fn new(from: impl Into<SkillId>, to: impl Into<SkillId>) -> Self {
        PrereqEdge {
            from: from.into(),
            to: to.into(),
            reason: None,
            kind: RelationKind::default(),
        }
    }

    /// Builder-style justification.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns `true` if both endpoints are the same skill.
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// Returns the direction-insensitive key for this edge.
    pub fn undirected_key(&self) -> EdgeKey {
        EdgeKey::new(&self.from, &self.to)
    }
}

impl fmt::Display for PrereqEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Direction-insensitive endpoint pair. `EdgeKey::new(a, b) == EdgeKey::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(SkillId, SkillId);

impl EdgeKey {
    pub fn new(a: &SkillId, b: &SkillId) -> Self {
        if a <= b {
            EdgeKey(a.clone(), b.clone())
        } else {
            EdgeKey(b.clone(), a.clone())
        }
    }
}
