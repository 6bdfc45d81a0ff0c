//! Stable identifier newtype for skills.
//!
//! Skill identifiers are opaque string tokens chosen by the fragment
//! generator (`"list_comprehension"`, `"dict_ops"`). Wrapping them keeps a
//! skill id from being confused with question text or display names.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable skill identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    /// Creates a skill id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        SkillId(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SkillId {
    fn from(id: &str) -> Self {
        SkillId(id.to_string())
    }
}

impl From<String> for SkillId {
    fn from(id: String) -> Self {
        SkillId(id)
    }
}

// Lets maps keyed by SkillId be queried with a plain &str.
impl Borrow<str> for SkillId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
