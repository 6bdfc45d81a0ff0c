//! The identifier remapping table produced by one dedup pass.

use indexmap::IndexMap;
use serde::Serialize;

use skillgraph_core::SkillId;

/// Maps absorbed duplicate ids to the canonical id that replaced them.
///
/// Transient: built by a single pass, used to rewrite edges and question
/// associations, then returned in the pass report for auditing only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdRemap {
    map: IndexMap<SkillId, SkillId>,
}

impl IdRemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `absorbed -> canonical`.
    pub fn insert(&mut self, absorbed: SkillId, canonical: SkillId) {
        self.map.insert(absorbed, canonical);
    }

    /// Returns the canonical id for `id`, or `id` itself if it was not remapped.
    pub fn resolve<'a>(&'a self, id: &'a SkillId) -> &'a SkillId {
        self.map.get(id).unwrap_or(id)
    }

    pub fn get(&self, id: &str) -> Option<&SkillId> {
        self.map.get(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SkillId, &SkillId)> {
        self.map.iter()
    }
}
