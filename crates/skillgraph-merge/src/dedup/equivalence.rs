//! Skill equivalence tests.
//!
//! [`Equivalence`] is the seam for swapping the duplicate-detection method
//! (embedding similarity, curated alias tables) without touching the rest of
//! the pipeline. [`NameOverlap`] is the default string heuristic.

use std::collections::BTreeSet;

use serde::Serialize;

use skillgraph_core::SkillNode;

use crate::config::MergeConfig;

/// Why two nodes were judged equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchReason {
    /// Normalized display names are identical.
    ExactName,
    /// Enough shared name tokens (and the same tier).
    TokenOverlap { ratio: f64 },
    /// A custom [`Equivalence`] said so without further detail.
    Equivalent,
}

/// Decides whether two skills are the same concept.
pub trait Equivalence {
    /// Returns `true` if `candidate` duplicates `canonical`.
    fn are_equivalent(&self, canonical: &SkillNode, candidate: &SkillNode) -> bool;

    /// Like [`are_equivalent`](Self::are_equivalent) but also reports why,
    /// for the merge audit trail.
    fn explain(&self, canonical: &SkillNode, candidate: &SkillNode) -> Option<MatchReason> {
        self.are_equivalent(canonical, candidate)
            .then_some(MatchReason::Equivalent)
    }
}

impl<F> Equivalence for F
where
    F: Fn(&SkillNode, &SkillNode) -> bool,
{
    fn are_equivalent(&self, canonical: &SkillNode, candidate: &SkillNode) -> bool {
        self(canonical, candidate)
    }
}

/// Case-folds a display name and collapses separators and whitespace to
/// single spaces.
///
/// `"List_Comprehensions"` and `"list  comprehensions"` both become
/// `"list comprehensions"`.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '_' | '-' | '.' | '/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ratio of shared tokens to the larger token set. Only words with at least
/// `min_len` characters count; two empty token sets share nothing.
pub fn token_overlap(a: &str, b: &str, min_len: usize) -> f64 {
    let tokens = |s: &str| -> BTreeSet<String> {
        s.split(' ')
            .filter(|word| word.chars().count() >= min_len)
            .map(str::to_string)
            .collect()
    };
    let left = tokens(a);
    let right = tokens(b);
    let larger = left.len().max(right.len());
    if larger == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / larger as f64
}

/// Default duplicate detector: exact normalized-name match, or token overlap
/// at or above a threshold between skills of the same tier.
#[derive(Debug, Clone)]
pub struct NameOverlap {
    pub threshold: f64,
    pub require_same_tier: bool,
    pub min_token_len: usize,
}

impl NameOverlap {
    pub fn from_config(config: &MergeConfig) -> Self {
        NameOverlap {
            threshold: config.overlap_threshold,
            require_same_tier: config.require_same_tier,
            min_token_len: config.min_token_len,
        }
    }
}

impl Default for NameOverlap {
    fn default() -> Self {
        Self::from_config(&MergeConfig::default())
    }
}

impl Equivalence for NameOverlap {
    fn are_equivalent(&self, canonical: &SkillNode, candidate: &SkillNode) -> bool {
        self.explain(canonical, candidate).is_some()
    }

    fn explain(&self, canonical: &SkillNode, candidate: &SkillNode) -> Option<MatchReason> {
        let left = normalize_name(&canonical.name);
        let right = normalize_name(&candidate.name);
        if left == right {
            return Some(MatchReason::ExactName);
        }
        if self.require_same_tier && canonical.tier != candidate.tier {
            return None;
        }
        let ratio = token_overlap(&left, &right, self.min_token_len);
        (ratio >= self.threshold).then_some(MatchReason::TokenOverlap { ratio })
    }
}
