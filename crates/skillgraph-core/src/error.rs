//! Core error types for skillgraph-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the graph data model itself. Merge-pass failures live in
//! `skillgraph-merge`.

use crate::id::SkillId;
use thiserror::Error;

/// Core errors produced by the skillgraph-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A tier label did not match any known proficiency band.
    #[error("unknown tier: '{value}'")]
    UnknownTier { value: String },

    /// A relationship label did not match any known edge kind.
    #[error("unknown relation kind: '{value}'")]
    UnknownRelation { value: String },

    /// A skill id was not found in the graph.
    #[error("skill not found: {id}")]
    SkillNotFound { id: SkillId },

    /// An edge failed validation.
    #[error("invalid edge: {reason}")]
    InvalidEdge { reason: String },
}
