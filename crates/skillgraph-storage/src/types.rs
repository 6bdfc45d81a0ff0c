//! Storage-layer types for graph identity and metadata.
//!
//! [`GraphId`] lives here rather than in skillgraph-core because a merged
//! graph only gains an identity when it is persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a stored graph.
///
/// The inner `i64` aligns with SQLite's `INTEGER PRIMARY KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub i64);

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({})", self.0)
    }
}

/// Summary of a stored graph (for listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub id: GraphId,
    pub name: String,
    pub skill_count: usize,
    pub edge_count: usize,
    pub question_count: usize,
    /// Hex content fingerprint of the last saved graph, `None` until the
    /// first save.
    pub fingerprint: Option<String>,
}
