//! The knowledge graph consistency engine.
//!
//! Merges independently generated graph fragments into one skill graph that
//! is a strict DAG, free of duplicate concepts and redundant edges, with
//! recomputed levels and no dangling question references.
//!
//! Passes, leaves first:
//! - [`normalize`]: fill defaults on raw fragment nodes, reject malformed ones
//! - [`accumulate`]: union nodes by id and edges by undirected endpoint pair
//! - [`dedup`]: merge semantically equivalent nodes through an id remap
//! - [`reduce`]: transitive reduction
//! - [`cycles`]: Kahn-based cycle breaking
//! - [`levels`]: topological depth assignment
//! - [`validate`]: drop dangling edges and question references
//! - [`check`]: full invariant check of a finished graph
//!
//! Every pass is a function from graph to graph. [`MergeEngine`] chains them,
//! and [`MergeSession`] drives ordered fragment ingestion with progress
//! snapshots.

pub mod accumulate;
pub mod check;
pub mod config;
pub mod cycles;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod levels;
pub mod normalize;
pub mod reduce;
pub mod session;
pub mod validate;

pub use check::{check_graph, InvariantViolation};
pub use config::MergeConfig;
pub use accumulate::AccumulateStats;
pub use dedup::{DedupReport, Equivalence, IdRemap, MatchReason, MergeDecision, NameOverlap};
pub use engine::{FoldOutcome, MergeEngine, MergeOutcome, PassReport};
pub use error::MergeError;
pub use normalize::{Malformed, NormalizedFragment};
pub use session::{MergeSession, Progress};
pub use validate::ValidationReport;
