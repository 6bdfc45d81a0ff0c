//! Runner error types.
//!
//! [`SourceError`] is what a [`FragmentSource`](crate::FragmentSource)
//! reports for a single fetch attempt. [`RunnerError`] is what aborts a run:
//! a source that kept failing after every retry, a merge pass that refused
//! the graph, or an unusable configuration.

use std::path::PathBuf;

use skillgraph_merge::MergeError;

/// Failure of one fetch attempt.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Reading a recorded fragment failed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload is not fragment JSON at all.
    #[error("fragment payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The source has nothing recorded for this batch.
    #[error("no fragment available for batch {index}")]
    Exhausted { index: usize },

    /// The collaborator could not be reached or refused the request.
    #[error("fragment source unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abort a batch run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Every attempt to fetch a batch failed.
    #[error("batch {batch} failed after {attempts} attempt(s): {source}")]
    Source {
        batch: usize,
        attempts: u32,
        #[source]
        source: SourceError,
    },

    /// The finishing pass rejected the merged graph.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// A checkpoint was taken over a different batch plan.
    #[error(
        "checkpoint covers {checkpoint_batches} batch(es) at index {batch_index}, \
         but the question list plans {planned_batches}"
    )]
    CheckpointMismatch {
        checkpoint_batches: usize,
        batch_index: usize,
        planned_batches: usize,
    },

    /// An environment variable held a value that could not be used.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Config {
        var: &'static str,
        value: String,
        reason: String,
    },
}
