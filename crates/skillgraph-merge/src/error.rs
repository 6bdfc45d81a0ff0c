//! Merge pass errors.
//!
//! Only failures that indicate a broken pass surface here. Malformed
//! collaborator input is reported through [`Malformed`](crate::Malformed)
//! records, and heuristic dedup decisions are never errors.

use thiserror::Error;

use crate::check::InvariantViolation;

/// Errors that abort a merge pass. A graph is never handed out after one of
/// these; callers must discard the pass result.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The cycle breaker hit its iteration cap with nodes still on cycles.
    #[error(
        "cycle breaking did not converge after {iterations} iteration(s): {stuck} node(s) still on cycles"
    )]
    CycleBreakExhausted { iterations: usize, stuck: usize },

    /// The finished graph failed the invariant check.
    #[error("merged graph violates {count} invariant(s), first: {first}", count = .0.len(), first = first_violation(.0))]
    InvariantViolated(Vec<InvariantViolation>),
}

fn first_violation(violations: &[InvariantViolation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}
