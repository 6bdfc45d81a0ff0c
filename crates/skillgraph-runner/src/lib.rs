//! Async batch pipeline around the merge engine.
//!
//! The engine itself is synchronous. This crate feeds it: questions are
//! chunked into batches, each batch is sent to a [`FragmentSource`], and the
//! returned fragments are folded in order with progress published on a
//! `tokio::sync::watch` channel.

pub mod config;
pub mod error;
pub mod runner;
pub mod source;

pub use config::RunnerConfig;
pub use error::{RunnerError, SourceError};
pub use runner::{BatchRunner, CancelToken, Checkpoint, RunId, RunOutcome};
pub use source::{BatchRequest, FileFragmentSource, FragmentSource, KnownSkill};
