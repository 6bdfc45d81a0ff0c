//! The batch loop that drives a merge run.
//!
//! One run walks its question batches strictly in order: fetch a fragment
//! (retrying with linear backoff), fold it into the [`MergeSession`], publish
//! a [`Progress`] snapshot, pause, repeat. Folding is synchronous, so a
//! cancellation can only take effect while the loop is waiting on the source
//! or sleeping; a cancelled run hands back a [`Checkpoint`] that
//! [`BatchRunner::resume`] continues from.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use skillgraph_core::{RawFragment, SkillGraph};
use skillgraph_merge::{MergeEngine, MergeOutcome, MergeSession, Progress};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::source::{BatchRequest, FragmentSource};

/// Identifies one run in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cooperative cancellation flag shared between a run and its controller.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelToken { tx: Arc::new(tx) }
    }

    /// Requests cancellation. The run stops at its next wait point.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a run interrupted between fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The accumulated graph; the finishing pass has not run on it.
    pub graph: SkillGraph,
    /// Batches folded before the interruption.
    pub batch_index: usize,
    pub total_batches: usize,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(MergeOutcome),
    Cancelled(Checkpoint),
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled(_))
    }
}

/// Drives fragment fetching and merging for one run.
#[derive(Debug)]
pub struct BatchRunner {
    config: RunnerConfig,
    run_id: RunId,
    progress: watch::Sender<Progress>,
    cancel: CancelToken,
}

impl BatchRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let (progress, _rx) = watch::channel(Progress::default());
        BatchRunner {
            config,
            run_id: RunId::new(),
            progress,
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Receives a [`Progress`] snapshot after every folded fragment.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// A handle that cancels this runner's runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Splits the question list into request batches.
    pub fn plan(&self, questions: &[String]) -> Vec<Vec<String>> {
        questions
            .chunks(self.config.batch_size.max(1))
            .map(<[String]>::to_vec)
            .collect()
    }

    /// Runs every batch from the start.
    pub async fn run<S>(
        &self,
        engine: MergeEngine,
        questions: &[String],
        source: &S,
    ) -> Result<RunOutcome, RunnerError>
    where
        S: FragmentSource + Sync,
    {
        let batches = self.plan(questions);
        let session = MergeSession::new(engine, batches.len());
        self.drive(session, batches, source).await
    }

    /// Continues a cancelled run over the same question list. A checkpoint
    /// whose batch count differs from the current plan is refused.
    pub async fn resume<S>(
        &self,
        engine: MergeEngine,
        checkpoint: Checkpoint,
        questions: &[String],
        source: &S,
    ) -> Result<RunOutcome, RunnerError>
    where
        S: FragmentSource + Sync,
    {
        let batches = self.plan(questions);
        if checkpoint.total_batches != batches.len() || checkpoint.batch_index > batches.len() {
            return Err(RunnerError::CheckpointMismatch {
                checkpoint_batches: checkpoint.total_batches,
                batch_index: checkpoint.batch_index,
                planned_batches: batches.len(),
            });
        }
        let session = MergeSession::resume(
            engine,
            checkpoint.graph,
            checkpoint.batch_index,
            batches.len(),
        );
        self.drive(session, batches, source).await
    }

    async fn drive<S>(
        &self,
        mut session: MergeSession,
        batches: Vec<Vec<String>>,
        source: &S,
    ) -> Result<RunOutcome, RunnerError>
    where
        S: FragmentSource + Sync,
    {
        let span = tracing::info_span!("merge_run", run_id = %self.run_id);
        async move {
            let start = session.batch_index();
            tracing::info!(
                start,
                total = batches.len(),
                batch_size = self.config.batch_size,
                "merge run started"
            );
            self.progress.send_replace(session.progress());

            for (index, questions) in batches.into_iter().enumerate().skip(start) {
                if index > start && !self.pause(self.config.inter_batch_delay).await {
                    return Ok(self.cancelled(session));
                }
                if self.cancel.is_cancelled() {
                    return Ok(self.cancelled(session));
                }

                let request = BatchRequest::new(index, questions, session.snapshot());
                let Some(raw) = self.fetch_with_retry(source, request).await? else {
                    return Ok(self.cancelled(session));
                };
                let progress = session.ingest(raw);
                self.progress.send_replace(progress);
            }

            let outcome = session.finish()?;
            tracing::info!(
                skills = outcome.graph.node_count(),
                edges = outcome.graph.edge_count(),
                "merge run completed"
            );
            Ok(RunOutcome::Completed(outcome))
        }
        .instrument(span)
        .await
    }

    /// Fetches one batch. `Ok(None)` means the run was cancelled meanwhile.
    async fn fetch_with_retry<S>(
        &self,
        source: &S,
        request: BatchRequest,
    ) -> Result<Option<RawFragment>, RunnerError>
    where
        S: FragmentSource + Sync,
    {
        let attempts = self.config.attempts();
        let batch = request.index;
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(None),
                result = source.fetch(request.clone()) => result,
            };

            match result {
                Ok(raw) => return Ok(Some(raw)),
                Err(err) if attempt < attempts => {
                    let backoff = self.config.backoff_for(attempt);
                    tracing::warn!(
                        batch,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "fragment fetch failed, retrying"
                    );
                    if !self.pause(backoff).await {
                        return Ok(None);
                    }
                    attempt += 1;
                }
                Err(source) => {
                    tracing::error!(batch, attempts, error = %source, "fragment fetch failed");
                    return Err(RunnerError::Source {
                        batch,
                        attempts,
                        source,
                    });
                }
            }
        }
    }

    /// Sleeps for `delay`. Returns `false` if cancelled first.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn cancelled(&self, session: MergeSession) -> RunOutcome {
        let total_batches = session.progress().total_batches;
        let (graph, batch_index) = session.into_checkpoint();
        tracing::info!(batch_index, total_batches, "merge run cancelled");
        RunOutcome::Cancelled(Checkpoint {
            graph,
            batch_index,
            total_batches,
        })
    }
}
