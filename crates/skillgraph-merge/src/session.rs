//! Ordered fragment ingestion.
//!
//! [`MergeSession`] owns the running accumulated graph of one merge run.
//! Fragments are folded strictly in the order they are ingested, and a
//! [`Progress`] snapshot is returned after each one. The session can be
//! checkpointed between fragments and resumed later; the finishing pass only
//! runs on [`preview`](MergeSession::preview) (on a clone) and
//! [`finish`](MergeSession::finish).

use serde::{Deserialize, Serialize};

use skillgraph_core::{RawFragment, SkillGraph};

use crate::engine::{MergeEngine, MergeOutcome};
use crate::error::MergeError;
use crate::normalize::Malformed;

/// Live progress of a merge run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Number of fragments folded so far.
    pub batch_index: usize,
    pub total_batches: usize,
    /// Skills discovered since the start of the run.
    pub new_nodes: usize,
    /// Skills in the accumulated graph, before dedup.
    pub total_nodes: usize,
    /// Fragment items rejected so far.
    pub rejected: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.batch_index >= self.total_batches
    }
}

/// Ordered ingestion state of one merge run.
#[derive(Debug)]
pub struct MergeSession {
    engine: MergeEngine,
    graph: SkillGraph,
    batch_index: usize,
    total_batches: usize,
    new_nodes: usize,
    rejected: Vec<Malformed>,
}

impl MergeSession {
    /// Starts a run over `total_batches` fragments.
    pub fn new(engine: MergeEngine, total_batches: usize) -> Self {
        Self::resume(engine, SkillGraph::new(), 0, total_batches)
    }

    /// Continues a run from a checkpoint taken after `batch_index`
    /// fragments. Nodes already in `graph` count as discovered by this run.
    pub fn resume(
        engine: MergeEngine,
        graph: SkillGraph,
        batch_index: usize,
        total_batches: usize,
    ) -> Self {
        let new_nodes = graph.node_count();
        MergeSession {
            engine,
            graph,
            batch_index,
            total_batches,
            new_nodes,
            rejected: Vec::new(),
        }
    }

    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    /// Folds the next fragment into the running graph.
    pub fn ingest(&mut self, raw: RawFragment) -> Progress {
        let graph = std::mem::take(&mut self.graph);
        let fold = self.engine.merge_fragment(graph, raw);
        self.graph = fold.graph;
        self.batch_index += 1;
        self.new_nodes += fold.new_nodes.len();
        self.rejected.extend(fold.rejected);

        let progress = self.progress();
        tracing::info!(
            batch = progress.batch_index,
            total = progress.total_batches,
            new_nodes = fold.new_nodes.len(),
            total_nodes = progress.total_nodes,
            "fragment merged"
        );
        progress
    }

    pub fn progress(&self) -> Progress {
        Progress {
            batch_index: self.batch_index,
            total_batches: self.total_batches,
            new_nodes: self.new_nodes,
            total_nodes: self.graph.node_count(),
            rejected: self.rejected.len(),
        }
    }

    /// Runs the finishing pass on a copy of the running graph. The session
    /// itself is unchanged, so ingestion can continue afterwards.
    pub fn preview(&self) -> Result<MergeOutcome, MergeError> {
        self.engine.finish(self.graph.clone())
    }

    /// The accumulated, unfinished graph.
    pub fn snapshot(&self) -> &SkillGraph {
        &self.graph
    }

    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    pub fn rejected(&self) -> &[Malformed] {
        &self.rejected
    }

    /// Stops the run and hands back the checkpoint to resume from.
    pub fn into_checkpoint(self) -> (SkillGraph, usize) {
        (self.graph, self.batch_index)
    }

    /// Runs the finishing pass over everything ingested.
    pub fn finish(self) -> Result<MergeOutcome, MergeError> {
        let mut outcome = self.engine.finish(self.graph)?;
        outcome.report.rejected = self.rejected;
        Ok(outcome)
    }
}
