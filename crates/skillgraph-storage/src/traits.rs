//! The [`GraphStore`] trait defining the storage contract for merged graphs.
//!
//! A merged graph is only consistent as a whole, so the contract is
//! whole-graph: `save_graph` replaces everything stored under an id in one
//! step, and there are no per-node or per-edge writes.
//!
//! All backends (InMemoryStore, SqliteStore) implement this trait and are
//! fully swappable.

use skillgraph_core::SkillGraph;

use crate::error::StorageError;
use crate::types::{GraphId, GraphSummary};

/// The storage contract for merged skill graphs.
///
/// The trait is synchronous; the merge engine hands off a finished graph
/// once per run.
pub trait GraphStore {
    /// Creates a new empty graph entry with the given name.
    fn create_graph(&mut self, name: &str) -> Result<GraphId, StorageError>;

    /// Replaces the stored content of `id` with `graph`, atomically.
    fn save_graph(&mut self, id: GraphId, graph: &SkillGraph) -> Result<(), StorageError>;

    /// Loads a complete graph.
    fn load_graph(&self, id: GraphId) -> Result<SkillGraph, StorageError>;

    /// Deletes a graph and all its rows.
    fn delete_graph(&mut self, id: GraphId) -> Result<(), StorageError>;

    /// Lists all stored graphs, oldest first.
    fn list_graphs(&self) -> Result<Vec<GraphSummary>, StorageError>;

    /// Creates a graph entry and saves `graph` under it. If the save fails
    /// the entry is removed again.
    fn insert_graph(&mut self, name: &str, graph: &SkillGraph) -> Result<GraphId, StorageError> {
        let id = self.create_graph(name)?;
        if let Err(err) = self.save_graph(id, graph) {
            self.delete_graph(id)?;
            return Err(err);
        }
        Ok(id)
    }

    /// Returns the newest graph stored under `name`.
    fn find_graph(&self, name: &str) -> Result<Option<GraphId>, StorageError> {
        Ok(self
            .list_graphs()?
            .into_iter()
            .rev()
            .find(|summary| summary.name == name)
            .map(|summary| summary.id))
    }
}
