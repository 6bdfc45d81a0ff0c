//! In-memory implementation of [`GraphStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and one-shot runs
//! where persistence isn't needed. It stores decomposed rows so that loads go
//! through the same [`recompose`] integrity checks as the SQLite backend.

use std::collections::BTreeMap;

use skillgraph_core::SkillGraph;

use crate::convert::{decompose, recompose, DecomposedGraph};
use crate::error::StorageError;
use crate::hash::fingerprint;
use crate::traits::GraphStore;
use crate::types::{GraphId, GraphSummary};

/// Data stored for a single graph.
#[derive(Debug, Clone)]
struct StoredGraph {
    name: String,
    rows: DecomposedGraph,
    question_count: usize,
    fingerprint: Option<String>,
}

/// In-memory implementation of [`GraphStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    graphs: BTreeMap<i64, StoredGraph>,
    next_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            graphs: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn get(&self, id: GraphId) -> Result<&StoredGraph, StorageError> {
        self.graphs.get(&id.0).ok_or(StorageError::GraphNotFound(id.0))
    }
}

impl GraphStore for InMemoryStore {
    fn create_graph(&mut self, name: &str) -> Result<GraphId, StorageError> {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.graphs.insert(
            id,
            StoredGraph {
                name: name.to_string(),
                rows: DecomposedGraph::default(),
                question_count: 0,
                fingerprint: None,
            },
        );
        Ok(GraphId(id))
    }

    fn save_graph(&mut self, id: GraphId, graph: &SkillGraph) -> Result<(), StorageError> {
        let hash = fingerprint(graph)?;
        let rows = decompose(graph);
        // Reject what a load would reject, before touching the stored copy.
        recompose(rows.clone())?;
        let stored = self
            .graphs
            .get_mut(&id.0)
            .ok_or(StorageError::GraphNotFound(id.0))?;
        stored.rows = rows;
        stored.question_count = graph.questions().len();
        stored.fingerprint = Some(hash.to_hex().to_string());
        Ok(())
    }

    fn load_graph(&self, id: GraphId) -> Result<SkillGraph, StorageError> {
        recompose(self.get(id)?.rows.clone())
    }

    fn delete_graph(&mut self, id: GraphId) -> Result<(), StorageError> {
        self.graphs
            .remove(&id.0)
            .map(|_| ())
            .ok_or(StorageError::GraphNotFound(id.0))
    }

    fn list_graphs(&self) -> Result<Vec<GraphSummary>, StorageError> {
        Ok(self
            .graphs
            .iter()
            .map(|(id, stored)| GraphSummary {
                id: GraphId(*id),
                name: stored.name.clone(),
                skill_count: stored.rows.skills.len(),
                edge_count: stored.rows.edges.len(),
                question_count: stored.question_count,
                fingerprint: stored.fingerprint.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::{PrereqEdge, SkillId, SkillNode};

    fn sample() -> SkillGraph {
        let mut graph = SkillGraph::new();
        graph.insert_node(SkillNode::new("a", "Alpha"));
        graph.insert_node(SkillNode::new("b", "Beta"));
        graph.add_edge(PrereqEdge::new("a", "b")).unwrap();
        graph
            .questions_mut()
            .insert("q".into(), vec![SkillId::from("a"), SkillId::from("b")]);
        graph
    }

    #[test]
    fn save_load_roundtrip() {
        let mut store = InMemoryStore::new();
        let id = store.insert_graph("run-1", &sample()).unwrap();
        assert_eq!(store.load_graph(id).unwrap(), sample());

        let summaries = store.list_graphs().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].skill_count, 2);
        assert_eq!(summaries[0].edge_count, 1);
        assert_eq!(summaries[0].question_count, 1);
        assert!(summaries[0].fingerprint.is_some());
    }

    #[test]
    fn failed_insert_is_rolled_back() {
        let mut store = InMemoryStore::new();
        let mut broken = sample();
        broken.edges_mut().push(PrereqEdge::new("a", "ghost"));

        assert!(matches!(
            store.insert_graph("week-1", &broken),
            Err(StorageError::IntegrityError { .. })
        ));
        assert!(store.list_graphs().unwrap().is_empty());
    }

    #[test]
    fn save_replaces_previous_content() {
        let mut store = InMemoryStore::new();
        let id = store.insert_graph("run", &sample()).unwrap();
        store.save_graph(id, &SkillGraph::new()).unwrap();
        assert!(store.load_graph(id).unwrap().is_empty());
    }

    #[test]
    fn missing_graph_errors() {
        let mut store = InMemoryStore::new();
        assert!(matches!(
            store.load_graph(GraphId(42)),
            Err(StorageError::GraphNotFound(42))
        ));
        assert!(matches!(
            store.save_graph(GraphId(42), &sample()),
            Err(StorageError::GraphNotFound(42))
        ));
        let id = store.create_graph("gone").unwrap();
        store.delete_graph(id).unwrap();
        assert!(store.delete_graph(id).is_err());
    }

    #[test]
    fn find_graph_prefers_newest() {
        let mut store = InMemoryStore::new();
        let _old = store.create_graph("nightly").unwrap();
        let new = store.create_graph("nightly").unwrap();
        assert_eq!(store.find_graph("nightly").unwrap(), Some(new));
        assert_eq!(store.find_graph("weekly").unwrap(), None);
    }
}
