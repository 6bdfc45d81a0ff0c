//! SQLite implementation of [`GraphStore`].
//!
//! [`SqliteStore`] persists merged graphs in a SQLite database with WAL mode,
//! one transaction per write, and automatic schema migrations. Skills, edges
//! and question associations are stored as position-tagged rows; nested
//! skill fields (contexts, required-by lists, mastery and effort records) are
//! JSON TEXT columns via serde_json.

use rusqlite::{params, Connection, Transaction};

use skillgraph_core::{PrereqEdge, SkillGraph, SkillId, SkillNode};

use crate::convert::{decompose, recompose, DecomposedGraph, QuestionRow};
use crate::error::StorageError;
use crate::hash::fingerprint;
use crate::schema::Location;
use crate::traits::GraphStore;
use crate::types::{GraphId, GraphSummary};

/// SQLite-backed implementation of [`GraphStore`].
///
/// Every write operation is wrapped in a transaction, so a failed save
/// leaves the previously stored graph untouched.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open(Location::File(path))?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open(Location::Memory)?;
        Ok(SqliteStore { conn })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Verifies a graph exists, returning an error if not.
    fn assert_graph_exists(&self, id: GraphId) -> Result<(), StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM graphs WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::GraphNotFound(id.0));
        }
        Ok(())
    }

    /// Deletes all child rows of a graph, dependents first.
    fn clear_rows(tx: &Transaction<'_>, graph_id: i64) -> Result<(), StorageError> {
        tx.execute(
            "DELETE FROM question_skills WHERE graph_id = ?1",
            params![graph_id],
        )?;
        tx.execute(
            "DELETE FROM prereq_edges WHERE graph_id = ?1",
            params![graph_id],
        )?;
        tx.execute("DELETE FROM skills WHERE graph_id = ?1", params![graph_id])?;
        Ok(())
    }

    /// Replaces all rows of a graph inside `tx`. Assumes the graph row
    /// already exists; the caller commits.
    fn write_rows(
        tx: &Transaction<'_>,
        graph_id: i64,
        graph: &SkillGraph,
    ) -> Result<(), StorageError> {
        let hash = fingerprint(graph)?;
        let decomposed = decompose(graph);
        Self::clear_rows(tx, graph_id)?;

        // Insert skills
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO skills (graph_id, position, skill_id, name, tier, level, description, contexts_json, required_by_json, mastery_json, effort_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, node) in &decomposed.skills {
                stmt.execute(params![
                    graph_id,
                    position,
                    node.id.as_str(),
                    node.name,
                    node.tier.as_str(),
                    node.level,
                    node.description,
                    serde_json::to_string(&node.contexts)?,
                    serde_json::to_string(&node.required_by)?,
                    serde_json::to_string(&node.mastery)?,
                    serde_json::to_string(&node.effort)?,
                ])?;
            }
        }

        // Insert edges
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO prereq_edges (graph_id, position, from_skill, to_skill, reason, kind) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, edge) in &decomposed.edges {
                stmt.execute(params![
                    graph_id,
                    position,
                    edge.from.as_str(),
                    edge.to.as_str(),
                    edge.reason,
                    edge.kind.as_str(),
                ])?;
            }
        }

        // Insert question associations
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO question_skills (graph_id, question_position, question, slot, skill_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in &decomposed.questions {
                stmt.execute(params![
                    graph_id,
                    row.question_position,
                    row.question,
                    row.slot,
                    row.skill.as_str(),
                ])?;
            }
        }

        tx.execute(
            "UPDATE graphs SET fingerprint = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![hash.to_hex().as_str(), graph_id],
        )?;
        Ok(())
    }

    /// Loads all rows of a graph.
    fn load_decomposed(&self, graph_id: i64) -> Result<DecomposedGraph, StorageError> {
        // Load skills
        let skills: Vec<(u32, SkillNode)> = {
            let mut stmt = self.conn.prepare_cached(
                "SELECT position, skill_id, name, tier, level, description, contexts_json, required_by_json, mastery_json, effort_json FROM skills WHERE graph_id = ?1 ORDER BY position",
            )?;
            let rows = stmt.query_map(params![graph_id], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })?;
            let mut result = Vec::new();
            for row in rows {
                let (position, id, name, tier, level, description, contexts, required_by, mastery, effort) =
                    row?;
                let tier = tier.parse().map_err(|err| StorageError::IntegrityError {
                    reason: format!("skill {id}: {err}"),
                })?;
                let mut node = SkillNode::new(SkillId::new(id), name).with_tier(tier);
                node.level = level;
                node.description = description;
                node.contexts = serde_json::from_str(&contexts)?;
                node.required_by = serde_json::from_str(&required_by)?;
                node.mastery = serde_json::from_str(&mastery)?;
                node.effort = serde_json::from_str(&effort)?;
                result.push((position, node));
            }
            result
        };

        // Load edges
        let edges: Vec<(u32, PrereqEdge)> = {
            let mut stmt = self.conn.prepare_cached(
                "SELECT position, from_skill, to_skill, reason, kind FROM prereq_edges WHERE graph_id = ?1 ORDER BY position",
            )?;
            let rows = stmt.query_map(params![graph_id], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            let mut result = Vec::new();
            for row in rows {
                let (position, from, to, reason, kind) = row?;
                let kind = kind.parse().map_err(|err| StorageError::IntegrityError {
                    reason: format!("edge #{position}: {err}"),
                })?;
                result.push((
                    position,
                    PrereqEdge {
                        from: SkillId::new(from),
                        to: SkillId::new(to),
                        reason,
                        kind,
                    },
                ));
            }
            result
        };

        // Load question associations
        let questions: Vec<QuestionRow> = {
            let mut stmt = self.conn.prepare_cached(
                "SELECT question_position, question, slot, skill_id FROM question_skills WHERE graph_id = ?1 ORDER BY question_position, slot",
            )?;
            let rows = stmt.query_map(params![graph_id], |row| {
                Ok(QuestionRow {
                    question_position: row.get(0)?,
                    question: row.get(1)?,
                    slot: row.get(2)?,
                    skill: SkillId::new(row.get::<_, String>(3)?),
                })
            })?;
            let mut result = Vec::new();
            for row in rows {
                result.push(row?);
            }
            result
        };

        Ok(DecomposedGraph {
            skills,
            edges,
            questions,
        })
    }
}

impl GraphStore for SqliteStore {
    fn create_graph(&mut self, name: &str) -> Result<GraphId, StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("INSERT INTO graphs (name) VALUES (?1)", params![name])?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(GraphId(id))
    }

    fn save_graph(&mut self, id: GraphId, graph: &SkillGraph) -> Result<(), StorageError> {
        self.assert_graph_exists(id)?;
        let tx = self.conn.transaction()?;
        Self::write_rows(&tx, id.0, graph)?;
        tx.commit()?;
        Ok(())
    }

    /// Creates the graph row and its content in a single transaction, so a
    /// failed save leaves no empty entry behind.
    fn insert_graph(&mut self, name: &str, graph: &SkillGraph) -> Result<GraphId, StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("INSERT INTO graphs (name) VALUES (?1)", params![name])?;
        let id = tx.last_insert_rowid();
        Self::write_rows(&tx, id, graph)?;
        tx.commit()?;
        Ok(GraphId(id))
    }

    fn load_graph(&self, id: GraphId) -> Result<SkillGraph, StorageError> {
        self.assert_graph_exists(id)?;
        let decomposed = self.load_decomposed(id.0)?;
        let graph = recompose(decomposed)?;

        let stored: Option<String> = self.conn.query_row(
            "SELECT fingerprint FROM graphs WHERE id = ?1",
            params![id.0],
            |row| row.get(0),
        )?;
        if let Some(stored) = stored {
            let actual = fingerprint(&graph)?;
            if actual.to_hex().as_str() != stored {
                return Err(StorageError::IntegrityError {
                    reason: format!("graph {} does not match its stored fingerprint", id.0),
                });
            }
        }
        Ok(graph)
    }

    fn delete_graph(&mut self, id: GraphId) -> Result<(), StorageError> {
        self.assert_graph_exists(id)?;
        let tx = self.conn.transaction()?;
        Self::clear_rows(&tx, id.0)?;
        tx.execute("DELETE FROM graphs WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(())
    }

    fn list_graphs(&self) -> Result<Vec<GraphSummary>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT g.id, g.name, g.fingerprint, \
                (SELECT COUNT(*) FROM skills s WHERE s.graph_id = g.id), \
                (SELECT COUNT(*) FROM prereq_edges e WHERE e.graph_id = g.id), \
                (SELECT COUNT(DISTINCT q.question_position) FROM question_skills q WHERE q.graph_id = g.id) \
             FROM graphs g ORDER BY g.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(GraphSummary {
                id: GraphId(row.get(0)?),
                name: row.get(1)?,
                fingerprint: row.get(2)?,
                skill_count: row.get::<_, i64>(3)? as usize,
                edge_count: row.get::<_, i64>(4)? as usize,
                question_count: row.get::<_, i64>(5)? as usize,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::{Confidence, MasteryEvidence, RelationKind, Tier};

    fn sample() -> SkillGraph {
        let mut graph = SkillGraph::new();
        let mut variables = SkillNode::new("variables", "Variables").with_tier(Tier::Foundational);
        variables.description = "Naming values".into();
        variables.mastery = MasteryEvidence {
            attempts: 4,
            correct: 3,
            score: Some(0.75),
            confidence: Confidence::Medium,
        };
        graph.insert_node(variables);
        let mut loops = SkillNode::new("loops", "Loops");
        loops.level = 1;
        loops.contexts = vec!["for over a range".into()];
        loops.required_by = vec!["Sum 1..n".into()];
        graph.insert_node(loops);
        graph
            .add_edge(PrereqEdge {
                kind: RelationKind::BuildsOn,
                ..PrereqEdge::new("variables", "loops").with_reason("loop counters")
            })
            .unwrap();
        graph.questions_mut().insert(
            "Sum 1..n".into(),
            vec![SkillId::from("loops"), SkillId::from("variables")],
        );
        graph
    }

    #[test]
    fn save_load_roundtrip() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.insert_graph("run-1", &sample()).unwrap();
        assert_eq!(store.load_graph(id).unwrap(), sample());
    }

    #[test]
    fn save_replaces_previous_rows() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.insert_graph("run", &sample()).unwrap();

        let mut smaller = SkillGraph::new();
        smaller.insert_node(SkillNode::new("closures", "Closures"));
        store.save_graph(id, &smaller).unwrap();

        assert_eq!(store.load_graph(id).unwrap(), smaller);
        let summary = &store.list_graphs().unwrap()[0];
        assert_eq!(summary.skill_count, 1);
        assert_eq!(summary.edge_count, 0);
        assert_eq!(summary.question_count, 0);
    }

    #[test]
    fn list_counts_and_fingerprints() {
        let mut store = SqliteStore::in_memory().unwrap();
        let empty = store.create_graph("pending").unwrap();
        let full = store.insert_graph("done", &sample()).unwrap();

        let summaries = store.list_graphs().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, empty);
        assert_eq!(summaries[0].fingerprint, None);
        assert_eq!(summaries[1].id, full);
        assert_eq!((summaries[1].skill_count, summaries[1].edge_count), (2, 1));
        assert_eq!(summaries[1].question_count, 1);
        assert_eq!(
            summaries[1].fingerprint.as_deref(),
            Some(fingerprint(&sample()).unwrap().to_hex().as_str())
        );
    }

    #[test]
    fn failed_insert_leaves_nothing_behind() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut broken = sample();
        broken.edges_mut().push(PrereqEdge::new("loops", "ghost"));

        assert!(store.insert_graph("week-1", &broken).is_err());
        assert!(store.list_graphs().unwrap().is_empty());
        assert_eq!(store.find_graph("week-1").unwrap(), None);

        let id = store.insert_graph("week-1", &sample()).unwrap();
        assert_eq!(store.list_graphs().unwrap().len(), 1);
        assert_eq!(store.load_graph(id).unwrap(), sample());
    }

    #[test]
    fn failed_save_keeps_previous_content() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.insert_graph("run", &sample()).unwrap();
        let mut broken = sample();
        broken.edges_mut().push(PrereqEdge::new("ghost", "loops"));

        assert!(store.save_graph(id, &broken).is_err());
        assert_eq!(store.load_graph(id).unwrap(), sample());
    }

    #[test]
    fn tampered_rows_fail_integrity_check() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.insert_graph("run", &sample()).unwrap();
        store
            .conn
            .execute("UPDATE skills SET level = 9 WHERE skill_id = 'loops'", [])
            .unwrap();
        assert!(matches!(
            store.load_graph(id),
            Err(StorageError::IntegrityError { .. })
        ));
    }

    #[test]
    fn dangling_edge_is_rejected_by_schema() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.create_graph("bad").unwrap();
        let mut graph = sample();
        graph.edges_mut().push(PrereqEdge::new("loops", "ghost"));
        assert!(matches!(
            store.save_graph(id, &graph),
            Err(StorageError::Sqlite(_))
        ));
        // The failed transaction left nothing behind.
        assert_eq!(store.list_graphs().unwrap()[0].skill_count, 0);
    }

    #[test]
    fn delete_removes_graph() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.insert_graph("run", &sample()).unwrap();
        store.delete_graph(id).unwrap();
        assert!(matches!(
            store.load_graph(id),
            Err(StorageError::GraphNotFound(_))
        ));
        assert!(store.list_graphs().unwrap().is_empty());
    }
}
