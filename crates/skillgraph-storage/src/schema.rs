//! Connection setup for the SQLite backend.
//!
//! The schema lives in `migrations/` and is applied through
//! `rusqlite_migration`, which tracks progress in SQLite's `user_version`.
//! Foreign keys must be on for every connection: they are what makes a
//! save with an edge or question pointing at an unstored skill fail inside
//! its transaction.

use std::time::Duration;

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::error::StorageError;

/// How long a writer waits for a concurrent `list`/`export` reader.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a store keeps its database.
#[derive(Debug, Clone, Copy)]
pub enum Location<'a> {
    File(&'a str),
    Memory,
}

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!(
        "migrations/001_initial_schema.sql"
    ))])
}

/// Opens a connection at `location` and brings its schema up to date.
pub fn open(location: Location<'_>) -> Result<Connection, StorageError> {
    let mut conn = match location {
        Location::File(path) => {
            let conn = Connection::open(path)?;
            // A graph is written once per run and read by later commands.
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn
        }
        Location::Memory => Connection::open_in_memory()?,
    };
    conn.pragma_update(None, "foreign_keys", "ON")?;

    migrations()
        .to_latest(&mut conn)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn in_memory_has_schema() {
        let conn = open(Location::Memory).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('graphs', 'skills', 'prereq_edges', 'question_skills')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let conn = open(Location::Memory).unwrap();
        conn.execute("INSERT INTO graphs (name) VALUES ('g')", [])
            .unwrap();
        let orphan = conn.execute(
            "INSERT INTO prereq_edges (graph_id, position, from_skill, to_skill, kind) VALUES (1, 0, 'a', 'b', 'requires')",
            [],
        );
        assert!(orphan.is_err());
    }

    #[test]
    fn file_database_reopens_at_latest_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphs.db");
        let path = path.to_str().unwrap();
        drop(open(Location::File(path)).unwrap());

        let conn = open(Location::File(path)).unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
