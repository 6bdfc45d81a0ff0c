//! Storage abstraction for merged skill graphs.
//!
//! Provides the [`GraphStore`] trait defining the whole-graph storage
//! contract, plus the [`InMemoryStore`] and [`SqliteStore`] backends.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: GraphId, GraphSummary storage-layer types
//! - [`traits`]: GraphStore trait definition
//! - [`convert`]: SkillGraph decompose/recompose functions
//! - [`hash`]: blake3 content fingerprints
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: connection setup and migrations
//! - [`sqlite`]: SqliteStore implementation

pub mod convert;
pub mod error;
pub mod hash;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use hash::{fingerprint, hash_edge, hash_skill};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::GraphStore;
pub use types::{GraphId, GraphSummary};
