//! Data model for merged skill graphs.
//!
//! A [`SkillGraph`] holds skill nodes, prerequisite edges and the mapping from
//! question text to the skills each question requires. Fragments produced by
//! an external generator arrive as loosely-typed [`RawFragment`] payloads and
//! are normalized into [`Fragment`] values before they are merged.

pub mod edge;
pub mod error;
pub mod fragment;
pub mod graph;
pub mod id;
pub mod index;
pub mod node;

// Re-export commonly used types
pub use edge::{EdgeKey, PrereqEdge, RelationKind};
pub use error::CoreError;
pub use fragment::{Fragment, RawEdge, RawFragment, RawNode};
pub use graph::{QuestionMap, SkillGraph};
pub use id::SkillId;
pub use index::IndexedGraph;
pub use node::{Confidence, EffortEstimate, MasteryEvidence, SkillNode, Tier};
