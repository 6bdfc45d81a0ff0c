//! Deterministic content fingerprints for skill graphs using blake3.
//!
//! A graph's fingerprint composes per-skill hashes, per-edge hashes and the
//! question associations in their stored order. The SQLite backend records
//! the fingerprint on save and re-derives it on load; a mismatch means the
//! rows were changed outside the store.
//!
//! # Determinism
//!
//! - `serde_json::to_vec` is canonical for these types (no `HashMap` fields)
//! - nodes, edges and questions are hashed in insertion order, which storage
//!   preserves through explicit position columns
//! - every variable-length field is length-prefixed

use skillgraph_core::{PrereqEdge, SkillGraph, SkillNode};

use crate::error::StorageError;

fn update_str(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Hashes a skill's full content, level included.
pub fn hash_skill(node: &SkillNode) -> Result<blake3::Hash, StorageError> {
    let bytes = serde_json::to_vec(node)?;
    Ok(blake3::hash(&bytes))
}

/// Hashes an edge's endpoints, justification and kind.
pub fn hash_edge(edge: &PrereqEdge) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    update_str(&mut hasher, edge.from.as_str());
    update_str(&mut hasher, edge.to.as_str());
    match &edge.reason {
        Some(reason) => {
            hasher.update(&[1]);
            update_str(&mut hasher, reason);
        }
        None => {
            hasher.update(&[0]);
        }
    }
    update_str(&mut hasher, edge.kind.as_str());
    hasher.finalize()
}

/// Composes the fingerprint of a whole graph.
pub fn fingerprint(graph: &SkillGraph) -> Result<blake3::Hash, StorageError> {
    let mut hasher = blake3::Hasher::new();

    hasher.update(b"skills");
    hasher.update(&(graph.node_count() as u64).to_le_bytes());
    for node in graph.nodes().values() {
        hasher.update(hash_skill(node)?.as_bytes());
    }

    hasher.update(b"edges");
    hasher.update(&(graph.edge_count() as u64).to_le_bytes());
    for edge in graph.edges() {
        hasher.update(hash_edge(edge).as_bytes());
    }

    hasher.update(b"questions");
    hasher.update(&(graph.questions().len() as u64).to_le_bytes());
    for (question, skills) in graph.questions() {
        update_str(&mut hasher, question);
        hasher.update(&(skills.len() as u64).to_le_bytes());
        for skill in skills {
            update_str(&mut hasher, skill.as_str());
        }
    }

    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::SkillId;

    fn sample() -> SkillGraph {
        let mut graph = SkillGraph::new();
        graph.insert_node(SkillNode::new("a", "Alpha"));
        graph.insert_node(SkillNode::new("b", "Beta"));
        graph.add_edge(PrereqEdge::new("a", "b")).unwrap();
        graph
            .questions_mut()
            .insert("q".into(), vec![SkillId::from("b")]);
        graph
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint(&sample()).unwrap(), fingerprint(&sample()).unwrap());
    }

    #[test]
    fn fingerprint_sees_every_part() {
        let base = fingerprint(&sample()).unwrap();

        let mut relevelled = sample();
        relevelled.node_mut("b").unwrap().level = 1;
        assert_ne!(fingerprint(&relevelled).unwrap(), base);

        let mut justified = sample();
        justified.edges_mut()[0].reason = Some("why".into());
        assert_ne!(fingerprint(&justified).unwrap(), base);

        let mut requestioned = sample();
        requestioned.questions_mut().insert("q2".into(), vec![SkillId::from("a")]);
        assert_ne!(fingerprint(&requestioned).unwrap(), base);
    }

    #[test]
    fn edge_hash_separates_fields() {
        // Without length prefixes "ab" -> "c" and "a" -> "bc" would collide.
        assert_ne!(
            hash_edge(&PrereqEdge::new("ab", "c")),
            hash_edge(&PrereqEdge::new("a", "bc"))
        );
    }
}
