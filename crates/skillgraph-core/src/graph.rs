//! SkillGraph: the merged graph container.
//!
//! [`SkillGraph`] is the value that flows between merge passes. Each pass
//! takes a graph by value and returns a new one, so the container itself only
//! offers storage, lookups and a few validated builders. The heavier graph
//! algorithms run over the petgraph view produced by [`SkillGraph::index`].
//!
//! Nodes and questions are kept in insertion order (`IndexMap`). Merge passes
//! rely on that order for their first-seen-wins rules, and it keeps the JSON
//! hand-off to storage deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::edge::PrereqEdge;
use crate::error::CoreError;
use crate::fragment::{RawEdge, RawFragment, RawNode};
use crate::id::SkillId;
use crate::index::IndexedGraph;
use crate::node::SkillNode;

/// Question text to the ordered skill ids it requires.
pub type QuestionMap = IndexMap<String, Vec<SkillId>>;

/// The merged skill graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillGraph {
    /// Skill nodes indexed by id, in arrival order.
    nodes: IndexMap<SkillId, SkillNode>,
    /// Prerequisite edges, in arrival order.
    edges: Vec<PrereqEdge>,
    /// Question associations.
    #[serde(default)]
    questions: QuestionMap,
}

impl SkillGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a graph from its component parts without validation.
    ///
    /// Used by passes that rebuild a graph wholesale and by storage backends
    /// reconstructing a persisted graph.
    pub fn from_parts(
        nodes: IndexMap<SkillId, SkillNode>,
        edges: Vec<PrereqEdge>,
        questions: QuestionMap,
    ) -> Self {
        SkillGraph {
            nodes,
            edges,
            questions,
        }
    }

    /// Decomposes the graph into its component parts.
    pub fn into_parts(self) -> (IndexMap<SkillId, SkillNode>, Vec<PrereqEdge>, QuestionMap) {
        (self.nodes, self.edges, self.questions)
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn nodes(&self) -> &IndexMap<SkillId, SkillNode> {
        &self.nodes
    }

    pub fn edges(&self) -> &[PrereqEdge] {
        &self.edges
    }

    pub fn questions(&self) -> &QuestionMap {
        &self.questions
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &str) -> Option<&SkillNode> {
        self.nodes.get(id)
    }

    /// Looks up a node by id, failing with [`CoreError::SkillNotFound`].
    pub fn require_node(&self, id: &str) -> Result<&SkillNode, CoreError> {
        self.nodes.get(id).ok_or_else(|| CoreError::SkillNotFound {
            id: SkillId::from(id),
        })
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.questions.is_empty()
    }

    /// Returns the direct prerequisites of `id`, in edge order.
    pub fn prerequisites_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a SkillId> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.to.as_str() == id)
            .map(|edge| &edge.from)
    }

    /// Builds the petgraph view used by the graph algorithms.
    pub fn index(&self) -> IndexedGraph {
        IndexedGraph::build(self)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    pub fn node_mut(&mut self, id: &str) -> Option<&mut SkillNode> {
        self.nodes.get_mut(id)
    }

    pub fn nodes_mut(&mut self) -> &mut IndexMap<SkillId, SkillNode> {
        &mut self.nodes
    }

    pub fn edges_mut(&mut self) -> &mut Vec<PrereqEdge> {
        &mut self.edges
    }

    pub fn questions_mut(&mut self) -> &mut QuestionMap {
        &mut self.questions
    }

    /// Inserts a node, replacing any previous node with the same id.
    pub fn insert_node(&mut self, node: SkillNode) -> Option<SkillNode> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Adds an edge after checking both endpoints exist and differ.
    pub fn add_edge(&mut self, edge: PrereqEdge) -> Result<(), CoreError> {
        if edge.is_self_loop() {
            return Err(CoreError::InvalidEdge {
                reason: format!("self-loop on {}", edge.from),
            });
        }
        for endpoint in [&edge.from, &edge.to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(CoreError::SkillNotFound {
                    id: endpoint.clone(),
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    /// Re-expresses the graph as a fragment payload.
    ///
    /// Every field except the derived `level` survives the conversion, so a
    /// merged graph can be fed back through the merge pipeline (re-merge,
    /// resume from a checkpoint).
    pub fn to_fragment(&self) -> RawFragment {
        let nodes = self
            .nodes
            .values()
            .map(|node| RawNode {
                id: Some(node.id.to_string()),
                name: Some(node.name.clone()),
                tier: Some(node.tier.to_string()),
                description: Some(node.description.clone()),
                contexts: Some(node.contexts.clone()),
                mastery: Some(node.mastery.clone()),
                effort: Some(node.effort.clone()),
                unreadable: None,
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|edge| RawEdge {
                from: Some(edge.from.to_string()),
                to: Some(edge.to.to_string()),
                reason: edge.reason.clone(),
                kind: Some(edge.kind.as_str().to_string()),
                unreadable: None,
            })
            .collect();
        let questions = self
            .questions
            .iter()
            .map(|(question, skills)| {
                (
                    question.clone(),
                    skills.iter().map(ToString::to_string).collect(),
                )
            })
            .collect();
        RawFragment {
            nodes,
            edges,
            questions,
        }
    }
}
