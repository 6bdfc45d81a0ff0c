//! Fragment payloads as returned by the graph generator.
//!
//! [`RawFragment`] mirrors the generator's JSON shape with every field
//! optional, so a partially malformed payload still deserializes and can be
//! normalized node by node. Nodes and edges are read one at a time: an item
//! that cannot be read at all is kept as a placeholder carrying the parse
//! error, and a mistyped optional field falls back to "absent". [`Fragment`]
//! is the normalized counterpart that the accumulator consumes.

use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::edge::PrereqEdge;
use crate::graph::QuestionMap;
use crate::node::{EffortEstimate, MasteryEvidence, SkillNode};

/// A node as the generator described it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawNode {
    pub id: Option<String>,
    #[serde(alias = "label")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub tier: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub contexts: Option<Vec<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient"
    )]
    pub mastery: Option<MasteryEvidence>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient"
    )]
    pub effort: Option<EffortEstimate>,
    /// Set when the item could not be read as a node at all.
    #[serde(skip)]
    pub unreadable: Option<String>,
}

impl RawNode {
    /// Shorthand for a node carrying only the mandatory fields.
    pub fn named(id: &str, name: &str) -> Self {
        RawNode {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            ..RawNode::default()
        }
    }

    /// Placeholder for an item that failed to deserialize.
    pub fn unreadable(error: impl ToString) -> Self {
        RawNode {
            unreadable: Some(error.to_string()),
            ..RawNode::default()
        }
    }
}

/// An edge as the generator described it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEdge {
    #[serde(alias = "source")]
    pub from: Option<String>,
    #[serde(alias = "target")]
    pub to: Option<String>,
    #[serde(alias = "rationale", deserialize_with = "lenient")]
    pub reason: Option<String>,
    #[serde(alias = "relationship", deserialize_with = "lenient")]
    pub kind: Option<String>,
    /// Set when the item could not be read as an edge at all.
    #[serde(skip)]
    pub unreadable: Option<String>,
}

impl RawEdge {
    pub fn between(from: &str, to: &str) -> Self {
        RawEdge {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            ..RawEdge::default()
        }
    }

    /// Placeholder for an item that failed to deserialize.
    pub fn unreadable(error: impl ToString) -> Self {
        RawEdge {
            unreadable: Some(error.to_string()),
            ..RawEdge::default()
        }
    }
}

/// One batch worth of generator output, untrusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireFragment")]
pub struct RawFragment {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
    /// Question text to the skill ids it requires.
    pub questions: IndexMap<String, Vec<String>>,
}

impl RawFragment {
    /// Parses generator output, tolerating a surrounding Markdown code fence.
    ///
    /// Only a payload that is not a JSON object with list-shaped `nodes` and
    /// `edges` fails; individual items are never fatal.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(strip_code_fence(text))
    }

    /// Returns `true` if the fragment carries no nodes, edges or questions.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.questions.is_empty()
    }
}

/// The payload as it arrives, before per-item reading.
#[derive(Deserialize, Default)]
#[serde(default)]
struct WireFragment {
    nodes: Vec<Value>,
    edges: Vec<Value>,
    #[serde(alias = "question_skills")]
    questions: IndexMap<String, Value>,
}

impl From<WireFragment> for RawFragment {
    fn from(wire: WireFragment) -> Self {
        let nodes = wire
            .nodes
            .into_iter()
            .map(|value| RawNode::deserialize(value).unwrap_or_else(RawNode::unreadable))
            .collect();
        let edges = wire
            .edges
            .into_iter()
            .map(|value| RawEdge::deserialize(value).unwrap_or_else(RawEdge::unreadable))
            .collect();
        let questions = wire
            .questions
            .into_iter()
            .filter_map(|(question, skills)| match string_list(skills) {
                Some(skills) => Some((question, skills)),
                None => {
                    tracing::warn!(%question, "dropping question with unreadable skill list");
                    None
                }
            })
            .collect();
        RawFragment {
            nodes,
            edges,
            questions,
        }
    }
}

/// Reads an optional field, treating a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match T::deserialize(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            tracing::warn!(%err, "ignoring mistyped fragment field");
            Ok(None)
        }
    }
}

/// Like [`lenient`], but for string lists. See [`string_list`].
fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    let list = string_list(value);
    if list.is_none() {
        tracing::warn!("ignoring mistyped string list in fragment");
    }
    Ok(list)
}

/// Reads a list of strings. A bare string counts as a one-element list and
/// non-string list elements are skipped; any other shape yields `None`.
fn string_list(value: Value) -> Option<Vec<String>> {
    match value {
        Value::String(single) => Some(vec![single]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    other => {
                        tracing::warn!(%other, "skipping non-string list element");
                        None
                    }
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Strips a leading ```` ``` ```` / ```` ```json ```` fence and its closing fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// A normalized fragment: every node fully populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub nodes: Vec<SkillNode>,
    pub edges: Vec<PrereqEdge>,
    pub questions: QuestionMap,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.questions.is_empty()
    }
}
