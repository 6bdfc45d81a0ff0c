//! Fragment normalization.
//!
//! Turns an untrusted [`RawFragment`] into a [`Fragment`] whose nodes are
//! fully populated. Id and name are mandatory on nodes and both endpoints are
//! mandatory on edges; everything else is defaulted. Items missing a
//! mandatory field are rejected, logged and returned to the caller as
//! [`Malformed`] records so contract violations by the generator stay
//! visible.

use serde::Serialize;

use skillgraph_core::{
    Fragment, PrereqEdge, QuestionMap, RawEdge, RawFragment, RawNode, RelationKind, SkillId,
    SkillNode, Tier,
};

/// A fragment item rejected during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum Malformed {
    #[error("node #{position} could not be read: {error}")]
    NodeInvalid { position: usize, error: String },

    #[error("edge #{position} could not be read: {error}")]
    EdgeInvalid { position: usize, error: String },

    #[error("node #{position} has no id (name: {name:?})")]
    NodeMissingId {
        position: usize,
        name: Option<String>,
    },

    #[error("node #{position} ({id}) has no name")]
    NodeMissingName { position: usize, id: String },

    #[error("edge #{position} is missing an endpoint (from: {from:?}, to: {to:?})")]
    EdgeMissingEndpoint {
        position: usize,
        from: Option<String>,
        to: Option<String>,
    },
}

/// Result of normalizing one fragment.
#[derive(Debug, Clone, Default)]
pub struct NormalizedFragment {
    pub fragment: Fragment,
    pub rejected: Vec<Malformed>,
}

/// Returns the trimmed value if it is present and not blank.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalizes a single node. `position` is the node's index in its fragment
/// and only used for diagnostics.
pub fn normalize_node(position: usize, raw: RawNode) -> Result<SkillNode, Malformed> {
    if let Some(error) = raw.unreadable {
        return Err(Malformed::NodeInvalid { position, error });
    }
    let Some(id) = non_blank(raw.id.as_deref()) else {
        return Err(Malformed::NodeMissingId {
            position,
            name: raw.name,
        });
    };
    let Some(name) = non_blank(raw.name.as_deref()) else {
        return Err(Malformed::NodeMissingName { position, id });
    };

    let tier = match raw.tier.as_deref() {
        None => Tier::default(),
        Some(label) => label.parse().unwrap_or_else(|err| {
            tracing::warn!(skill = %id, %err, "defaulting unrecognized tier to core");
            Tier::default()
        }),
    };

    let mut node = SkillNode::new(SkillId::new(id), name).with_tier(tier);
    node.description = raw.description.map(|d| d.trim().to_string()).unwrap_or_default();
    let contexts: Vec<String> = raw
        .contexts
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    node.absorb_contexts(&contexts);
    if let Some(mastery) = raw.mastery {
        node.mastery = mastery;
    }
    if let Some(effort) = raw.effort {
        node.effort = effort;
    }
    Ok(node)
}

/// Normalizes a single edge.
pub fn normalize_edge(position: usize, raw: RawEdge) -> Result<PrereqEdge, Malformed> {
    if let Some(error) = raw.unreadable {
        return Err(Malformed::EdgeInvalid { position, error });
    }
    let (Some(from), Some(to)) = (non_blank(raw.from.as_deref()), non_blank(raw.to.as_deref()))
    else {
        return Err(Malformed::EdgeMissingEndpoint {
            position,
            from: raw.from,
            to: raw.to,
        });
    };

    let kind = match raw.kind.as_deref() {
        None => RelationKind::default(),
        Some(label) => label.parse().unwrap_or_else(|err| {
            tracing::warn!(%from, %to, %err, "defaulting unrecognized relation kind");
            RelationKind::default()
        }),
    };

    Ok(PrereqEdge {
        from: SkillId::new(from),
        to: SkillId::new(to),
        reason: non_blank(raw.reason.as_deref()),
        kind,
    })
}

/// Normalizes a whole fragment, collecting every rejection.
pub fn normalize_fragment(raw: RawFragment) -> NormalizedFragment {
    let mut out = NormalizedFragment::default();

    for (position, raw_node) in raw.nodes.into_iter().enumerate() {
        match normalize_node(position, raw_node) {
            Ok(node) => out.fragment.nodes.push(node),
            Err(malformed) => {
                tracing::warn!(%malformed, "rejected fragment node");
                out.rejected.push(malformed);
            }
        }
    }

    for (position, raw_edge) in raw.edges.into_iter().enumerate() {
        match normalize_edge(position, raw_edge) {
            Ok(edge) => out.fragment.edges.push(edge),
            Err(malformed) => {
                tracing::warn!(%malformed, "rejected fragment edge");
                out.rejected.push(malformed);
            }
        }
    }

    let mut questions = QuestionMap::new();
    for (question, skills) in raw.questions {
        let question = question.trim();
        if question.is_empty() {
            continue;
        }
        let entry: &mut Vec<SkillId> = questions.entry(question.to_string()).or_default();
        for skill in skills {
            let skill = skill.trim();
            if !skill.is_empty() && !entry.iter().any(|s| s.as_str() == skill) {
                entry.push(SkillId::from(skill));
            }
        }
    }
    out.fragment.questions = questions;

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::{EffortEstimate, MasteryEvidence};

    #[test]
    fn fills_defaults() {
        let node = normalize_node(0, RawNode::named("loops", "Loops")).unwrap();
        assert_eq!(node.tier, Tier::Core);
        assert_eq!(node.description, "");
        assert!(node.contexts.is_empty());
        assert_eq!(node.mastery, MasteryEvidence::default());
        assert_eq!(node.effort, EffortEstimate::default());
        assert!(node.effort.is_estimate);
        assert_eq!(node.level, 0);
    }

    #[test]
    fn keeps_supplied_fields() {
        let raw = RawNode {
            tier: Some("advanced".into()),
            description: Some("  Calling a function from itself ".into()),
            contexts: Some(vec!["factorial".into(), " ".into(), "factorial".into()]),
            ..RawNode::named("recursion", "Recursion")
        };
        let node = normalize_node(0, raw).unwrap();
        assert_eq!(node.tier, Tier::Advanced);
        assert_eq!(node.description, "Calling a function from itself");
        assert_eq!(node.contexts, vec!["factorial"]);
    }

    #[test]
    fn unknown_tier_falls_back_to_core() {
        let raw = RawNode {
            tier: Some("legendary".into()),
            ..RawNode::named("x", "X")
        };
        assert_eq!(normalize_node(0, raw).unwrap().tier, Tier::Core);
    }

    #[test]
    fn rejects_missing_id_and_name() {
        let no_id = RawNode {
            name: Some("Loops".into()),
            ..RawNode::default()
        };
        assert_eq!(
            normalize_node(3, no_id).unwrap_err(),
            Malformed::NodeMissingId {
                position: 3,
                name: Some("Loops".into())
            }
        );

        let blank_name = RawNode {
            id: Some("loops".into()),
            name: Some("   ".into()),
            ..RawNode::default()
        };
        assert_eq!(
            normalize_node(1, blank_name).unwrap_err(),
            Malformed::NodeMissingName {
                position: 1,
                id: "loops".into()
            }
        );
    }

    #[test]
    fn fragment_collects_rejections() {
        let raw = RawFragment {
            nodes: vec![
                RawNode::named("a", "A"),
                RawNode::default(),
                RawNode::named("b", "B"),
            ],
            edges: vec![
                RawEdge::between("a", "b"),
                RawEdge {
                    from: Some("a".into()),
                    ..RawEdge::default()
                },
            ],
            questions: [(
                " Reverse a string ".to_string(),
                vec!["a".to_string(), "a".to_string(), "".to_string()],
            )]
            .into_iter()
            .collect(),
        };

        let normalized = normalize_fragment(raw);
        assert_eq!(normalized.fragment.nodes.len(), 2);
        assert_eq!(normalized.fragment.edges.len(), 1);
        assert_eq!(normalized.rejected.len(), 2);
        assert!(matches!(
            normalized.rejected[1],
            Malformed::EdgeMissingEndpoint { position: 1, .. }
        ));
        assert_eq!(
            normalized.fragment.questions["Reverse a string"],
            vec![SkillId::from("a")]
        );
    }

    #[test]
    fn unreadable_items_are_rejected_with_their_error() {
        assert_eq!(
            normalize_node(3, RawNode::unreadable("invalid type: integer `7`")).unwrap_err(),
            Malformed::NodeInvalid {
                position: 3,
                error: "invalid type: integer `7`".into()
            }
        );
        assert!(matches!(
            normalize_edge(0, RawEdge::unreadable("expected a string")),
            Err(Malformed::EdgeInvalid { position: 0, .. })
        ));
    }

    #[test]
    fn edge_kind_and_reason() {
        let raw = RawEdge {
            reason: Some("  ".into()),
            kind: Some("builds on".into()),
            ..RawEdge::between("a", "b")
        };
        let edge = normalize_edge(0, raw).unwrap();
        assert_eq!(edge.kind, RelationKind::BuildsOn);
        assert_eq!(edge.reason, None);
    }
}
