//! The fragment collaborator seam.
//!
//! A [`FragmentSource`] turns one batch of questions into a [`RawFragment`].
//! The runner treats it as opaque: whatever generates fragments (a model
//! endpoint, a recorded run, a test script) lives behind this trait.
//! Timeouts are the source's own concern.

use std::future::Future;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use skillgraph_core::{RawFragment, SkillGraph};

use crate::error::SourceError;

/// A skill the generator should reuse instead of inventing a near-duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownSkill {
    pub id: String,
    pub name: String,
}

/// Everything a source needs to produce one fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Zero-based batch position within the run.
    pub index: usize,
    pub questions: Vec<String>,
    /// Skills accumulated by earlier batches.
    pub known_skills: Vec<KnownSkill>,
}

impl BatchRequest {
    pub fn new(index: usize, questions: Vec<String>, graph: &SkillGraph) -> Self {
        let known_skills = graph
            .nodes()
            .values()
            .map(|node| KnownSkill {
                id: node.id.to_string(),
                name: node.name.clone(),
            })
            .collect();
        BatchRequest {
            index,
            questions,
            known_skills,
        }
    }
}

/// Produces graph fragments for batches of questions.
pub trait FragmentSource {
    fn fetch(
        &self,
        request: BatchRequest,
    ) -> impl Future<Output = Result<RawFragment, SourceError>> + Send;
}

/// Replays fragments recorded as JSON files, one file per batch in order.
#[derive(Debug, Clone, Default)]
pub struct FileFragmentSource {
    paths: Vec<PathBuf>,
}

impl FileFragmentSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        FileFragmentSource {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FragmentSource for FileFragmentSource {
    fn fetch(
        &self,
        request: BatchRequest,
    ) -> impl Future<Output = Result<RawFragment, SourceError>> + Send {
        let path = self.paths.get(request.index).cloned();
        async move {
            let path = path.ok_or(SourceError::Exhausted {
                index: request.index,
            })?;
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| SourceError::Io {
                    path: path.clone(),
                    source,
                })?;
            Ok(RawFragment::from_json(&text)?)
        }
    }
}
