//! MergeEngine: the pass pipeline.
//!
//! Folding a fragment is cheap (normalize + accumulate) and happens once per
//! batch. The finishing pass (dedup, dangling-edge pruning, transitive
//! reduction, cycle breaking, levels, path validation, invariant check) runs
//! over the whole accumulated graph and can be repeated at any time.
//!
//! Both entry points are pure functions of their inputs: the engine holds
//! only configuration and the equivalence test.

use serde::Serialize;

use skillgraph_core::{PrereqEdge, RawFragment, SkillGraph, SkillId};

use crate::accumulate::{accumulate, AccumulateStats};
use crate::check::check_graph;
use crate::config::MergeConfig;
use crate::cycles::break_cycles;
use crate::dedup::{deduplicate, Equivalence, IdRemap, MergeDecision, NameOverlap};
use crate::error::MergeError;
use crate::levels::assign_levels;
use crate::normalize::{normalize_fragment, Malformed};
use crate::reduce::{reduce_transitive, stranded_reductions};
use crate::validate::{prune_dangling_edges, validate_paths, ValidationReport};

/// Result of folding one fragment into the running graph.
#[derive(Debug, Clone)]
pub struct FoldOutcome {
    pub graph: SkillGraph,
    /// Ids seen for the first time in this fragment.
    pub new_nodes: Vec<SkillId>,
    pub rejected: Vec<Malformed>,
    pub stats: AccumulateStats,
}

/// Everything one finishing pass changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub decisions: Vec<MergeDecision>,
    pub remap: IdRemap,
    /// Edges that dedup turned into self-loops or duplicates.
    pub collapsed_edges: Vec<PrereqEdge>,
    /// Edges naming a skill no fragment defined.
    pub dangling_edges: Vec<PrereqEdge>,
    pub reduced_edges: Vec<PrereqEdge>,
    pub broken_edges: Vec<PrereqEdge>,
    /// Reduced edges whose implying path was later cut by cycle breaking.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stranded_edges: Vec<PrereqEdge>,
    pub validation: ValidationReport,
    /// Fragment items rejected while folding. Only filled by
    /// [`MergeEngine::merge`] and [`MergeSession`](crate::MergeSession).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<Malformed>,
}

/// A finished, invariant-checked graph and its pass report.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub graph: SkillGraph,
    pub report: PassReport,
}

/// Runs the merge passes with a fixed configuration.
pub struct MergeEngine {
    config: MergeConfig,
    equivalence: Box<dyn Equivalence + Send + Sync>,
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(MergeConfig::default())
    }
}

impl MergeEngine {
    /// Creates an engine using [`NameOverlap`] built from `config`.
    pub fn new(config: MergeConfig) -> Self {
        let equivalence = Box::new(NameOverlap::from_config(&config));
        MergeEngine {
            config,
            equivalence,
        }
    }

    /// Creates an engine with a custom duplicate detector.
    pub fn with_equivalence(
        config: MergeConfig,
        equivalence: Box<dyn Equivalence + Send + Sync>,
    ) -> Self {
        MergeEngine {
            config,
            equivalence,
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Normalizes `raw` and folds it into `graph`.
    pub fn merge_fragment(&self, graph: SkillGraph, raw: RawFragment) -> FoldOutcome {
        let normalized = normalize_fragment(raw);
        let (graph, stats) = accumulate(graph, normalized.fragment);
        FoldOutcome {
            graph,
            new_nodes: stats.new_nodes.clone(),
            rejected: normalized.rejected,
            stats,
        }
    }

    /// Runs the finishing pass over an accumulated graph.
    ///
    /// The returned graph is a DAG without duplicate or redundant edges, with
    /// fresh levels and no dangling question references. If the final check
    /// finds a violation anyway, the graph is discarded and
    /// [`MergeError::InvariantViolated`] is returned.
    pub fn finish(&self, graph: SkillGraph) -> Result<MergeOutcome, MergeError> {
        let mut report = PassReport::default();

        let (graph, dedup) = deduplicate(graph, self.equivalence.as_ref());
        report.decisions = dedup.decisions;
        report.remap = dedup.remap;
        report.collapsed_edges = dedup.collapsed_edges;

        let (graph, dangling) = prune_dangling_edges(graph);
        report.dangling_edges = dangling;

        let (graph, reduced) = reduce_transitive(graph);
        report.reduced_edges = reduced;

        let cap = self.config.cycle_iteration_cap(graph.edge_count());
        let (mut graph, broken) = break_cycles(graph, cap)?;
        if !broken.is_empty() {
            report.stranded_edges = stranded_reductions(&graph, &report.reduced_edges);
            for edge in &report.stranded_edges {
                tracing::warn!(%edge, "reduced edge lost its implying path to cycle breaking");
            }
        }
        report.broken_edges = broken;

        assign_levels(&mut graph);

        let (graph, validation) = validate_paths(graph);
        report.validation = validation;

        if let Err(violations) = check_graph(&graph) {
            for violation in &violations {
                tracing::error!(%violation, "merged graph failed invariant check");
            }
            return Err(MergeError::InvariantViolated(violations));
        }

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            questions = graph.questions().len(),
            merged = report.decisions.len(),
            reduced = report.reduced_edges.len(),
            broken = report.broken_edges.len(),
            "finishing pass complete"
        );
        Ok(MergeOutcome { graph, report })
    }

    /// Folds every fragment in order into an empty graph and finishes it.
    pub fn merge<I>(&self, fragments: I) -> Result<MergeOutcome, MergeError>
    where
        I: IntoIterator<Item = RawFragment>,
    {
        let mut graph = SkillGraph::new();
        let mut rejected = Vec::new();
        for raw in fragments {
            let fold = self.merge_fragment(graph, raw);
            graph = fold.graph;
            rejected.extend(fold.rejected);
        }
        let mut outcome = self.finish(graph)?;
        outcome.report.rejected = rejected;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::{RawEdge, RawNode, SkillNode};

    fn fragment(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> RawFragment {
        RawFragment {
            nodes: nodes.iter().map(|(id, name)| RawNode::named(id, name)).collect(),
            edges: edges.iter().map(|(f, t)| RawEdge::between(f, t)).collect(),
            ..RawFragment::default()
        }
    }

    #[test]
    fn fold_reports_new_nodes_and_rejections() {
        let engine = MergeEngine::default();
        let mut raw = fragment(&[("a", "Alpha"), ("b", "Beta")], &[]);
        raw.nodes.push(RawNode::default());

        let fold = engine.merge_fragment(SkillGraph::new(), raw);
        assert_eq!(fold.new_nodes, vec![SkillId::from("a"), SkillId::from("b")]);
        assert_eq!(fold.rejected.len(), 1);

        let again = engine.merge_fragment(fold.graph, fragment(&[("b", "Beta"), ("c", "Gamma")], &[]));
        assert_eq!(again.new_nodes, vec![SkillId::from("c")]);
        assert_eq!(again.stats.merged_nodes, 1);
    }

    #[test]
    fn finish_runs_every_pass() {
        let engine = MergeEngine::default();
        let outcome = engine
            .merge([
                fragment(
                    &[("a", "Variables"), ("b", "Loops"), ("c", "Recursion")],
                    &[("a", "b"), ("b", "c"), ("a", "c"), ("c", "ghost")],
                ),
                fragment(&[("d", "Closures")], &[("d", "a"), ("c", "d")]),
            ])
            .unwrap();

        let report = &outcome.report;
        assert_eq!(report.dangling_edges, vec![PrereqEdge::new("c", "ghost")]);
        assert_eq!(report.reduced_edges, vec![PrereqEdge::new("a", "c")]);
        assert_eq!(report.broken_edges, vec![PrereqEdge::new("c", "d")]);

        let levels: Vec<(&str, u32)> = outcome
            .graph
            .nodes()
            .values()
            .map(|n| (n.id.as_str(), n.level))
            .collect();
        assert_eq!(levels, vec![("a", 1), ("b", 2), ("c", 3), ("d", 0)]);
    }

    #[test]
    fn reductions_inside_a_cycle_are_reported_when_stranded() {
        let outcome = MergeEngine::default()
            .merge([fragment(
                &[("a", "Variables"), ("b", "Loops"), ("c", "Recursion"), ("d", "Closures")],
                &[("a", "b"), ("a", "c"), ("c", "b"), ("c", "d"), ("d", "a")],
            )])
            .unwrap();

        let report = &outcome.report;
        assert_eq!(
            report.reduced_edges,
            vec![PrereqEdge::new("a", "b"), PrereqEdge::new("c", "b")]
        );
        assert_eq!(report.broken_edges, vec![PrereqEdge::new("d", "a")]);
        assert_eq!(report.stranded_edges, report.reduced_edges);
        assert_eq!(outcome.graph.node("b").unwrap().level, 0);
    }

    #[test]
    fn custom_equivalence_drives_dedup() {
        let by_prefix = |a: &SkillNode, b: &SkillNode| a.id.as_str().starts_with(b.id.as_str());
        let engine = MergeEngine::with_equivalence(MergeConfig::default(), Box::new(by_prefix));
        let outcome = engine
            .merge([fragment(&[("loop", "Loop"), ("loops", "Iteration")], &[])])
            .unwrap();
        // The canonical node is the first argument.
        assert_eq!(outcome.graph.node_count(), 2);

        let reversed = |a: &SkillNode, b: &SkillNode| b.id.as_str().starts_with(a.id.as_str());
        let engine = MergeEngine::with_equivalence(MergeConfig::default(), Box::new(reversed));
        let outcome = engine
            .merge([fragment(&[("loop", "Loop"), ("loops", "Iteration")], &[])])
            .unwrap();
        assert_eq!(outcome.graph.node_count(), 1);
        assert_eq!(outcome.report.remap.get("loops"), Some(&SkillId::from("loop")));
    }

    #[test]
    fn zero_cycle_cap_fails_loudly_on_cycles() {
        let engine = MergeEngine::new(MergeConfig {
            max_cycle_iterations: Some(0),
            ..MergeConfig::default()
        });
        let acyclic = engine.merge([fragment(&[("a", "Alpha"), ("b", "Beta")], &[("a", "b")])]);
        assert!(acyclic.is_ok());

        let cyclic = engine.merge([fragment(
            &[("a", "Alpha"), ("b", "Beta"), ("c", "Gamma")],
            &[("a", "b"), ("b", "c"), ("c", "a")],
        )]);
        assert!(matches!(
            cyclic,
            Err(MergeError::CycleBreakExhausted { iterations: 0, stuck: 3 })
        ));
    }
}
