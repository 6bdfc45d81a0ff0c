//! Skill graph merge CLI.
//!
//! Provides the `skillgraph` binary. `merge` folds recorded fragment files
//! into one consistent graph, `replay` drives the same files through the
//! paced batch runner, `check` verifies a graph file against the graph
//! invariants, and `list` / `export` read graphs back out of a SQLite store.
//!
//! Exit codes: 0 = success, 1 = merge or invariant failure, 3 = I/O or
//! storage failure, 130 = replay cancelled (checkpoint written).

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use skillgraph_core::{RawFragment, SkillGraph};
use skillgraph_merge::{
    check_graph, MergeConfig, MergeEngine, MergeError, MergeOutcome, MergeSession,
};
use skillgraph_runner::{
    BatchRunner, Checkpoint, FileFragmentSource, RunOutcome, RunnerConfig, RunnerError,
};
use skillgraph_storage::{GraphId, GraphStore, SqliteStore, StorageError};

/// Knowledge graph consistency tools.
#[derive(Parser)]
#[command(
    name = "skillgraph",
    about = "Merge skill graph fragments into one consistent graph"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge fragment JSON files, in the order given.
    Merge {
        /// Fragment files, one per batch.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Replay recorded fragments through the paced batch runner.
    ///
    /// Pacing and retries come from SKILLGRAPH_BATCH_SIZE,
    /// SKILLGRAPH_BATCH_DELAY_MS, SKILLGRAPH_MAX_RETRIES and
    /// SKILLGRAPH_RETRY_BACKOFF_MS.
    Replay {
        /// Question list, one question per line.
        #[arg(short, long)]
        questions: PathBuf,

        /// Fragment files, one per batch.
        #[arg(required = true)]
        fragments: Vec<PathBuf>,

        /// Checkpoint file: written on Ctrl-C, resumed from if present.
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Check a graph JSON file against the graph invariants.
    Check { file: PathBuf },

    /// List graphs stored in a database.
    List {
        #[arg(short, long)]
        db: String,
    },

    /// Print a stored graph as JSON.
    Export {
        #[arg(short, long)]
        db: String,

        #[arg(short, long)]
        graph: i64,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Merge heuristics overrides.
#[derive(Args)]
struct EngineArgs {
    /// Token overlap ratio above which differently named skills merge.
    #[arg(long, value_parser = parse_ratio)]
    overlap_threshold: Option<f64>,

    /// Allow token-overlap matches across tiers.
    #[arg(long)]
    ignore_tier: bool,

    /// Cap on cycle-breaking iterations (default: edge count + 1).
    #[arg(long)]
    max_cycle_iterations: Option<usize>,
}

impl EngineArgs {
    fn engine(&self) -> MergeEngine {
        let mut config = MergeConfig::default();
        if let Some(threshold) = self.overlap_threshold {
            config.overlap_threshold = threshold;
        }
        if self.ignore_tier {
            config.require_same_tier = false;
        }
        config.max_cycle_iterations = self.max_cycle_iterations;
        MergeEngine::new(config)
    }
}

/// Where a merged graph goes.
#[derive(Args)]
struct OutputArgs {
    /// Write the merged graph JSON to this file.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Save the merged graph into this SQLite database.
    #[arg(long, requires = "name")]
    db: Option<String>,

    /// Graph name used with --db.
    #[arg(long, requires = "db")]
    name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("graph violates {0} invariant(s)")]
    Invariants(usize),

    #[error("replay cancelled after batch {batch_index} of {total_batches}")]
    Cancelled {
        batch_index: usize,
        total_batches: usize,
    },
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Merge(_) | CliError::Invariants(_) => 1,
            CliError::Runner(RunnerError::Merge(_)) => 1,
            CliError::Cancelled { .. } => 130,
            _ => 3,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge {
            files,
            engine,
            output,
        } => run_merge(&files, &engine, &output),
        Commands::Replay {
            questions,
            fragments,
            checkpoint,
            engine,
            output,
        } => run_replay(&questions, fragments, checkpoint.as_deref(), &engine, &output),
        Commands::Check { file } => run_check(&file),
        Commands::List { db } => run_list(&db),
        Commands::Export { db, graph, out } => run_export(&db, GraphId(graph), out.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(err.exit_code());
    }
}

/// Execute the merge subcommand.
fn run_merge(
    files: &[PathBuf],
    engine: &EngineArgs,
    output: &OutputArgs,
) -> Result<(), CliError> {
    let mut session = MergeSession::new(engine.engine(), files.len());
    for path in files {
        let text = read_file(path)?;
        let raw = RawFragment::from_json(&text).map_err(|source| CliError::Parse {
            path: path.clone(),
            source,
        })?;
        session.ingest(raw);
    }

    let outcome = session.finish()?;
    emit(&outcome, output)
}

/// Execute the replay subcommand.
fn run_replay(
    questions_path: &Path,
    fragments: Vec<PathBuf>,
    checkpoint_path: Option<&Path>,
    engine: &EngineArgs,
    output: &OutputArgs,
) -> Result<(), CliError> {
    let questions: Vec<String> = read_file(questions_path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    let checkpoint = match checkpoint_path {
        Some(path) if path.exists() => Some(read_json::<Checkpoint>(path)?),
        _ => None,
    };

    let runner = BatchRunner::new(RunnerConfig::from_env()?);
    let source = FileFragmentSource::new(fragments);
    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;

    let outcome = runtime.block_on(async {
        let token = runner.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });

        match checkpoint {
            Some(checkpoint) => {
                tracing::info!(batch_index = checkpoint.batch_index, "resuming from checkpoint");
                runner
                    .resume(engine.engine(), checkpoint, &questions, &source)
                    .await
            }
            None => runner.run(engine.engine(), &questions, &source).await,
        }
    })?;

    match outcome {
        RunOutcome::Completed(outcome) => {
            if let Some(path) = checkpoint_path.filter(|path| path.exists()) {
                std::fs::remove_file(path).map_err(|source| CliError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            emit(&outcome, output)
        }
        RunOutcome::Cancelled(checkpoint) => {
            if let Some(path) = checkpoint_path {
                write_json(&checkpoint, Some(path))?;
                eprintln!("Checkpoint written to {}", path.display());
            }
            Err(CliError::Cancelled {
                batch_index: checkpoint.batch_index,
                total_batches: checkpoint.total_batches,
            })
        }
    }
}

/// Execute the check subcommand.
fn run_check(path: &Path) -> Result<(), CliError> {
    let graph: SkillGraph = read_json(path)?;
    match check_graph(&graph) {
        Ok(()) => {
            println!(
                "{}: ok ({} skills, {} edges, {} questions)",
                path.display(),
                graph.node_count(),
                graph.edge_count(),
                graph.questions().len()
            );
            Ok(())
        }
        Err(violations) => {
            eprintln!("{} invariant violation(s):", violations.len());
            for violation in &violations {
                eprintln!("  - {}", violation);
            }
            Err(CliError::Invariants(violations.len()))
        }
    }
}

/// Execute the list subcommand.
fn run_list(db_path: &str) -> Result<(), CliError> {
    let store = SqliteStore::new(db_path)?;
    for summary in store.list_graphs()? {
        println!(
            "{:>4}  {:<24} {:>5} skills {:>5} edges {:>5} questions  {}",
            summary.id.0,
            summary.name,
            summary.skill_count,
            summary.edge_count,
            summary.question_count,
            summary.fingerprint.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

/// Execute the export subcommand.
fn run_export(db_path: &str, id: GraphId, out: Option<&Path>) -> Result<(), CliError> {
    let store = SqliteStore::new(db_path)?;
    let graph = store.load_graph(id)?;
    write_json(&graph, out)
}

/// Hands a finished graph to its destinations. Prints it to stdout when no
/// destination was given.
fn emit(outcome: &MergeOutcome, output: &OutputArgs) -> Result<(), CliError> {
    let report = &outcome.report;
    eprintln!(
        "Merged {} skills, {} edges ({} merged, {} reduced, {} broken, {} dangling, {} rejected)",
        outcome.graph.node_count(),
        outcome.graph.edge_count(),
        report.decisions.len(),
        report.reduced_edges.len(),
        report.broken_edges.len(),
        report.dangling_edges.len(),
        report.rejected.len(),
    );

    if let (Some(db_path), Some(name)) = (&output.db, &output.name) {
        let mut store = SqliteStore::new(db_path)?;
        let id = store.insert_graph(name, &outcome.graph)?;
        eprintln!("Saved as {} in {}", id, db_path);
    }
    if output.out.is_some() || output.db.is_none() {
        write_json(&outcome.graph, output.out.as_deref())?;
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => std::fs::write(path, json + "\n").map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

/// Parse an overlap ratio in `0.0..=1.0`.
fn parse_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("invalid ratio '{}', expected a number", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("ratio {} is outside 0.0..=1.0", value))
    }
}
