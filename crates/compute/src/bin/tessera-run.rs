//! tessera-run: execute a node tree from a TOML file and report its outputs.
//!
//! Loads the engine config (file, then `TESSERA_*` environment overrides),
//! builds the execution system and runs it once. With `--summary` the graph
//! summary and execution report are printed as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use tessera_compute::{create_scheduler, ExecutionReport, ExecutionSystem, GraphSummary};
use tessera_core::config::load_dotenv;
use tessera_core::{ExecutionConfig, SchedulerKind};
use tessera_graph::NodeTree;

// ── CLI ─────────────────────────────────────────────────────────────

/// Tiled compositor: run a node tree and report its outputs.
#[derive(Parser, Debug)]
#[command(name = "tessera-run", version, about)]
struct Cli {
    /// Path to the node tree (TOML).
    #[arg(long, env = "TESSERA_TREE")]
    tree: String,

    /// Path to the engine config (TOML). Defaults plus environment when omitted.
    #[arg(long, env = "TESSERA_CONFIG")]
    config: Option<String>,

    /// Final render instead of interactive editing (previews are skipped).
    #[arg(long)]
    rendering: bool,

    /// Only run HIGH priority outputs.
    #[arg(long)]
    fast: bool,

    /// Worker thread count (0 = available parallelism).
    #[arg(long)]
    workers: Option<usize>,

    /// Scheduler: threads, inline or gpu.
    #[arg(long)]
    scheduler: Option<SchedulerKind>,

    /// Print the graph summary and report as JSON.
    #[arg(long)]
    summary: bool,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    summary: GraphSummary,
    report: &'a ExecutionReport,
}

fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ExecutionConfig::from_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => ExecutionConfig::from_env().context("invalid environment config")?,
    };
    if let Some(workers) = cli.workers {
        config.worker_threads = workers;
    }
    if let Some(kind) = cli.scheduler {
        config.scheduler = kind;
    }
    config.validate()?;
    config.log_summary();

    let tree = NodeTree::from_file(&cli.tree)
        .with_context(|| format!("failed to load node tree from {}", cli.tree))?;
    info!(
        "Loaded node tree: {} nodes, {} links",
        tree.nodes.len(),
        tree.links.len()
    );

    let mut system = ExecutionSystem::new(&tree, &config, cli.rendering, cli.fast)
        .context("failed to build execution system")?;
    let summary = system.summary();

    let mut scheduler = create_scheduler(&config);
    let report = system
        .execute(scheduler.as_mut())
        .context("execution failed")?;

    for output in &report.outputs {
        let mean = output.buffer.mean();
        info!(
            "{} [{:?}, {}]: {}  mean=({:.3}, {:.3}, {:.3}, {:.3})",
            output.name,
            output.role,
            output.priority,
            output.resolution,
            mean[0],
            mean[1],
            mean[2],
            mean[3]
        );
    }

    if cli.summary {
        let json = serde_json::to_string_pretty(&RunOutput {
            summary,
            report: &report,
        })?;
        println!("{json}");
    }

    Ok(())
}
