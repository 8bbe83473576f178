//! Estimate CLI
//!
//! The `estimate` command runs construction-estimate pipelines against a
//! remote agent host and inspects their persisted state.
//!
//! ## Commands
//!
//! - `run`: run the stage sequence for a project brief
//! - `status`: show the stored state of a run
//! - `stages`: list the default stage sequence and its paired agents

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{info, Level};

use estimate_core::{
    AgentClient, AgentTransport, HttpTransport, Orchestrator, PipelineConfig, PipelineOutcome,
    RunSpan, StageSequence, StateTracker,
};
use estimate_state::{PipelineStore, RunId, SurrealPipelineStore};

#[derive(Parser)]
#[command(name = "estimate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Construction estimate pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the estimate pipeline for a project brief
    Run {
        /// Project brief (JSON file)
        #[arg(short, long)]
        brief: PathBuf,

        /// Base URL of the agent host (agents are reached at {url}/agents/{name})
        #[arg(long, env = "ESTIMATE_AGENTS_URL")]
        agents_url: String,

        /// Comma-separated stage names (default: the full estimate sequence)
        #[arg(long, value_delimiter = ',')]
        stages: Option<Vec<String>>,

        /// Retries per stage after the first attempt
        #[arg(long, env = "ESTIMATE_MAX_RETRIES")]
        max_retries: Option<u32>,

        /// Minimum score (0-100) for a stage to pass
        #[arg(long, env = "ESTIMATE_PASSING_SCORE")]
        passing_score: Option<u8>,

        /// Per-call timeout in seconds
        #[arg(long, env = "ESTIMATE_CALL_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,

        /// Score recorded when a scorer is unreachable
        #[arg(long, env = "ESTIMATE_SCORER_FALLBACK_SCORE")]
        scorer_fallback_score: Option<u8>,

        /// Explicit run id (default: random UUID)
        #[arg(long)]
        run_id: Option<String>,

        /// Keep run state in memory instead of the configured database
        #[arg(long)]
        in_memory: bool,
    },

    /// Show the stored state of a run
    Status {
        /// Run ID
        run_id: String,
    },

    /// List the default stage sequence
    Stages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    estimate_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            brief,
            agents_url,
            stages,
            max_retries,
            passing_score,
            timeout_secs,
            scorer_fallback_score,
            run_id,
            in_memory,
        } => {
            let config =
                pipeline_config(max_retries, passing_score, timeout_secs, scorer_fallback_score)?;
            let stages = stage_sequence(stages)?;
            let brief = load_brief(&brief)?;
            let store = open_store(in_memory).await?;
            let transport = Arc::new(HttpTransport::new(agents_url));
            let run_id = run_id.map(RunId).unwrap_or_default();

            let outcome =
                cmd_run(&store, transport, config, &stages, brief, run_id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Commands::Status { run_id } => {
            let store = open_store(false).await?;
            let report = cmd_status(&store, &RunId(run_id)).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Stages => {
            for stage in StageSequence::default_estimate().iter() {
                println!(
                    "{:<10} agent={} scorer={} critic={}",
                    stage.name, stage.agent, stage.scorer, stage.critic
                );
            }
            Ok(())
        }
    }
}

async fn open_store(in_memory: bool) -> Result<SurrealPipelineStore> {
    if in_memory {
        SurrealPipelineStore::in_memory()
            .await
            .context("Failed to open in-memory store")
    } else {
        SurrealPipelineStore::from_env()
            .await
            .context("Failed to connect to estimate database")
    }
}

/// Defaults overridden by whichever flags (or their env fallbacks) are set.
fn pipeline_config(
    max_retries: Option<u32>,
    passing_score: Option<u8>,
    timeout_secs: Option<u64>,
    scorer_fallback_score: Option<u8>,
) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();
    if let Some(n) = max_retries {
        config = config.with_max_retries(n);
    }
    if let Some(score) = passing_score {
        config = config.with_passing_threshold(score);
    }
    if let Some(secs) = timeout_secs {
        config = config.with_call_timeout(Duration::from_secs(secs));
    }
    if let Some(score) = scorer_fallback_score {
        config = config.with_scorer_fallback_score(score);
    }
    config.validate()?;
    Ok(config)
}

fn stage_sequence(stages: Option<Vec<String>>) -> Result<StageSequence> {
    match stages {
        None => Ok(StageSequence::default_estimate()),
        Some(names) => Ok(StageSequence::from_names(
            names.into_iter().map(|s| s.trim().to_string()),
        )?),
    }
}

fn load_brief(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read brief {}", path.display()))?;
    let brief: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Brief {} is not valid JSON", path.display()))?;
    anyhow::ensure!(
        brief.is_object(),
        "Brief {} must be a JSON object",
        path.display()
    );
    Ok(brief)
}

async fn cmd_run(
    store: &SurrealPipelineStore,
    transport: Arc<dyn AgentTransport>,
    config: PipelineConfig,
    stages: &StageSequence,
    brief: Value,
    run_id: RunId,
) -> Result<PipelineOutcome> {
    let tracker = StateTracker::new(Arc::new(store.clone()))
        .with_mirror(Arc::new(store.progress_mirror()));
    let client = AgentClient::new(transport, config.call_timeout);
    let orchestrator = Orchestrator::new(config, client, tracker)?;

    info!(run_id = %run_id, stages = stages.len(), "starting estimate");
    let outcome = orchestrator
        .run(run_id.clone(), stages, brief)
        .await
        .with_context(|| format!("Estimate run {run_id} failed"))?;
    Ok(outcome)
}

async fn cmd_status(store: &SurrealPipelineStore, run_id: &RunId) -> Result<Value> {
    let _span = RunSpan::enter(run_id.as_str());
    let run = store
        .load(run_id)
        .await
        .with_context(|| format!("Run {run_id} not found"))?;
    let outputs = store.stage_outputs(run_id).await?;
    let progress = store.progress_mirror().load(run_id).await?;

    let accepted: Vec<Value> = outputs
        .iter()
        .map(|o| {
            json!({
                "stage": o.stage,
                "score": o.score,
                "retry_count": o.retry_count,
                "digest": o.output_digest.short(),
                "duration_ms": o.duration_ms,
                "tokens_used": o.tokens_used,
            })
        })
        .collect();

    Ok(json!({
        "run": run,
        "outputs": accepted,
        "progress_view": progress,
    }))
}
