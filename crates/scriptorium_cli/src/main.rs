//! SCRIPTORIUM CLI
//!
//! Runs authoring playbooks: ordered template stages over a subject,
//! with artifact mirroring, a durable execution log, and global
//! invocation pacing.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod playbook;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use playbook::Playbook;
use scriptorium_core::{Context, RunId};
use scriptorium_log::{ExecutionLog, Outcome};
use scriptorium_runtime::{EngineConfig, PacerConfig, PipelineEngine};
use scriptorium_store::ArtifactStore;
use std::path::Path;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "scriptorium")]
#[command(about = "SCRIPTORIUM - sequential authoring-pipeline orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a playbook
    Run {
        /// Path to the playbook file
        #[arg(short, long)]
        playbook: String,
        /// Subject exposed to every stage as the context key "subject"
        #[arg(short, long)]
        subject: String,
        /// Directory artifacts are mirrored into
        #[arg(short, long, default_value = "artifacts")]
        output: String,
        /// Execution log sink
        #[arg(short, long, default_value = "execution.log")]
        log: String,
        /// Maximum worker invocations per minute (0 = unbounded)
        #[arg(long, default_value_t = 30)]
        rpm: u32,
        /// Additional context values
        #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        context: Vec<(String, String)>,
    },
    /// Validate a playbook without running it
    Validate {
        /// Path to the playbook file
        #[arg(short, long)]
        playbook: String,
    },
}

fn parse_key_value(s: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got {s:?}"))?;
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            playbook,
            subject,
            output,
            log,
            rpm,
            context,
        } => run(&playbook, &subject, &output, &log, rpm, context).await,
        Commands::Validate { playbook } => validate(&playbook),
    }
}

async fn run(
    playbook_path: &str,
    subject: &str,
    output_dir: &str,
    log_path: &str,
    rpm: u32,
    extra_context: Vec<(String, String)>,
) -> Result<()> {
    let playbook = Playbook::load(playbook_path)?;
    tracing::info!(stages = playbook.stages.len(), "playbook loaded");

    let final_artifact = playbook.final_artifact.clone();
    let plan = playbook.into_plan()?;

    let mut builder = Context::builder().value("subject", subject);
    for (key, value) in extra_context {
        builder = builder.value(key, value);
    }
    let context = builder.build();

    let run_id = RunId::new();
    let store = ArtifactStore::with_mirror(output_dir)?;
    let log = ExecutionLog::with_sink(run_id, log_path)?;
    let pacer = if rpm == 0 {
        PacerConfig::unbounded()
    } else {
        PacerConfig::per_window(rpm, Duration::from_secs(60))
    };
    let engine = PipelineEngine::new(plan, store, log, EngineConfig { final_artifact, pacer });

    // Ctrl-C requests cooperative cancellation at the next stage boundary
    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    match engine.run(&context).await {
        Ok(report) => {
            println!("Run {} completed", report.run_id);
            for entry in &report.entries {
                println!("  [{}] {}", outcome_label(&entry.outcome), entry.stage_id);
            }
            println!(
                "Final artifact {:?} ({} bytes) mirrored to {}",
                report.final_artifact.name,
                report.final_artifact.meta.size_bytes,
                Path::new(output_dir)
                    .join(&report.final_artifact.name)
                    .display(),
            );
            Ok(())
        }
        Err(failure) => {
            match &failure.stage_id {
                Some(stage) => eprintln!("Run aborted at stage {}", stage),
                None => eprintln!("Run aborted before any stage could run"),
            }
            for entry in &failure.entries {
                eprintln!("  [{}] {}", outcome_label(&entry.outcome), entry.stage_id);
            }
            Err(failure.into())
        }
    }
}

fn validate(playbook_path: &str) -> Result<()> {
    let playbook = Playbook::load(playbook_path)?;
    let context_inputs: Vec<String> = playbook
        .context_inputs()
        .into_iter()
        .map(str::to_string)
        .collect();
    let plan = playbook.into_plan()?;

    println!("Playbook is structurally valid: {} stages", plan.len());
    for stage in plan.stages() {
        let required = if stage.required() { "required" } else { "optional" };
        println!("  {} -> {:?} ({})", stage.id(), stage.output(), required);
    }
    if context_inputs.is_empty() {
        println!("No context keys needed");
    } else {
        println!("Context keys needed at run time: {}", context_inputs.join(", "));
    }
    Ok(())
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Succeeded { .. } => "ok",
        Outcome::Failed { .. } => "failed",
        Outcome::Skipped { .. } => "skipped",
    }
}
