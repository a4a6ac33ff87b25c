//! Verification Gate (jvmatch-vg) - Batch entry point
//!
//! Runs enrichment results through the gate, and records or reports retry
//! outcomes in the learning log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jvmatch_vg::learning::{JsonlLearningLog, LearningEntry, LearningLog, LearningSink, RetryOutcome};
use jvmatch_vg::pipeline::{BatchRunner, InMemoryProfileStore, JsonlProfileStore, ProfileStore};
use jvmatch_vg::retry::{EnrichmentMethod, FailureType};
use jvmatch_vg::{EnrichmentInput, FieldName, GateConfig, VerificationGate};

/// Command-line arguments for jvmatch-vg
#[derive(Parser, Debug)]
#[command(name = "jvmatch-vg")]
#[command(about = "Verification gate for AI-enriched jvmatch profiles")]
#[command(version)]
struct Args {
    /// TOML configuration file (overrides JVMATCH_CONFIG and the user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a batch of enrichment results; one JSON verdict line per profile on stdout
    Verify {
        /// JSON array of enrichment inputs
        #[arg(short, long)]
        input: PathBuf,

        /// Append accepted profiles to this JSON-lines file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Learning log used to annotate retry plans with past success rates
        #[arg(long, env = "JVMATCH_LEARNING_DB")]
        learning_db: Option<PathBuf>,

        /// Concurrent workers (overrides batch.worker_count)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Append one retry outcome to the learning log
    Record {
        #[arg(long, env = "JVMATCH_LEARNING_DB")]
        learning_db: Option<PathBuf>,
        #[arg(long)]
        field: FieldName,
        #[arg(long)]
        failure_type: FailureType,
        #[arg(long)]
        method: EnrichmentMethod,
        #[arg(long)]
        outcome: RetryOutcome,
    },

    /// Print method success rates for one (field, failure type)
    Report {
        #[arg(long, env = "JVMATCH_LEARNING_DB")]
        learning_db: Option<PathBuf>,
        #[arg(long)]
        field: FieldName,
        #[arg(long)]
        failure_type: FailureType,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (stdout carries verdicts, so logs go to stderr)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jvmatch_vg=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = GateConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Verify {
            input,
            output,
            learning_db,
            workers,
        } => {
            let mut config = config;
            if let Some(workers) = workers {
                config.batch.worker_count = workers;
            }
            let learning_db = learning_db.or_else(|| config.learning.db_path.clone());
            verify(&config, &input, output, learning_db).await
        }
        Command::Record {
            learning_db,
            field,
            failure_type,
            method,
            outcome,
        } => {
            let sink = open_learning_log(learning_db.as_deref(), &config).await?;
            let entry = LearningEntry::new(field, failure_type, method, outcome);
            sink.append(&entry).await.context("Failed to record outcome")?;
            info!(id = %entry.id, "Retry outcome recorded");
            Ok(())
        }
        Command::Report {
            learning_db,
            field,
            failure_type,
        } => {
            let sink = open_learning_log(learning_db.as_deref(), &config).await?;
            let report = sink
                .method_report(&field, failure_type)
                .await
                .context("Failed to read learning log")?;
            if report.is_empty() {
                println!("no recorded attempts for {} / {}", field, failure_type);
            }
            for stats in report {
                println!(
                    "{:<22} attempts={:<6} success_rate={:.3}",
                    stats.method.as_str(),
                    stats.attempts,
                    stats.success_rate
                );
            }
            Ok(())
        }
    }
}

async fn verify(config: &GateConfig, input: &Path, output: Option<PathBuf>, learning_db: Option<PathBuf>) -> Result<()> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let inputs: Vec<EnrichmentInput> =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", input.display()))?;

    let gate = Arc::new(VerificationGate::from_config(config).context("Failed to build verification gate")?);
    let store: Arc<dyn ProfileStore> = match output {
        Some(path) => {
            info!(path = %path.display(), "Writing accepted profiles");
            Arc::new(JsonlProfileStore::new(path))
        }
        None => Arc::new(InMemoryProfileStore::new()),
    };

    let learning = match learning_db {
        Some(path) => Some(open_learning_log(Some(&path), config).await?),
        None => None,
    };

    let runner = BatchRunner::new(Arc::clone(&gate), store, config);
    let summary = runner.run(inputs).await;

    for outcome in &summary.verdicts {
        println!("{}", serde_json::to_string(outcome).context("Failed to encode verdict")?);

        let Some(learning) = learning.as_ref() else {
            continue;
        };
        for plan in &outcome.retry_plans {
            let Some(first) = plan.methods.first() else {
                continue;
            };
            let rate = learning
                .success_rate(&plan.field, plan.failure_type, *first)
                .await
                .context("Failed to read learning log")?;
            info!(
                profile_id = %outcome.profile_id,
                field = %plan.field,
                failure_type = %plan.failure_type,
                method = %first,
                past_success_rate = ?rate,
                "Retry plan"
            );
        }
    }

    let stats = gate.stats();
    info!(
        evaluated = stats.evaluated,
        quarantine_rate = stats.quarantine_rate(),
        ai_calls = stats.ai_calls,
        ai_upgrades = stats.ai_upgrades,
        ai_refutations = stats.ai_refutations,
        ai_failures = stats.ai_failures,
        ai_skipped = stats.ai_skipped,
        "Gate statistics"
    );

    if summary.write_failures > 0 {
        bail!("{} profile writes failed", summary.write_failures);
    }
    Ok(())
}

/// SQLite log unless the path ends in `.jsonl`
async fn open_learning_log(path: Option<&Path>, config: &GateConfig) -> Result<Box<dyn LearningSink>> {
    let Some(path) = path.map(Path::to_path_buf).or_else(|| config.learning.db_path.clone()) else {
        bail!("No learning log configured (use --learning-db or learning.db_path)");
    };

    if path.extension().is_some_and(|ext| ext == "jsonl") {
        return Ok(Box::new(JsonlLearningLog::new(path)));
    }

    let log = LearningLog::connect(&path)
        .await
        .with_context(|| format!("Failed to open learning log {}", path.display()))?;
    Ok(Box::new(log))
}
