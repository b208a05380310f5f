use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use financing_reconciler::config::Config;
use financing_reconciler::core::FinancingStore;
use financing_reconciler::financing::{InMemoryFinancingStore, MySqlFinancingStore};
use financing_reconciler::reconciliation::{PipelineSettings, ReconciliationPipeline, RepairStage};
use financing_reconciler::reports::{FileReportSink, LogReportSink, ReportSink};

#[derive(Parser, Debug)]
#[command(name = "financing-reconciler", version)]
#[command(about = "Detect and repair drift between the payment ledger and financing installments")]
struct Cli {
    /// Run against an exported JSON dataset instead of the database
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Write the repaired dataset here when the run finishes
    #[arg(long, global = true, requires = "dataset")]
    write_dataset: Option<PathBuf>,

    /// Root directory for report files (defaults to REPORT_DIR)
    #[arg(long, global = true)]
    report_dir: Option<PathBuf>,

    /// Emit reports through the log instead of writing files
    #[arg(long, global = true)]
    stdout_reports: bool,

    /// JSON log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Reference date for overdue status (YYYY-MM-DD, defaults to today UTC)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Report discrepancies without changing anything
    Detect,
    /// Nudge one paid cuota for discrepancies below the minor threshold
    RepairMinor,
    /// Reset and replay payments for financings whose ledger exceeds the projection
    RepairSurplus,
    /// Reset and refill every remaining discrepancy from the ledger total
    RepairReset,
    /// Detect, then run every repair stage in order
    RunAll,
}

impl Command {
    fn stage(self) -> Option<RepairStage> {
        match self {
            Command::RepairMinor => Some(RepairStage::MinorDifferenceRepair),
            Command::RepairSurplus => Some(RepairStage::SurplusRedistribute),
            Command::RepairReset => Some(RepairStage::FullResetReconcile),
            Command::Detect | Command::RunAll => None,
        }
    }
}

enum Backend {
    Dataset(InMemoryFinancingStore),
    MySql(MySqlFinancingStore),
}

impl Backend {
    fn store(&self) -> &dyn FinancingStore {
        match self {
            Backend::Dataset(store) => store,
            Backend::MySql(store) => store,
        }
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("financing_reconciler={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    init_tracing(&config.app.log_level, cli.json_logs);

    tracing::info!(
        env = config.app.env.as_str(),
        command = ?cli.command,
        "Starting financing reconciler"
    );

    let backend = match &cli.dataset {
        Some(path) => Backend::Dataset(
            InMemoryFinancingStore::from_json_file(path)
                .await
                .with_context(|| format!("Failed to load dataset {}", path.display()))?,
        ),
        None => {
            let database = config.require_database()?;
            let pool = database
                .create_pool()
                .await
                .context("Failed to create database pool")?;
            tracing::info!(
                "Database pool initialized ({} connections)",
                database.pool_size
            );
            Backend::MySql(MySqlFinancingStore::new(pool))
        }
    };

    let sink: Box<dyn ReportSink> = if cli.stdout_reports {
        Box::new(LogReportSink)
    } else {
        let root = cli
            .report_dir
            .clone()
            .unwrap_or_else(|| config.reconcile.report_dir.clone());
        Box::new(FileReportSink::new(root))
    };

    let as_of = cli.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let settings =
        PipelineSettings::new(as_of).with_minor_threshold(config.reconcile.minor_threshold);
    let pipeline = ReconciliationPipeline::new(backend.store(), sink.as_ref(), settings);

    match (cli.command, cli.command.stage()) {
        (Command::Detect, _) => {
            let report = pipeline.detect("initial").await?;
            let summary = report.summary();
            tracing::info!(
                run_id = %pipeline.run_id(),
                discrepancies = report.len(),
                surplus = summary.positive_count,
                deficit = summary.negative_count,
                unreadable = report.unreadable.len(),
                "Detection complete"
            );
        }
        (_, Some(stage)) => {
            let run = pipeline.run_stage(stage).await?;
            let record = run.record();
            tracing::info!(
                run_id = %pipeline.run_id(),
                stage = stage.as_str(),
                before = record.before,
                after = record.after,
                resolved = record.resolved,
                failed = record.failed,
                "Stage complete"
            );
        }
        (_, None) => {
            let run = pipeline.run_all().await?;
            if let Some(location) = &run.summary.manual_review {
                tracing::warn!(
                    unresolved = run.summary.total_unresolved(),
                    report = location.as_str(),
                    "Financings left for manual review"
                );
            }
        }
    }

    if let (Some(path), Backend::Dataset(store)) = (&cli.write_dataset, &backend) {
        store
            .write_json_file(path)
            .await
            .with_context(|| format!("Failed to write dataset {}", path.display()))?;
        tracing::info!(path = %path.display(), "Repaired dataset written");
    }

    Ok(())
}
