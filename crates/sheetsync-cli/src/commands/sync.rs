//! Sync command - Push a local dataset into the configured sheet
//!
//! Provides the `sheetsync sync` CLI command which:
//! 1. Loads and validates the configuration, applying flag overrides
//! 2. Reads the local dataset (JSON, CSV or a workbook)
//! 3. Creates the Feishu adapter and the sync engine
//! 4. Runs the sync (or only plans it with `--dry-run`) and reports

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use sheetsync_core::config::Config;
use sheetsync_core::domain::SyncMode;
use sheetsync_core::ports::ISheetClient;
use sheetsync_feishu::client::FeishuClient;
use sheetsync_feishu::provider::FeishuSheetProvider;
use sheetsync_sync::engine::{SyncModeEngine, SyncReport};
use sheetsync_sync::policy::SyncPlan;

use crate::input::load_dataset;
use crate::output::{format_duration, get_formatter, plural, OutputFormat, OutputFormatter};

/// Sync command with clap options
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Dataset file: .json, .csv, .xlsx, .xlsm, .xls or .ods; first row is the header
    #[arg(short, long)]
    pub input: PathBuf,

    /// Sync mode (full, incremental, overwrite, clone); overrides the config
    #[arg(long)]
    pub mode: Option<SyncMode>,

    /// Column whose values identify rows; overrides the config
    #[arg(long)]
    pub index_column: Option<String>,

    /// Show what would be written without writing
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    /// Execute the sync command
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let mut config = Config::load(config_path)?;
        self.apply_overrides(&mut config);
        let errors = config.validate();
        if !errors.is_empty() {
            for error in &errors {
                formatter.error(&error.to_string());
            }
            bail!(
                "Configuration has {}; run 'sheetsync config validate'",
                plural(errors.len(), "error")
            );
        }
        info!(config_path = %config_path.display(), "Loaded configuration");

        let local = load_dataset(&self.input)?;
        info!(
            input = %self.input.display(),
            rows = local.height(),
            cols = local.width(),
            "Loaded dataset"
        );

        let client = FeishuClient::from_config(&config.auth, &config.transport)?;
        let provider = FeishuSheetProvider::new(client, config.target.spreadsheet_token()?);
        let engine = SyncModeEngine::from_config(Arc::new(provider) as Arc<dyn ISheetClient>, &config)?;

        let mode = config.sync.mode;
        let index_column = config.sync.index_column.as_deref();

        if self.dry_run {
            formatter.info("Dry run mode - no changes will be made");
            let plan = engine
                .plan(mode, &local, index_column)
                .await
                .context("Failed to plan sync")?;
            print_plan(formatter.as_ref(), format, &plan)?;
            return Ok(());
        }

        formatter.info(&format!("Starting {mode} sync of {}...", plural(local.height(), "row")));
        let report = engine
            .execute(mode, &local, index_column)
            .await
            .context("Sync failed")?;
        print_report(formatter.as_ref(), format, &report)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.sync.mode = mode;
        }
        if let Some(column) = &self.index_column {
            config.sync.index_column = Some(column.clone());
        }
    }
}

fn print_plan(formatter: &dyn OutputFormatter, format: OutputFormat, plan: &SyncPlan) -> Result<()> {
    if format == OutputFormat::Json {
        let phases: Vec<_> = plan
            .phases
            .iter()
            .map(|p| {
                serde_json::json!({
                    "kind": p.kind,
                    "primitive": p.intent.primitive(),
                    "rows": p.intent.row_count(),
                })
            })
            .collect();
        formatter.print_json(&serde_json::json!({
            "dry_run": true,
            "mode": plan.mode,
            "phases": phases,
            "summary": serde_json::to_value(&plan.summary)?,
        }));
        return Ok(());
    }

    if plan.is_noop() {
        formatter.success("Nothing to write");
        return Ok(());
    }
    formatter.success(&format!("{} sync would run {}", plan.mode, plural(plan.phases.len(), "phase")));
    for (i, phase) in plan.phases.iter().enumerate() {
        formatter.info(&format!(
            "{}. {} ({}, {})",
            i + 1,
            phase.kind,
            phase.intent.primitive(),
            plural(phase.intent.row_count(), "row")
        ));
    }
    print_summary_fields(formatter, &plan.summary);
    Ok(())
}

fn print_report(formatter: &dyn OutputFormatter, format: OutputFormat, report: &SyncReport) -> Result<()> {
    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::to_value(report)?);
        return Ok(());
    }

    if report.phases.is_empty() {
        formatter.success("Already up to date");
    } else {
        formatter.success(&format!(
            "Sync completed in {}",
            format_duration(report.duration_ms)
        ));
    }
    print_summary_fields(formatter, &report.summary);
    formatter.field("Requests", &report.requests.to_string());
    if report.splits > 0 {
        formatter.field("Splits", &report.splits.to_string());
    }
    formatter.field("Run", &report.run_id.to_string());
    Ok(())
}

fn print_summary_fields(
    formatter: &dyn OutputFormatter,
    summary: &sheetsync_sync::policy::PlanSummary,
) {
    let counts = [
        ("Updated", summary.rows_updated),
        ("Inserted", summary.rows_inserted),
        ("Skipped", summary.rows_skipped),
        ("Kept", summary.rows_kept),
        ("Removed", summary.rows_removed),
    ];
    for (label, n) in counts.into_iter().filter(|(_, n)| *n > 0) {
        formatter.field(label, &plural(n, "row"));
    }
    if !summary.columns_dropped.is_empty() {
        formatter.warn(&format!(
            "Columns not in the sheet were not written: {}",
            summary.columns_dropped.join(", ")
        ));
    }
}
