//! Sync mode engine
//!
//! The [`SyncModeEngine`] runs one synchronization of a local [`Dataset`]
//! into the configured sheet:
//!
//! 1. **Snapshot**: read the remote table, or only its header row when the
//!    mode just appends
//! 2. **Plan**: decide the phases with [`plan_sync`]
//! 3. **Deliver**: run each phase through the planner and the adaptive
//!    uploader, in order, stopping at the first failure
//!
//! Delivery is not atomic. When a phase fails, the writes already accepted
//! stay in the sheet and later phases do not run.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use sheetsync_core::config::{Config, TransportConfig};
use sheetsync_core::domain::{
    Anchor, CellRange, CellRef, Dataset, DuplicateKeyPolicy, RangeValues, Row, RunId, SyncMode,
    WriteIntent, WritePrimitive, MAX_COLUMNS, MAX_ROWS,
};
use sheetsync_core::ports::ISheetClient;

use crate::planner::ChunkPlanner;
use crate::policy::{
    plan_sync, snapshot_scope, Phase, PhaseKind, PlanInput, PlanSummary, SnapshotScope, SyncPlan,
};
use crate::transport::{Destination, ResilientTransport};
use crate::uploader::{AdaptiveUploader, UploadStats};
use crate::SyncError;

/// Rows read when taking a snapshot of the remote table
pub const SNAPSHOT_ROW_LIMIT: u32 = 500_000;

/// Snapshots read at least up to this column (`ZZ`)
pub const SNAPSHOT_MIN_LAST_COLUMN: u32 = 702;

// ============================================================================
// EngineSettings
// ============================================================================

/// Everything the engine needs besides the sheet client
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Cell holding the first header
    pub anchor: Anchor,
    pub row_batch_size: u32,
    pub col_batch_size: u32,
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Local columns to write; empty means all of them
    pub selective_columns: Vec<String>,
    /// Add the index column to `selective_columns` when it is missing
    pub auto_include_index: bool,
    pub transport: TransportConfig,
}

impl EngineSettings {
    /// Settings from a loaded configuration
    ///
    /// # Errors
    /// Returns [`SyncError::DomainError`] if the target sheet id or start
    /// cell is invalid
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        Ok(Self {
            anchor: Anchor::new(config.target.sheet_id()?, config.target.origin()?),
            row_batch_size: config.batching.row_batch_size,
            col_batch_size: config.batching.col_batch_size,
            duplicate_keys: config.sync.duplicate_keys,
            selective_columns: config.sync.selective_columns.clone(),
            auto_include_index: config.sync.auto_include_index,
            transport: config.transport.clone(),
        })
    }
}

// ============================================================================
// SyncReport
// ============================================================================

/// What one phase delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseOutcome {
    pub kind: PhaseKind,
    pub primitive: WritePrimitive,
    /// Payload rows the phase carried
    pub rows: usize,
    pub stats: UploadStats,
}

/// Summary of a completed synchronization
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: RunId,
    pub mode: SyncMode,
    pub started_at: DateTime<Utc>,
    pub phases: Vec<PhaseOutcome>,
    pub summary: PlanSummary,
    /// Requests accepted across all phases
    pub requests: u32,
    /// Chunks bisected across all phases
    pub splits: u32,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

// ============================================================================
// SyncModeEngine
// ============================================================================

/// Runs syncs against one sheet
///
/// One engine owns one transport, so every request of a sync (and of any
/// later sync through the same engine) shares the same rate limiter.
pub struct SyncModeEngine {
    uploader: AdaptiveUploader,
    planner: ChunkPlanner,
    anchor: Anchor,
    duplicate_keys: DuplicateKeyPolicy,
    selective_columns: Vec<String>,
    auto_include_index: bool,
}

impl SyncModeEngine {
    pub fn new(client: Arc<dyn ISheetClient>, settings: EngineSettings) -> Self {
        let transport = ResilientTransport::from_config(client, &settings.transport);
        Self {
            uploader: AdaptiveUploader::new(transport),
            planner: ChunkPlanner::new(settings.row_batch_size, settings.col_batch_size),
            anchor: settings.anchor,
            duplicate_keys: settings.duplicate_keys,
            selective_columns: settings.selective_columns,
            auto_include_index: settings.auto_include_index,
        }
    }

    /// Engine for the sheet and limits named in `config`
    ///
    /// # Errors
    /// See [`EngineSettings::from_config`]
    pub fn from_config(client: Arc<dyn ISheetClient>, config: &Config) -> Result<Self, SyncError> {
        Ok(Self::new(client, EngineSettings::from_config(config)?))
    }

    #[must_use]
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    #[must_use]
    pub fn planner(&self) -> &ChunkPlanner {
        &self.planner
    }

    /// Range read for a snapshot of a table about `width` columns wide;
    /// only the header row for [`SnapshotScope::Header`]
    ///
    /// # Errors
    /// Returns [`SyncError::DomainError`] if the anchor leaves no room
    pub fn snapshot_range(
        &self,
        width: usize,
        scope: SnapshotScope,
    ) -> Result<CellRange, SyncError> {
        let origin = self.anchor.origin;
        let last_row = match scope {
            SnapshotScope::Header => origin.row,
            SnapshotScope::Table => origin
                .row
                .saturating_add(SNAPSHOT_ROW_LIMIT - 1)
                .min(MAX_ROWS),
        };
        let wanted = origin.col.saturating_add(width.max(1) as u32 - 1);
        let last_col = wanted.max(SNAPSHOT_MIN_LAST_COLUMN).min(MAX_COLUMNS);
        Ok(CellRange::new(
            self.anchor.sheet.clone(),
            origin,
            CellRef::new(last_row, last_col)?,
        )?)
    }

    /// Read the remote table at the anchor
    ///
    /// # Errors
    /// Returns the transport's error if the read fails
    pub async fn read_snapshot(
        &self,
        width: usize,
        scope: SnapshotScope,
    ) -> Result<Dataset, SyncError> {
        let range = self.snapshot_range(width, scope)?;
        let values = self.uploader.transport().read(&range).await?;
        let snapshot = Dataset::from_table(values);
        info!(
            range = %range,
            rows = snapshot.height(),
            cols = snapshot.width(),
            "Remote snapshot read"
        );
        Ok(snapshot)
    }

    /// Decide what a sync would write, without writing
    ///
    /// Reads the remote snapshot the mode needs. Clone ignores
    /// `index_column`.
    ///
    /// # Errors
    /// - [`SyncError::IndexColumnNotFound`] if `index_column` is not a local header
    /// - [`SyncError::SelectiveClone`] if columns are selected in clone mode
    /// - The transport's error if the snapshot read fails
    pub async fn plan(
        &self,
        mode: SyncMode,
        local: &Dataset,
        index_column: Option<&str>,
    ) -> Result<SyncPlan, SyncError> {
        let index_column = index_column.filter(|_| mode.uses_index());
        if let Some(name) = index_column {
            local
                .column_index(name)
                .map_err(|_| SyncError::IndexColumnNotFound(name.to_string()))?;
        }
        let local = self.select_columns(mode, local, index_column)?;

        let remote = if local.is_empty() {
            Dataset::default()
        } else {
            self.read_snapshot(local.width(), snapshot_scope(mode, index_column))
                .await?
        };

        plan_sync(PlanInput {
            mode,
            local: &local,
            remote: &remote,
            index_column,
            duplicate_keys: self.duplicate_keys,
            anchor: &self.anchor,
            selective: matches!(local, Cow::Owned(_)),
        })
    }

    /// `local` narrowed to the selected columns, or unchanged when none are
    fn select_columns<'a>(
        &self,
        mode: SyncMode,
        local: &'a Dataset,
        index_column: Option<&str>,
    ) -> Result<Cow<'a, Dataset>, SyncError> {
        if self.selective_columns.is_empty() {
            return Ok(Cow::Borrowed(local));
        }
        if mode == SyncMode::Clone {
            return Err(SyncError::SelectiveClone);
        }

        let mut columns = self.selective_columns.clone();
        if let Some(name) = index_column.filter(|_| self.auto_include_index) {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        let (narrowed, missing) = local.select(&columns);
        if !missing.is_empty() {
            warn!(columns = ?missing, "Selected columns missing from local headers");
        }
        info!(columns = ?narrowed.headers, "Syncing selected columns only");
        Ok(Cow::Owned(narrowed))
    }

    /// Synchronize `local` into the sheet with `mode`
    ///
    /// # Errors
    /// Returns the first error any phase hits; the phases after it are
    /// not attempted
    #[tracing::instrument(skip(self, local), fields(rows = local.height()))]
    pub async fn execute(
        &self,
        mode: SyncMode,
        local: &Dataset,
        index_column: Option<&str>,
    ) -> Result<SyncReport, SyncError> {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(%run_id, %mode, index_column, "Starting sync");

        let plan = self.plan(mode, local, index_column).await?;
        if plan.is_noop() {
            info!(%run_id, "Nothing to write");
        }

        let mut phases = Vec::with_capacity(plan.phases.len());
        let mut totals = UploadStats::default();
        for phase in &plan.phases {
            info!(
                phase = %phase.kind,
                primitive = %phase.intent.primitive(),
                rows = phase.intent.row_count(),
                "Running phase"
            );
            let stats = self.run_phase(phase).await.map_err(|err| {
                error!(phase = %phase.kind, error = %err, "Phase failed, later phases skipped");
                err
            })?;
            totals.merge(stats);
            phases.push(PhaseOutcome {
                kind: phase.kind,
                primitive: phase.intent.primitive(),
                rows: phase.intent.row_count(),
                stats,
            });
        }

        let report = SyncReport {
            run_id,
            mode,
            started_at,
            phases,
            summary: plan.summary,
            requests: totals.requests,
            splits: totals.splits,
            duration_ms: clock.elapsed().as_millis() as u64,
        };
        info!(
            %run_id,
            updated = report.summary.rows_updated,
            inserted = report.summary.rows_inserted,
            skipped = report.summary.rows_skipped,
            requests = report.requests,
            splits = report.splits,
            duration_ms = report.duration_ms,
            "Sync completed"
        );
        Ok(report)
    }

    async fn run_phase(&self, phase: &Phase) -> Result<UploadStats, SyncError> {
        match &phase.intent {
            WriteIntent::Overwrite { anchor, rows } => {
                self.deliver_rows(WritePrimitive::Overwrite, anchor, rows).await
            }
            WriteIntent::Prepend { anchor, rows } => {
                self.deliver_rows(WritePrimitive::Prepend, anchor, rows).await
            }
            WriteIntent::Append { anchor, rows } => {
                self.deliver_rows(WritePrimitive::Append, anchor, rows).await
            }
            WriteIntent::BatchOverwrite { ranges } => self.deliver_batch(ranges).await,
        }
    }

    async fn deliver_rows(
        &self,
        primitive: WritePrimitive,
        anchor: &Anchor,
        rows: &[Row],
    ) -> Result<UploadStats, SyncError> {
        let destination = Destination::new(primitive, anchor.clone());
        let mut stats = UploadStats::default();
        for chunk in self.planner.plan_for(primitive, rows) {
            stats.merge(self.uploader.deliver(&destination, chunk).await?);
        }
        Ok(stats)
    }

    /// Clears go out together in one request; ranges with values are
    /// chunked like any other overwrite
    async fn deliver_batch(&self, ranges: &[RangeValues]) -> Result<UploadStats, SyncError> {
        let mut stats = UploadStats::default();
        let (clears, writes): (Vec<RangeValues>, Vec<RangeValues>) =
            ranges.iter().cloned().partition(|r| r.values.is_empty());

        if !clears.is_empty() {
            self.uploader.transport().clear(&clears).await?;
            stats.requests += 1;
        }
        for entry in &writes {
            let anchor = Anchor::new(entry.range.sheet.clone(), entry.range.start);
            stats.merge(
                self.deliver_rows(WritePrimitive::BatchOverwrite, &anchor, &entry.values)
                    .await?,
            );
        }
        Ok(stats)
    }
}
