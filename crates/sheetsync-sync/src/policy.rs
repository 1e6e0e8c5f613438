//! Per-mode write decisions
//!
//! Given the local dataset and a snapshot of the remote table, decide which
//! writes each mode needs. Nothing here performs I/O; the engine executes the
//! resulting [`SyncPlan`] phase by phase.
//!
//! Layout conventions:
//! - The header row sits at the anchor; data rows start one row below.
//! - Full and incremental syncs write into the remote column layout. Local
//!   columns the remote header lacks are dropped, with a warning.
//! - Overwrite rewrites the table in the union layout: remote headers first,
//!   then local-only headers.
//! - Clone writes the local table as is.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use sheetsync_core::domain::{
    union_headers, Anchor, CellValue, ColumnMapping, Dataset, DuplicateKeyPolicy, RangeValues, Row,
    SyncMode, WriteIntent,
};
use tracing::warn;

use crate::indexer::{key_of, Indexer};
use crate::SyncError;

/// Role of a phase within a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Clear the remote table before rewriting it
    Clear,
    /// Write header and rows into an empty sheet
    Seed,
    /// Rewrite remote rows whose key matched a local row
    UpdateInPlace,
    /// Append rows whose key is new
    AppendNew,
    /// Rewrite the whole table
    Rewrite,
    /// Clear what a shorter or narrower rewrite left behind
    ClearTail,
    /// Write the local table
    Write,
}

impl Display for PhaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseKind::Clear => "clear",
            PhaseKind::Seed => "seed",
            PhaseKind::UpdateInPlace => "update_in_place",
            PhaseKind::AppendNew => "append_new",
            PhaseKind::Rewrite => "rewrite",
            PhaseKind::ClearTail => "clear_tail",
            PhaseKind::Write => "write",
        };
        f.write_str(name)
    }
}

/// One write of a plan
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub kind: PhaseKind,
    pub intent: WriteIntent,
}

/// Row counts a plan commits to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Remote rows rewritten with local values
    pub rows_updated: usize,
    /// Local rows written as new rows
    pub rows_inserted: usize,
    /// Local rows not written because their key already exists remotely
    pub rows_skipped: usize,
    /// Remote rows carried over unchanged by a rewrite
    pub rows_kept: usize,
    /// Remote rows removed or replaced
    pub rows_removed: usize,
    /// Local columns with no place in the remote layout
    pub columns_dropped: Vec<String>,
}

/// Ordered phases for one sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub mode: SyncMode,
    pub phases: Vec<Phase>,
    pub summary: PlanSummary,
}

impl SyncPlan {
    fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            phases: Vec::new(),
            summary: PlanSummary::default(),
        }
    }

    fn push(&mut self, kind: PhaseKind, intent: WriteIntent) {
        self.phases.push(Phase { kind, intent });
    }

    /// True when the plan writes nothing
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.phases.is_empty()
    }
}

/// How much of the remote table a sync has to read first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope {
    /// The header row only; enough to tell a blank sheet from a table
    Header,
    /// The header and every data row
    Table,
}

/// What `mode` needs to read before it can decide
#[must_use]
pub fn snapshot_scope(mode: SyncMode, index_column: Option<&str>) -> SnapshotScope {
    match mode {
        SyncMode::Full | SyncMode::Incremental if index_column.is_none() => SnapshotScope::Header,
        _ => SnapshotScope::Table,
    }
}

/// Inputs to [`plan_sync`]
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    pub mode: SyncMode,
    pub local: &'a Dataset,
    /// Remote table; blank when the sheet is empty or was not read
    pub remote: &'a Dataset,
    pub index_column: Option<&'a str>,
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Where the header row's first cell sits
    pub anchor: &'a Anchor,
    /// `local` carries only some of its columns; overwrite then keeps the
    /// other cells of rows it replaces
    pub selective: bool,
}

/// Decide the phases for one sync
///
/// The index column is ignored in clone mode.
///
/// # Errors
/// [`SyncError::IndexColumnNotFound`] if a mode that matches keys names an
/// index column the local headers lack; [`SyncError::DomainError`] if the
/// table would leave the sheet
pub fn plan_sync(input: PlanInput<'_>) -> Result<SyncPlan, SyncError> {
    let PlanInput {
        mode,
        local,
        remote,
        index_column,
        duplicate_keys,
        anchor,
        selective,
    } = input;
    let mut plan = SyncPlan::new(mode);
    if local.is_empty() {
        return Ok(plan);
    }

    let keyed = match index_column.filter(|_| mode.uses_index()) {
        Some(name) => {
            let column = local
                .column_index(name)
                .map_err(|_| SyncError::IndexColumnNotFound(name.to_string()))?;
            Some(KeyColumn { name, column })
        }
        None => None,
    };
    let data_anchor = Anchor::new(anchor.sheet.clone(), anchor.origin.offset(1, 0)?);

    match (mode, keyed) {
        (SyncMode::Full | SyncMode::Incremental | SyncMode::Overwrite, _) if remote.is_blank() => {
            seed(&mut plan, local, anchor);
        }
        (SyncMode::Full | SyncMode::Incremental, None) => {
            let mapping = remote_layout_mapping(&mut plan, local, remote);
            plan.summary.rows_inserted = local.height();
            plan.push(
                PhaseKind::AppendNew,
                WriteIntent::Append {
                    anchor: data_anchor,
                    rows: local.rows.iter().map(|row| mapping.project(row)).collect(),
                },
            );
        }
        (SyncMode::Incremental, Some(key)) => {
            plan_incremental(&mut plan, local, remote, key, data_anchor);
        }
        (SyncMode::Full, Some(key)) => {
            plan_full(&mut plan, local, remote, key, duplicate_keys, data_anchor);
        }
        (SyncMode::Overwrite, keyed) => {
            plan_overwrite(&mut plan, local, remote, keyed, selective, anchor)?;
        }
        (SyncMode::Clone, _) => plan_clone(&mut plan, local, remote, anchor)?,
    }

    Ok(plan)
}

#[derive(Debug, Clone, Copy)]
struct KeyColumn<'a> {
    name: &'a str,
    /// Position in the local headers
    column: usize,
}

/// Position of the index column in the remote headers
fn remote_key_column(remote: &Dataset, name: &str) -> Option<usize> {
    let column = remote.column_index(name).ok();
    if column.is_none() {
        warn!(
            index_column = name,
            "Index column missing from remote header, treating every local row as new"
        );
    }
    column
}

fn remote_layout_mapping(plan: &mut SyncPlan, local: &Dataset, remote: &Dataset) -> ColumnMapping {
    let dropped = ColumnMapping::dropped_columns(&local.headers, &remote.headers);
    if !dropped.is_empty() {
        warn!(columns = ?dropped, "Local columns missing from remote header will not be written");
    }
    plan.summary.columns_dropped = dropped;
    ColumnMapping::between(&local.headers, &remote.headers)
}

fn seed(plan: &mut SyncPlan, local: &Dataset, anchor: &Anchor) {
    plan.summary.rows_inserted = local.height();
    plan.push(
        PhaseKind::Seed,
        WriteIntent::Overwrite {
            anchor: anchor.clone(),
            rows: local.to_table(),
        },
    );
}

fn plan_incremental(
    plan: &mut SyncPlan,
    local: &Dataset,
    remote: &Dataset,
    key: KeyColumn<'_>,
    data_anchor: Anchor,
) {
    let remote_index = remote_key_column(remote, key.name)
        .map(|c| Indexer::build(&remote.rows, c))
        .unwrap_or_default();
    let mapping = remote_layout_mapping(plan, local, remote);

    let new_rows: Vec<Row> = local
        .rows
        .iter()
        .filter(|row| key_of(row, key.column).map_or(true, |k| !remote_index.contains(&k)))
        .map(|row| mapping.project(row))
        .collect();

    plan.summary.rows_inserted = new_rows.len();
    plan.summary.rows_skipped = local.height() - new_rows.len();
    if !new_rows.is_empty() {
        plan.push(
            PhaseKind::AppendNew,
            WriteIntent::Append {
                anchor: data_anchor,
                rows: new_rows,
            },
        );
    }
}

fn plan_full(
    plan: &mut SyncPlan,
    local: &Dataset,
    remote: &Dataset,
    key: KeyColumn<'_>,
    duplicate_keys: DuplicateKeyPolicy,
    data_anchor: Anchor,
) {
    let remote_column = remote_key_column(remote, key.name);
    let remote_index = remote_column
        .map(|c| Indexer::build(&remote.rows, c))
        .unwrap_or_default();
    let local_index = Indexer::build_with_policy(&local.rows, key.column, duplicate_keys);
    let mapping = remote_layout_mapping(plan, local, remote);
    let width = remote.width();

    let mut updated = 0;
    let rewritten: Vec<Row> = remote
        .rows
        .iter()
        .enumerate()
        .map(|(position, row)| {
            let mut base = row.clone();
            base.resize(width, Default::default());
            let source = remote_column
                .and_then(|c| key_of(row, c))
                .filter(|k| remote_index.position(k) == Some(position))
                .and_then(|k| local_index.position(&k));
            match source {
                Some(local_position) => {
                    updated += 1;
                    mapping.overlay(&base, &local.rows[local_position])
                }
                None => base,
            }
        })
        .collect();

    let new_rows: Vec<Row> = local
        .rows
        .iter()
        .filter(|row| key_of(row, key.column).map_or(true, |k| !remote_index.contains(&k)))
        .map(|row| mapping.project(row))
        .collect();

    plan.summary.rows_updated = updated;
    plan.summary.rows_inserted = new_rows.len();
    plan.summary.rows_skipped = local.height().saturating_sub(updated + new_rows.len());

    if updated > 0 {
        plan.push(
            PhaseKind::UpdateInPlace,
            WriteIntent::Overwrite {
                anchor: data_anchor.clone(),
                rows: rewritten,
            },
        );
    }
    if !new_rows.is_empty() {
        plan.push(
            PhaseKind::AppendNew,
            WriteIntent::Append {
                anchor: data_anchor,
                rows: new_rows,
            },
        );
    }
}

fn plan_overwrite(
    plan: &mut SyncPlan,
    local: &Dataset,
    remote: &Dataset,
    keyed: Option<KeyColumn<'_>>,
    selective: bool,
    anchor: &Anchor,
) -> Result<(), SyncError> {
    // Without an index no remote row can be matched, so all of them are superseded.
    let mut layout = local.headers.clone();
    let mut retained: Vec<&Row> = Vec::new();
    let mut remote_index = Indexer::default();
    if let Some(key) = keyed {
        let local_index = Indexer::build(&local.rows, key.column);
        retained = match remote_key_column(remote, key.name) {
            Some(c) => {
                remote_index = Indexer::build(&remote.rows, c);
                remote
                    .rows
                    .iter()
                    .filter(|row| key_of(row, c).map_or(true, |k| !local_index.contains(&k)))
                    .collect()
            }
            None => remote.rows.iter().collect(),
        };
        layout = union_headers(&remote.headers, &local.headers);
    }

    let remote_map = ColumnMapping::between(&remote.headers, &layout);
    let local_map = ColumnMapping::between(&local.headers, &layout);
    let replacement = |row: &Row| -> Row {
        let previous = keyed
            .filter(|_| selective)
            .and_then(|key| key_of(row, key.column))
            .and_then(|k| remote_index.position(&k));
        match previous {
            Some(position) => local_map.overlay(&remote_map.project(&remote.rows[position]), row),
            None => local_map.project(row),
        }
    };
    let mut table: Vec<Row> = Vec::with_capacity(1 + retained.len() + local.height());
    table.push(layout.iter().map(|h| CellValue::text(h.clone())).collect());
    table.extend(retained.iter().map(|row| remote_map.project(row)));
    table.extend(local.rows.iter().map(replacement));

    plan.summary.rows_kept = retained.len();
    plan.summary.rows_removed = remote.height() - retained.len();
    plan.summary.rows_inserted = local.height();

    let old_height = (remote.height() + 1) as u32;
    let old_width = remote.width() as u32;
    let new_height = table.len() as u32;
    let new_width = layout.len() as u32;
    plan.push(
        PhaseKind::Rewrite,
        WriteIntent::Overwrite {
            anchor: anchor.clone(),
            rows: table,
        },
    );

    let mut leftovers = Vec::new();
    if old_height > new_height {
        leftovers.push(RangeValues::clear(anchor.range_of(
            new_height + 1,
            old_height,
            1,
            old_width.max(new_width),
        )?));
    }
    if old_width > new_width {
        leftovers.push(RangeValues::clear(anchor.range_of(
            1,
            new_height.min(old_height),
            new_width + 1,
            old_width,
        )?));
    }
    if !leftovers.is_empty() {
        plan.push(
            PhaseKind::ClearTail,
            WriteIntent::BatchOverwrite { ranges: leftovers },
        );
    }
    Ok(())
}

fn plan_clone(
    plan: &mut SyncPlan,
    local: &Dataset,
    remote: &Dataset,
    anchor: &Anchor,
) -> Result<(), SyncError> {
    if !remote.is_blank() && remote.width() > 0 {
        let extent = anchor.range_of(1, (remote.height() + 1) as u32, 1, remote.width() as u32)?;
        plan.summary.rows_removed = remote.height();
        plan.push(
            PhaseKind::Clear,
            WriteIntent::BatchOverwrite {
                ranges: vec![RangeValues::clear(extent)],
            },
        );
    }
    plan.summary.rows_inserted = local.height();
    plan.push(
        PhaseKind::Write,
        WriteIntent::Overwrite {
            anchor: anchor.clone(),
            rows: local.to_table(),
        },
    );
    Ok(())
}
