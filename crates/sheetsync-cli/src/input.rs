//! Local dataset readers
//!
//! The input file's extension picks the reader: `.json`, `.csv`, or a
//! workbook (`.xlsx`, `.xlsm`, `.xls`, `.ods`) whose first worksheet is used.
//! In every format the first row is the header.

use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveTime;

use sheetsync_core::domain::{CellValue, Dataset, Row};

/// Formats [`load_dataset`] understands, by lowercase extension
pub const SUPPORTED_EXTENSIONS: &[&str] = &["json", "csv", "xlsx", "xlsm", "xls", "ods"];

/// Read a dataset, choosing the reader from the file extension
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        "xlsx" | "xlsm" | "xls" | "ods" => load_workbook(path),
        _ => bail!(
            "Unsupported dataset format '{}'; expected one of: {}",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        ),
    }
}

fn load_json(path: &Path) -> Result<Dataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
    Dataset::from_json_value(value).with_context(|| format!("Invalid dataset {}", path.display()))
}

fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;

    let mut table: Vec<Row> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Invalid CSV record {} in {}", line + 1, path.display()))?;
        let cells = if line == 0 {
            record.iter().map(CellValue::text).collect()
        } else {
            record.iter().map(csv_cell).collect()
        };
        table.push(cells);
    }
    Ok(Dataset::from_table(table))
}

/// Numbers become numeric cells unless they carry a leading zero, so codes
/// such as `007` stay text
fn csv_cell(field: &str) -> CellValue {
    let trimmed = field.trim();
    let leading_zero = trimmed.len() > 1
        && trimmed.starts_with('0')
        && !trimmed.starts_with("0.");
    if !leading_zero {
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellValue::Number(n);
            }
        }
    }
    CellValue::from(serde_json::Value::String(field.to_string()))
}

fn load_workbook(path: &Path) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .with_context(|| format!("Workbook {} has no worksheets", path.display()))?
        .with_context(|| format!("Failed to read first worksheet of {}", path.display()))?;

    let table: Vec<Row> = range
        .rows()
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect();
    Ok(Dataset::from_table(table))
}

fn workbook_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => CellValue::Date(dt.date()),
            Some(dt) => CellValue::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::text(data.to_string()),
        },
        Data::DurationIso(s) => CellValue::text(s.clone()),
    }
}
