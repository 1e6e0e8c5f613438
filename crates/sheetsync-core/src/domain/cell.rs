//! Cell values and index keys
//!
//! A [`CellValue`] is what one spreadsheet cell holds on the wire. Values read
//! back from the service arrive as loosely typed JSON; [`CellValue::from`]
//! folds them into this closed set.

use std::fmt::{self, Display, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// Formats accepted when a text cell is recognised as a calendar date
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum CellValue {
    /// No value; written as an empty string
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// Whether this cell holds no value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Build a text cell, treating blank strings as empty
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    fn from_str_value(s: String) -> Self {
        if s.is_empty() {
            return CellValue::Empty;
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(&s, format) {
                return CellValue::Date(date);
            }
        }
        CellValue::Text(s)
    }
}

/// Render an f64 without a trailing `.0` when it is integral
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_str(""),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                    serializer.serialize_i64(*n as i64)
                } else if n.is_finite() {
                    serializer.serialize_f64(*n)
                } else {
                    serializer.serialize_str("")
                }
            }
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
            Value::String(s) => CellValue::from_str_value(s),
            // Rich-text cells (links, mentions) come back as segment arrays
            Value::Array(segments) => {
                let text: String = segments
                    .iter()
                    .filter_map(|seg| match seg {
                        Value::String(s) => Some(s.as_str()),
                        Value::Object(map) => map.get("text").and_then(Value::as_str),
                        _ => None,
                    })
                    .collect();
                CellValue::text(text)
            }
            Value::Object(map) => match map.get("text").and_then(Value::as_str) {
                Some(text) => CellValue::text(text),
                None => CellValue::Text(Value::Object(map).to_string()),
            },
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

// ============================================================================
// IndexKey
// ============================================================================

/// Normalized value of an index-column cell
///
/// Two rows refer to the same record when their keys are equal. Keys are
/// compared as trimmed strings, so `1`, `1.0` and `" 1 "` all collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IndexKey(String);

impl IndexKey {
    /// Derive a key from a cell; empty and blank cells have no key
    #[must_use]
    pub fn from_cell(cell: &CellValue) -> Option<Self> {
        let rendered = cell.to_string();
        let trimmed = rendered.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IndexKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
