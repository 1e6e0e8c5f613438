//! Configuration module for sheetsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{
    column_number, CellRef, DomainError, DuplicateKeyPolicy, SheetId, SpreadsheetToken,
    SyncMode, MAX_COLUMNS, MAX_ROWS,
};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for sheetsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub sync: SyncConfig,
    pub batching: BatchingConfig,
    pub transport: TransportConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// The sheet being written to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Token of the spreadsheet document.
    pub spreadsheet_token: String,
    /// Sheet (tab) id inside the document.
    pub sheet_id: String,
    /// Row where the header row is written (1-based).
    pub start_row: u32,
    /// Column letters where the table starts.
    pub start_column: String,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Default mode: `full`, `incremental`, `overwrite`, or `clone`.
    pub mode: SyncMode,
    /// Header name of the column that identifies a record.
    pub index_column: Option<String>,
    /// Which local row wins when keys repeat: `last_wins` or `first_wins`.
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Only these local columns are written; empty means every column.
    pub selective_columns: Vec<String>,
    /// Add the index column to `selective_columns` when it is missing.
    pub auto_include_index: bool,
}

/// Per-request payload bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Maximum rows per write request.
    pub row_batch_size: u32,
    /// Maximum columns per write request.
    pub col_batch_size: u32,
}

/// Request pacing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Minimum spacing between consecutive requests, in milliseconds.
    pub rate_limit_delay_ms: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Backoff before retry `n` is `2^n` of these units, in milliseconds.
    pub backoff_unit_ms: u64,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
}

/// Application credentials for the tenant access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    /// Open platform base URL.
    pub base_url: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/sheetsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("sheetsync")
            .join("config.yaml")
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

impl TargetConfig {
    /// Validated spreadsheet token.
    pub fn spreadsheet_token(&self) -> Result<SpreadsheetToken, DomainError> {
        SpreadsheetToken::new(self.spreadsheet_token.clone())
    }

    /// Validated sheet id.
    pub fn sheet_id(&self) -> Result<SheetId, DomainError> {
        SheetId::new(self.sheet_id.clone())
    }

    /// Cell where the header row's first column lands.
    pub fn origin(&self) -> Result<CellRef, DomainError> {
        CellRef::new(self.start_row, column_number(&self.start_column)?)
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            index_column: None,
            duplicate_keys: DuplicateKeyPolicy::default(),
            selective_columns: Vec::new(),
            auto_include_index: true,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_token: String::new(),
            sheet_id: String::new(),
            start_row: 1,
            start_column: "A".to_string(),
        }
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            row_batch_size: 500,
            col_batch_size: 80,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: 50,
            max_retries: 3,
            backoff_unit_ms: 1000,
            request_timeout_secs: 60,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            base_url: "https://open.feishu.cn".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"batching.row_batch_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            });
        };

        // --- target ---
        if let Err(e) = self.target.spreadsheet_token() {
            push("target.spreadsheet_token", e.to_string());
        }
        if let Err(e) = self.target.sheet_id() {
            push("target.sheet_id", e.to_string());
        }
        if self.target.start_row == 0 || self.target.start_row > MAX_ROWS {
            push("target.start_row", format!("must be in range 1..={MAX_ROWS}"));
        }
        if let Err(e) = column_number(&self.target.start_column) {
            push("target.start_column", e.to_string());
        }

        // --- sync ---
        if let Some(column) = &self.sync.index_column {
            if column.trim().is_empty() {
                push("sync.index_column", "must not be blank when set".into());
            }
        }
        if !self.sync.selective_columns.is_empty() {
            let columns = &self.sync.selective_columns;
            if self.sync.mode == SyncMode::Clone {
                push(
                    "sync.selective_columns",
                    "not supported in clone mode".into(),
                );
            }
            if columns.iter().any(|c| c.trim().is_empty()) {
                push(
                    "sync.selective_columns",
                    "column names must not be blank".into(),
                );
            }
            let mut seen = std::collections::HashSet::new();
            let duplicates: Vec<&str> = columns
                .iter()
                .filter(|c| !seen.insert(c.as_str()))
                .map(String::as_str)
                .collect();
            if !duplicates.is_empty() {
                push(
                    "sync.selective_columns",
                    format!("duplicate columns: {}", duplicates.join(", ")),
                );
            }
        }

        // --- batching ---
        if self.batching.row_batch_size == 0 {
            push("batching.row_batch_size", "must be greater than 0".into());
        } else if self.batching.row_batch_size > MAX_ROWS {
            push(
                "batching.row_batch_size",
                format!("must not exceed {MAX_ROWS}"),
            );
        }
        if self.batching.col_batch_size == 0 {
            push("batching.col_batch_size", "must be greater than 0".into());
        } else if self.batching.col_batch_size > MAX_COLUMNS {
            push(
                "batching.col_batch_size",
                format!("must not exceed {MAX_COLUMNS}"),
            );
        }

        // --- transport ---
        if self.transport.backoff_unit_ms == 0 {
            push("transport.backoff_unit_ms", "must be greater than 0".into());
        }
        if self.transport.request_timeout_secs == 0 {
            push(
                "transport.request_timeout_secs",
                "must be greater than 0".into(),
            );
        }
        if self.transport.max_retries > 16 {
            push("transport.max_retries", "must be in range 0..=16".into());
        }

        // --- auth ---
        match url::Url::parse(&self.auth.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => push(
                "auth.base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ),
            Err(e) => push("auth.base_url", format!("invalid URL: {e}")),
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use sheetsync_core::config::ConfigBuilder;
/// use sheetsync_core::domain::SyncMode;
///
/// let config = ConfigBuilder::new()
///     .spreadsheet_token("shtcnExample")
///     .sheet_id("0b12")
///     .mode(SyncMode::Incremental)
///     .index_column("id")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- target ---

    pub fn spreadsheet_token(mut self, token: impl Into<String>) -> Self {
        self.config.target.spreadsheet_token = token.into();
        self
    }

    pub fn sheet_id(mut self, id: impl Into<String>) -> Self {
        self.config.target.sheet_id = id.into();
        self
    }

    pub fn start_row(mut self, row: u32) -> Self {
        self.config.target.start_row = row;
        self
    }

    pub fn start_column(mut self, column: impl Into<String>) -> Self {
        self.config.target.start_column = column.into();
        self
    }

    // --- sync ---

    pub fn mode(mut self, mode: SyncMode) -> Self {
        self.config.sync.mode = mode;
        self
    }

    pub fn index_column(mut self, column: impl Into<String>) -> Self {
        self.config.sync.index_column = Some(column.into());
        self
    }

    pub fn duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.config.sync.duplicate_keys = policy;
        self
    }

    pub fn selective_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.selective_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn auto_include_index(mut self, include: bool) -> Self {
        self.config.sync.auto_include_index = include;
        self
    }

    // --- batching ---

    pub fn row_batch_size(mut self, rows: u32) -> Self {
        self.config.batching.row_batch_size = rows;
        self
    }

    pub fn col_batch_size(mut self, cols: u32) -> Self {
        self.config.batching.col_batch_size = cols;
        self
    }

    // --- transport ---

    pub fn rate_limit_delay_ms(mut self, ms: u64) -> Self {
        self.config.transport.rate_limit_delay_ms = ms;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.transport.max_retries = n;
        self
    }

    pub fn backoff_unit_ms(mut self, ms: u64) -> Self {
        self.config.transport.backoff_unit_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.transport.request_timeout_secs = secs;
        self
    }

    // --- auth ---

    pub fn app_credentials(mut self, app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        self.config.auth.app_id = Some(app_id.into());
        self.config.auth.app_secret = Some(app_secret.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.auth.base_url = url.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn valid() -> ConfigBuilder {
        ConfigBuilder::new()
            .spreadsheet_token("shtcnTest123")
            .sheet_id("0b12ab")
    }

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.target.start_row, 1);
        assert_eq!(cfg.target.start_column, "A");
        assert_eq!(cfg.sync.mode, SyncMode::Full);
        assert!(cfg.sync.index_column.is_none());
        assert_eq!(cfg.sync.duplicate_keys, DuplicateKeyPolicy::LastWins);
        assert_eq!(cfg.batching.row_batch_size, 500);
        assert_eq!(cfg.batching.col_batch_size, 80);
        assert_eq!(cfg.transport.rate_limit_delay_ms, 50);
        assert_eq!(cfg.transport.max_retries, 3);
        assert_eq!(cfg.transport.backoff_unit_ms, 1000);
        assert_eq!(cfg.transport.request_timeout_secs, 60);
        assert_eq!(cfg.auth.base_url, "https://open.feishu.cn");
        assert!(cfg.auth.app_id.is_none());
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_only_lacks_a_target() {
        let errors = Config::default().validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["target.spreadsheet_token", "target.sheet_id"]);
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
target:
  spreadsheet_token: shtcnABC
  sheet_id: "0b12"
  start_row: 3
  start_column: C
sync:
  mode: overwrite
  index_column: order_id
  duplicate_keys: first_wins
batching:
  row_batch_size: 200
  col_batch_size: 20
transport:
  rate_limit_delay_ms: 100
  max_retries: 5
  backoff_unit_ms: 250
  request_timeout_secs: 30
auth:
  app_id: cli_a1b2
  app_secret: s3cret
  base_url: https://open.larksuite.com
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.target.spreadsheet_token, "shtcnABC");
        assert_eq!(cfg.target.sheet_id, "0b12");
        assert_eq!(cfg.target.origin().unwrap(), CellRef { row: 3, col: 3 });
        assert_eq!(cfg.sync.mode, SyncMode::Overwrite);
        assert_eq!(cfg.sync.index_column.as_deref(), Some("order_id"));
        assert_eq!(cfg.sync.duplicate_keys, DuplicateKeyPolicy::FirstWins);
        assert_eq!(cfg.batching.row_batch_size, 200);
        assert_eq!(cfg.batching.col_batch_size, 20);
        assert_eq!(cfg.transport.rate_limit_delay_ms, 100);
        assert_eq!(cfg.transport.max_retries, 5);
        assert_eq!(cfg.transport.backoff_unit_ms, 250);
        assert_eq!(cfg.transport.request_timeout_secs, 30);
        assert_eq!(cfg.auth.app_id.as_deref(), Some("cli_a1b2"));
        assert_eq!(cfg.auth.base_url, "https://open.larksuite.com");
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "target:\n  spreadsheet_token: shtcnABC\n  sheet_id: s1\n";
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(yaml.as_bytes()).unwrap();

        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.batching.row_batch_size, 500);
        assert_eq!(cfg.target.start_column, "A");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.batching.col_batch_size, 80);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"sync: [unclosed").unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_unknown_mode() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"sync:\n  mode: mirror\n").unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn yaml_round_trip() {
        let cfg = valid().index_column("id").build();
        let yaml = cfg.to_yaml().unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.target.spreadsheet_token, "shtcnTest123");
        assert_eq!(back.sync.index_column.as_deref(), Some("id"));
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_batch_sizes() {
        let cfg = valid().row_batch_size(0).col_batch_size(0).build();
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"batching.row_batch_size".to_string()));
        assert!(fields.contains(&"batching.col_batch_size".to_string()));
    }

    #[test]
    fn validate_rejects_selective_clone() {
        let cfg = valid()
            .mode(SyncMode::Clone)
            .selective_columns(["id", "qty"])
            .build();
        let errors = cfg.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sync.selective_columns");
        assert!(errors[0].message.contains("clone"));
    }

    #[test]
    fn validate_catches_bad_selective_columns() {
        let cfg = valid().selective_columns(["id", " ", "qty", "id"]).build();
        let messages: Vec<_> = cfg.validate().into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec!["column names must not be blank", "duplicate columns: id"]
        );
    }

    #[test]
    fn selective_columns_load_from_yaml() {
        let cfg: Config = serde_yaml::from_str(
            "sync:\n  mode: full\n  selective_columns: [price]\n  auto_include_index: false\n",
        )
        .unwrap();
        assert_eq!(cfg.sync.selective_columns, vec!["price"]);
        assert!(!cfg.sync.auto_include_index);
        assert!(Config::default().sync.auto_include_index);
    }

    #[test]
    fn validate_catches_oversized_batch_sizes() {
        let cfg = valid().row_batch_size(u32::MAX).col_batch_size(u32::MAX).build();
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["batching.row_batch_size", "batching.col_batch_size"]);
    }

    #[test]
    fn validate_catches_bad_origin() {
        let cfg = valid().start_row(0).start_column("A1").build();
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["target.start_row", "target.start_column"]);
    }

    #[test]
    fn validate_catches_zero_backoff_and_timeout() {
        let cfg = valid().backoff_unit_ms(0).request_timeout_secs(0).build();
        assert_eq!(cfg.validate().len(), 2);
    }

    #[test]
    fn validate_accepts_zero_rate_limit_delay() {
        let cfg = valid().rate_limit_delay_ms(0).max_retries(0).build();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_catches_blank_index_column() {
        let cfg = valid().index_column("  ").build();
        assert_eq!(cfg.validate()[0].field, "sync.index_column");
    }

    #[test]
    fn validate_catches_bad_base_url() {
        let cfg = valid().base_url("not a url").build();
        assert_eq!(cfg.validate()[0].field, "auth.base_url");
        let cfg = valid().base_url("ftp://open.feishu.cn").build();
        assert_eq!(cfg.validate()[0].field, "auth.base_url");
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let cfg = valid().logging_level("verbose").build();
        let errors = cfg.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "logging.level");
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            assert!(valid().logging_level(*level).build().validate().is_empty());
        }
    }

    // -- Builder --

    #[test]
    fn builder_overrides_fields() {
        let cfg = valid()
            .mode(SyncMode::Clone)
            .duplicate_keys(DuplicateKeyPolicy::FirstWins)
            .app_credentials("id", "secret")
            .build();
        assert_eq!(cfg.sync.mode, SyncMode::Clone);
        assert_eq!(cfg.sync.duplicate_keys, DuplicateKeyPolicy::FirstWins);
        assert_eq!(cfg.auth.app_secret.as_deref(), Some("secret"));
    }

    #[test]
    fn builder_build_validated() {
        assert!(valid().build_validated().is_ok());
        let errors = ConfigBuilder::new().build_validated().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn default_path_ends_with_config_yaml() {
        let path = Config::default_path();
        assert!(path.ends_with("sheetsync/config.yaml"));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "batching.row_batch_size".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(err.to_string(), "batching.row_batch_size: must be greater than 0");
    }
}
