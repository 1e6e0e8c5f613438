//! Config command - View and manage sheetsync configuration
//!
//! Provides the `sheetsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Writes a commented sample file to start from

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use sheetsync_core::config::Config;

use crate::output::{get_formatter, plural, OutputFormat};

/// Starting point written by `config init`
const SAMPLE_CONFIG: &str = r#"# sheetsync configuration
target:
  spreadsheet_token: "shtcnReplaceMe"
  sheet_id: "0b1234"
  start_row: 1
  start_column: "A"

sync:
  # full | incremental | overwrite | clone
  mode: full
  index_column: "id"
  # last_wins | first_wins
  duplicate_keys: last_wins
  # write only these local columns; empty writes all of them
  selective_columns: []
  auto_include_index: true

batching:
  row_batch_size: 500
  col_batch_size: 80

transport:
  rate_limit_delay_ms: 50
  max_retries: 3
  backoff_unit_ms: 1000
  request_timeout_secs: 60

auth:
  app_id: "cli_replace_me"
  app_secret: "replace-me"
  base_url: "https://open.feishu.cn"

logging:
  level: info
"#;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "batching.row_batch_size")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Write a sample configuration file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Set { key, value } => execute_set(config_path, key, value, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
            ConfigCommand::Init { force } => execute_init(config_path, *force, format),
        }
    }
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let mut config = Config::load_or_default(config_path);
    if config.auth.app_secret.is_some() {
        config.auth.app_secret = Some("********".to_string());
    }

    info!(config_path = %config_path.display(), "Showing configuration");

    if format == OutputFormat::Json {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        formatter.info("");
        for line in config.to_yaml()?.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_set(config_path: &Path, key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let mut config = Config::load_or_default(config_path);

    info!(key, "Setting configuration value");
    apply_config_value(&mut config, key, value)?;

    // Only errors about the changed field block the write; the file may still be incomplete
    let section_errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|e| e.field == key)
        .map(|e| e.to_string())
        .collect();
    if !section_errors.is_empty() {
        bail!("Invalid value for '{key}': {}", section_errors.join("; "));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    std::fs::write(config_path, config.to_yaml()?).context("Failed to write configuration file")?;

    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {key}"));
        formatter.info(&format!("Saved to {}", config_path.display()));
    }
    Ok(())
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if !config_path.exists() {
        bail!(
            "Configuration file not found at {}; run 'sheetsync config init' to create one",
            config_path.display()
        );
    }
    let config = Config::load(config_path)?;

    info!(config_path = %config_path.display(), "Validating configuration");
    let errors = config.validate();

    if format == OutputFormat::Json {
        let error_strings: Vec<String> = errors.iter().map(ToString::to_string).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!("Configuration has {}:", plural(errors.len(), "error")));
        formatter.info(&format!("File: {}", config_path.display()));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Configuration is invalid")
    }
}

fn execute_init(config_path: &Path, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    if config_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to replace it",
            config_path.display()
        );
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    std::fs::write(config_path, SAMPLE_CONFIG).context("Failed to write configuration file")?;

    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Wrote sample configuration to {}", config_path.display()));
        formatter.info("Fill in target and auth, then run 'sheetsync config validate'");
    }
    Ok(())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("Expected a non-negative integer for {key}"))
}

fn boolean(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => bail!("Expected true or false for {key}"),
    }
}

/// Comma-separated names; empty or `none` clears the list
fn list(value: &str) -> Vec<String> {
    if value.trim().is_empty() || value == "none" {
        return Vec::new();
    }
    value.split(',').map(|s| s.trim().to_string()).collect()
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// Supported keys are every leaf of the configuration file, e.g.
/// `target.sheet_id`, `sync.mode`, `sync.selective_columns`, `batching.row_batch_size`,
/// `transport.max_retries`, `auth.app_id`, `logging.level`.
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- target ---
        "target.spreadsheet_token" => config.target.spreadsheet_token = value.to_string(),
        "target.sheet_id" => config.target.sheet_id = value.to_string(),
        "target.start_row" => config.target.start_row = parse(key, value)?,
        "target.start_column" => config.target.start_column = value.to_ascii_uppercase(),

        // --- sync ---
        "sync.mode" => config.sync.mode = value.parse()?,
        "sync.index_column" => config.sync.index_column = optional(value),
        "sync.duplicate_keys" => {
            config.sync.duplicate_keys = serde_yaml::from_str(value)
                .with_context(|| format!("Expected last_wins or first_wins for {key}"))?;
        }
        "sync.selective_columns" => config.sync.selective_columns = list(value),
        "sync.auto_include_index" => config.sync.auto_include_index = boolean(key, value)?,

        // --- batching ---
        "batching.row_batch_size" => config.batching.row_batch_size = parse(key, value)?,
        "batching.col_batch_size" => config.batching.col_batch_size = parse(key, value)?,

        // --- transport ---
        "transport.rate_limit_delay_ms" => config.transport.rate_limit_delay_ms = parse(key, value)?,
        "transport.max_retries" => config.transport.max_retries = parse(key, value)?,
        "transport.backoff_unit_ms" => config.transport.backoff_unit_ms = parse(key, value)?,
        "transport.request_timeout_secs" => {
            config.transport.request_timeout_secs = parse(key, value)?;
        }

        // --- auth ---
        "auth.app_id" => config.auth.app_id = optional(value),
        "auth.app_secret" => config.auth.app_secret = optional(value),
        "auth.base_url" => config.auth.base_url = value.to_string(),

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),

        _ => bail!("Unknown configuration key: '{key}'"),
    }
    Ok(())
}
