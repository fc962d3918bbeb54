//! Config command - view, edit, and validate the engine's YAML
//! configuration. Grounded on the donor workspace's
//! `lnxdrive-cli::commands::config`, trimmed to the much smaller
//! `sync`/`disallowed_paths` schema this engine actually has.

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;
use vaultsync_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the current configuration.
    Show,
    /// Set a configuration value by dot-notation key.
    Set {
        /// e.g. `sync.debounce_ms`, `sync.max_diff_file_bytes`
        key: String,
        value: String,
    },
    /// Parse the configuration file and report errors.
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => show(format),
            ConfigCommand::Set { key, value } => set(key, value, format),
            ConfigCommand::Validate => validate(format),
        }
    }
}

fn show(format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(matches!(format, OutputFormat::Json));
    let path = Config::default_path();
    let config = Config::load_or_default(&path);
    info!(config_path = %path.display(), "showing configuration");

    if matches!(format, OutputFormat::Json) {
        let json = serde_json::to_value(&config).context("failed to serialize configuration")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", path.display()));
        formatter.info("");
        for line in config.to_yaml()?.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn set(key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(matches!(format, OutputFormat::Json));
    let path = Config::default_path();
    let mut config = Config::load_or_default(&path);
    info!(key = %key, value = %value, "setting configuration value");

    match apply(&mut config, key, value) {
        Ok(()) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("failed to create config directory")?;
            }
            std::fs::write(&path, config.to_yaml()?).context("failed to write configuration file")?;
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({"success": true, "key": key, "value": value}));
            } else {
                formatter.success(&format!("Set {key} = {value}"));
            }
            Ok(())
        }
        Err(err) => {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({"success": false, "key": key, "error": err.to_string()}));
            } else {
                formatter.error(&format!("Failed to set '{key}': {err}"));
                formatter.info("Supported keys: sync.debounce_ms, sync.max_diff_file_bytes");
            }
            Ok(())
        }
    }
}

fn validate(format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(matches!(format, OutputFormat::Json));
    let path = Config::default_path();

    if !path.exists() {
        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({"valid": true, "note": "no config file, defaults apply"}));
        } else {
            formatter.info(&format!("No configuration file at {}; using defaults.", path.display()));
        }
        return Ok(());
    }

    match Config::load(&path) {
        Ok(_) => {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({"valid": true}));
            } else {
                formatter.success("Configuration is valid");
            }
        }
        Err(err) => {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({"valid": false, "error": err.to_string()}));
            } else {
                formatter.error(&err.to_string());
            }
        }
    }
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "sync.debounce_ms" => {
            config.sync.debounce_ms = value.parse().context("expected a positive integer")?;
        }
        "sync.max_diff_file_bytes" => {
            config.sync.max_diff_file_bytes = value.parse().context("expected a positive integer")?;
        }
        _ => anyhow::bail!("unknown configuration key: '{key}'"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_debounce_ms() {
        let mut config = Config::default();
        apply(&mut config, "sync.debounce_ms", "750").unwrap();
        assert_eq!(config.sync.debounce_ms, 750);
    }

    #[test]
    fn rejects_unknown_key() {
        let mut config = Config::default();
        assert!(apply(&mut config, "nope", "1").is_err());
    }

    #[test]
    fn rejects_non_integer_value() {
        let mut config = Config::default();
        assert!(apply(&mut config, "sync.debounce_ms", "soon").is_err());
    }
}
