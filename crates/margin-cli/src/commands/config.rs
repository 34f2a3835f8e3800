//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use margin_core::Config;

use crate::output::Output;

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let effective_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    output.print_config(&config, &effective_path)
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "editable" => {
            config.capabilities.editable = parse_bool(key, value)?;
        }
        "search_integration" => {
            config.capabilities.search_integration = parse_bool(key, value)?;
        }
        "gated_by_feature_flag" => {
            config.capabilities.gated_by_feature_flag = parse_bool(key, value)?;
        }
        "location_id" => {
            config.location_id = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: editable, search_integration, gated_by_feature_flag, location_id, log_file",
                key
            );
        }
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .with_context(|| format!("Invalid value for {}. Use 'true' or 'false'.", key))
}
