//! Config command - View and manage drivesync configuration
//!
//! Provides the `drivesync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use drivesync_core::config::{Config, ConfigBuilder};
use tracing::info;

use super::{exit_code, RunContext};

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("pull.root", "Local mirror directory"),
    ("pull.max_concurrent", "Changes applied per batch"),
    ("pull.task_timeout_secs", "Per-change timeout in seconds (0 = none)"),
    ("pull.fail_fast", "Stop after the first failing batch (true|false)"),
    ("pull.no_prompt", "Apply without confirmation (true|false)"),
    ("remote.base_url", "Drive API base URL"),
    ("remote.access_token", "Bearer token (\"none\" to clear)"),
    ("logging.level", "trace|debug|info|warn|error"),
];

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "pull.max_concurrent")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &RunContext) -> Result<ExitCode> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Set { key, value } => execute_set(ctx, key, value).map(exit_code),
            ConfigCommand::Validate => execute_validate(ctx).map(exit_code),
        }
    }
}

fn execute_show(ctx: &RunContext) -> Result<ExitCode> {
    let formatter = ctx.formatter();
    let config = Config::load_or_default(&ctx.config_path);

    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.is_json() {
        let json = serde_json::to_value(redacted(&config))
            .context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        formatter.info("");

        let yaml = serde_yaml::to_string(&redacted(&config))
            .context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Returns `false` when the key or value was rejected
fn execute_set(ctx: &RunContext, key: &str, value: &str) -> Result<bool> {
    let formatter = ctx.formatter();
    let config_path = &ctx.config_path;
    let config = Config::load_or_default(config_path);

    info!(key = %key, "Setting configuration value");

    let builder = match apply_config_value(config, key, value) {
        Ok(builder) => builder,
        Err(e) => {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{key}': {e}"));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, description) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<24} - {description}"));
                }
            }
            return Ok(false);
        }
    };

    // Validate the new config before saving
    let config = match builder.build_validated() {
        Ok(config) => config,
        Err(errors) => {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "errors": messages,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{key}': {}", messages.join("; ")));
            }
            return Ok(false);
        }
    };

    save(&config, config_path)?;

    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {key}"));
        formatter.info(&format!("Saved to {}", config_path.display()));
    }

    Ok(true)
}

/// Returns `false` when the file does not parse or does not validate
fn execute_validate(ctx: &RunContext) -> Result<bool> {
    let formatter = ctx.formatter();
    let config_path = &ctx.config_path;

    if !config_path.exists() {
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "errors": [],
                "defaults": true,
            }));
        } else {
            formatter.info(&format!(
                "Configuration file not found at {}",
                config_path.display()
            ));
            formatter.info(
                "Using default configuration. Run 'drivesync config set <key> <value>' to create one.",
            );
        }
        return Ok(true);
    }

    let config = match Config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [format!("Failed to parse configuration: {e}")],
                    }));
                } else {
                    formatter.error(&format!("Failed to parse configuration: {e}"));
                    formatter.info(&format!("File: {}", config_path.display()));
                }
                return Ok(false);
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");

    let errors = config.validate();

    if ctx.is_json() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": messages,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(errors.is_empty())
}

/// Copy of `config` safe to print: the access token is masked
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.remote.access_token.is_some() {
        shown.remote.access_token = Some("********".to_string());
    }
    shown
}

fn save(config: &Config, path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")?;
    Ok(())
}

/// Apply a dot-notation key/value pair on top of `config`
fn apply_config_value(config: Config, key: &str, value: &str) -> Result<ConfigBuilder> {
    let builder = ConfigBuilder::from(config);
    let builder = match key {
        // --- pull ---
        "pull.root" => builder.pull_root(PathBuf::from(value)),
        "pull.max_concurrent" => builder.pull_max_concurrent(
            value
                .parse::<usize>()
                .context("Expected a positive integer for pull.max_concurrent")?,
        ),
        "pull.task_timeout_secs" => builder.pull_task_timeout_secs(
            value
                .parse::<u64>()
                .context("Expected a non-negative integer for pull.task_timeout_secs")?,
        ),
        "pull.fail_fast" => builder.pull_fail_fast(
            value
                .parse::<bool>()
                .context("Expected true or false for pull.fail_fast")?,
        ),
        "pull.no_prompt" => builder.pull_no_prompt(
            value
                .parse::<bool>()
                .context("Expected true or false for pull.no_prompt")?,
        ),

        // --- remote ---
        "remote.base_url" => builder.remote_base_url(value),
        "remote.access_token" => builder.remote_access_token(
            (!value.is_empty() && value != "none").then(|| value.to_string()),
        ),

        // --- logging ---
        "logging.level" => builder.logging_level(value),

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    };

    Ok(builder)
}
