use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::{CommandSpec, Config};

/// Directory holding project configuration, relative to the working directory.
pub const CONFIG_DIR: &str = ".testshift";

/// Prefix of environment overrides, e.g. `TESTSHIFT_MIGRATION__MAX_RETRIES`.
pub const ENV_PREFIX: &str = "TESTSHIFT_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: 0. Must be at least 1")]
    ZeroLimit { field: &'static str },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Command for {0} has an empty program")]
    EmptyCommand(&'static str),

    #[error("Invalid scratch_dir: {0:?}. Must be a single non-empty directory name")]
    InvalidScratchDir(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .testshift/config.yaml (project config)
    /// 3. .testshift/local.yaml (project local overrides, optional)
    /// 4. Environment variables (TESTSHIFT_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(Path::new("."))
    }

    /// Same as [`ConfigLoader::load`] with `root` in place of the working directory.
    pub fn load_from_dir(root: &Path) -> Result<Config> {
        let dir = root.join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let migration = &config.migration;
        if migration.max_retries == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_retries",
            });
        }
        if migration.per_error_attempts == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "per_error_attempts",
            });
        }
        if migration.max_total_attempts == Some(0) {
            return Err(ConfigError::ZeroLimit {
                field: "max_total_attempts",
            });
        }
        if migration.concurrency == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "concurrency",
            });
        }

        let scratch = migration.scratch_dir.as_str();
        if scratch.is_empty() || scratch == "." || scratch == ".." || scratch.contains(['/', '\\']) {
            return Err(ConfigError::InvalidScratchDir(scratch.to_string()));
        }

        let commands: [(&'static str, Option<&CommandSpec>); 4] = [
            ("execution", Some(&config.commands.execution)),
            ("type_check", Some(&config.commands.type_check)),
            ("lint", Some(&config.commands.lint)),
            ("lint_fix", config.commands.lint_fix.as_ref()),
        ];
        for (name, spec) in commands {
            if spec.is_some_and(|s| s.program.trim().is_empty()) {
                return Err(ConfigError::EmptyCommand(name));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        if config.generator.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "generator.base_url cannot be empty".to_string(),
            ));
        }
        if config.generator.timeout_secs == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "generator.timeout_secs",
            });
        }

        Ok(())
    }
}
