//! Dedup gate configuration
//!
//! Load order (later sources override earlier ones):
//! 1. Built-in defaults
//! 2. Optional TOML file
//! 3. `DEDUP_*` environment variables (a `.env` file is read first if present)

use crate::error::{DedupError, DedupResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "DEDUP";

/// How the existence check and the mark are issued against the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkStrategy {
    /// `EXISTS` then `SETEX`. Two concurrent callers can both see the key
    /// absent and both report the event as new.
    #[default]
    CheckThenMark,
    /// Single `SET NX EX`; exactly one caller wins per key and TTL period.
    Atomic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    #[serde(default)]
    pub strategy: MarkStrategy,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_command_timeout_ms() -> u64 {
    500
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            strategy: MarkStrategy::default(),
        }
    }
}

impl DedupConfig {
    /// Load from `DEDUP_*` environment variables over defaults
    pub fn from_env() -> DedupResult<Self> {
        Self::load(None)
    }

    /// Load from an optional TOML file, then environment overrides
    pub fn load(config_path: Option<&Path>) -> DedupResult<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        Self::finish(builder)
    }

    /// Load from a TOML file over defaults, ignoring the environment
    pub fn from_file(path: &Path) -> DedupResult<Self> {
        let builder = config::Config::builder().add_source(config::File::from(path));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> DedupResult<Self> {
        let settings = builder
            .build()
            .map_err(|e| DedupError::Configuration(format!("Failed to load configuration: {}", e)))?;

        let config: DedupConfig = settings.try_deserialize().map_err(|e| {
            DedupError::Configuration(format!("Failed to deserialize configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DedupResult<()> {
        if self.redis_url.trim().is_empty() {
            return Err(DedupError::Configuration(
                "redis_url cannot be empty".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(DedupError::Configuration(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.command_timeout_ms == 0 {
            return Err(DedupError::Configuration(
                "command_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = DedupConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy, MarkStrategy::CheckThenMark);
        assert_eq!(config.command_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_from_file_reads_toml_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
redis_url = "redis://cache.internal:6380/2"
command_timeout_ms = 250
strategy = "atomic"
"#
        )
        .unwrap();

        let config = DedupConfig::from_file(file.path()).unwrap();
        assert_eq!(config.redis_url, "redis://cache.internal:6380/2");
        assert_eq!(config.command_timeout_ms, 250);
        assert_eq!(config.connect_timeout_ms, 2_000);
        assert_eq!(config.strategy, MarkStrategy::Atomic);
    }

    #[test]
    fn test_from_file_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("dedup.toml");

        assert!(matches!(
            DedupConfig::from_file(&missing),
            Err(DedupError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_file_validates_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "command_timeout_ms = 0").unwrap();

        assert!(matches!(
            DedupConfig::from_file(file.path()),
            Err(DedupError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let config = DedupConfig {
            command_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DedupError::Configuration(_))
        ));

        let config = DedupConfig {
            redis_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
