//! Runtime configuration
//!
//! All tunables are read from the environment once at startup into a
//! [`RuntimeConfig`] that is passed down to the executor, brain and
//! runners. Nothing mutates process globals after boot.

use std::time::Duration;
use thiserror::Error;

/// Which checkpoint backend the executor persists through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointBackend {
    /// One JSON file per task under `CHECKPOINT_DIR`
    Local,
    /// The `checkpoints` table in the relational database
    Remote,
}

impl CheckpointBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "local" => Ok(CheckpointBackend::Local),
            "remote" => Ok(CheckpointBackend::Remote),
            other => Err(ConfigError::Invalid {
                key: "CHECKPOINT_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration errors raised during startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime tunables for the workflow core
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum validation rounds before the gate opens regardless
    pub max_rounds: u32,

    /// Per-task content fan-out semaphore permits
    pub content_concurrency: usize,

    /// Global cap on concurrently running tasks
    pub max_active_tasks: usize,

    /// Wall-clock budget for one unit of work
    pub uow_timeout: Duration,

    /// Soft timeout for every node except content generation
    pub node_timeout_default: Duration,

    /// Soft timeout for the content generation node
    pub node_timeout_content: Duration,

    /// Checkpoint backend selection
    pub checkpoint_backend: CheckpointBackend,

    /// Directory for the local checkpoint backend
    pub checkpoint_dir: String,

    /// SQLite connection string
    pub database_url: String,

    /// HTTP bind address
    pub host: String,
    pub port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            content_concurrency: 4,
            max_active_tasks: 8,
            uow_timeout: Duration::from_secs(30),
            node_timeout_default: Duration::from_secs(120),
            node_timeout_content: Duration::from_secs(600),
            checkpoint_backend: CheckpointBackend::Local,
            checkpoint_dir: "./checkpoints".to_string(),
            database_url: "sqlite://roadmaps.db?mode=rwc".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl RuntimeConfig {
    /// Build the configuration from environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_rounds: env_parse("MAX_ROUNDS", defaults.max_rounds)?,
            content_concurrency: env_parse("CONTENT_CONCURRENCY", defaults.content_concurrency)?,
            max_active_tasks: env_parse("MAX_ACTIVE_TASKS", defaults.max_active_tasks)?,
            uow_timeout: Duration::from_secs(env_parse("UOW_TIMEOUT_SEC", 30u64)?),
            node_timeout_default: Duration::from_secs(env_parse(
                "NODE_TIMEOUT_SEC_DEFAULT",
                120u64,
            )?),
            node_timeout_content: Duration::from_secs(env_parse(
                "NODE_TIMEOUT_SEC_CONTENT",
                600u64,
            )?),
            checkpoint_backend: match std::env::var("CHECKPOINT_BACKEND") {
                Ok(value) => CheckpointBackend::parse(&value)?,
                Err(_) => defaults.checkpoint_backend,
            },
            checkpoint_dir: std::env::var("CHECKPOINT_DIR").unwrap_or(defaults.checkpoint_dir),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT", defaults.port)?,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.max_rounds, 3);
        assert_eq!(cfg.content_concurrency, 4);
        assert_eq!(cfg.max_active_tasks, 8);
        assert_eq!(cfg.uow_timeout, Duration::from_secs(30));
        assert_eq!(cfg.node_timeout_default, Duration::from_secs(120));
        assert_eq!(cfg.node_timeout_content, Duration::from_secs(600));
        assert_eq!(cfg.checkpoint_backend, CheckpointBackend::Local);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(
            CheckpointBackend::parse("local").unwrap(),
            CheckpointBackend::Local
        );
        assert_eq!(
            CheckpointBackend::parse("remote").unwrap(),
            CheckpointBackend::Remote
        );
        assert!(CheckpointBackend::parse("s3").is_err());
    }
}
