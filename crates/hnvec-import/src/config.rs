//! Import configuration
//!
//! Values come from `IMPORT_*` and database environment variables. Numeric
//! settings that are missing, zero, negative or garbage fall back to their
//! defaults rather than failing startup.

use hnvec_common::env::{parse_bool, parse_positive};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Pipeline Constants
// ============================================================================

/// Embedding width of the `documents.embedding` column.
pub const VECTOR_DIMENSION: usize = 384;

/// One progress event per this many scanned rows.
pub const PROGRESS_LOG_EVERY: u64 = 10_000;

/// How often the readiness gate re-checks for the documents table.
pub const SCHEMA_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long a run gets to exit after its own scope is cancelled.
pub const FORCED_CANCEL_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_DATASET_URL: &str =
    "https://clickhouse-datasets.s3.amazonaws.com/hackernews-miniLM/hackernews_part_1_of_1.parquet";
pub const DEFAULT_LOCAL_PATH: &str = "/tmp/hackernews.parquet";
pub const DEFAULT_ROW_LIMIT: u64 = 200_000;
pub const DEFAULT_READ_BATCH_SIZE: u64 = 1000;
pub const DEFAULT_WRITE_BATCH_SIZE: u64 = 500;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATABASE_CONNECT_ATTEMPTS: u32 = 5;
pub const DATABASE_CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Dataset import configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub enabled: bool,
    pub dataset_url: String,
    pub local_path: PathBuf,
    /// Maximum rows scanned (not inserted) per run
    pub row_limit: u64,
    pub read_batch_size: u64,
    pub write_batch_size: u64,
    pub shutdown_timeout: Duration,
    /// Skip the whole import when the documents table already has rows
    pub skip_if_data_exists: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            local_path: PathBuf::from(DEFAULT_LOCAL_PATH),
            row_limit: DEFAULT_ROW_LIMIT,
            read_batch_size: DEFAULT_READ_BATCH_SIZE,
            write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            skip_if_data_exists: true,
        }
    }
}

impl ImportConfig {
    /// Load from the process environment (and `.env` when present)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let flag = |key: &str, default: bool| {
            text(key).and_then(|v| parse_bool(&v)).unwrap_or(default)
        };
        let positive = |key: &str, default: u64| {
            text(key).and_then(|v| parse_positive(&v)).unwrap_or(default)
        };

        Self {
            enabled: flag("IMPORT_ENABLED", false),
            dataset_url: text("IMPORT_DATASET_URL")
                .unwrap_or_else(|| DEFAULT_DATASET_URL.to_string()),
            local_path: text("IMPORT_LOCAL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_PATH)),
            row_limit: positive("IMPORT_LIMIT", DEFAULT_ROW_LIMIT),
            read_batch_size: positive("IMPORT_READ_BATCH_SIZE", DEFAULT_READ_BATCH_SIZE),
            write_batch_size: positive("IMPORT_WRITE_BATCH_SIZE", DEFAULT_WRITE_BATCH_SIZE),
            shutdown_timeout: Duration::from_secs(positive(
                "IMPORT_SHUTDOWN_TIMEOUT_SEC",
                DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            )),
            skip_if_data_exists: flag("IMPORT_SKIP_IF_DOCS_EXIST", true),
        }
    }

    /// Replace zero-valued numeric settings with their defaults.
    ///
    /// Configs built in code bypass the env parser, so the pipeline calls this
    /// before using any size or timeout.
    pub fn normalized(mut self) -> Self {
        if self.row_limit == 0 {
            self.row_limit = DEFAULT_ROW_LIMIT;
        }
        if self.read_batch_size == 0 {
            self.read_batch_size = DEFAULT_READ_BATCH_SIZE;
        }
        if self.write_batch_size == 0 {
            self.write_batch_size = DEFAULT_WRITE_BATCH_SIZE;
        }
        if self.shutdown_timeout.is_zero() {
            self.shutdown_timeout = Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS);
        }
        self
    }
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    /// Ping attempts before giving up on startup
    pub connect_attempts: u32,
}

impl DatabaseConfig {
    /// Load from `DATABASE_URL`, or compose it from `POSTGRES_*` parts
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let url = match text("DATABASE_URL") {
            Some(url) => url,
            None => {
                let parts = ["POSTGRES_HOST", "POSTGRES_PORT", "POSTGRES_USER", "POSTGRES_PASSWORD", "POSTGRES_DB"]
                    .map(|key| text(key));
                match parts {
                    [Some(host), Some(port), Some(user), Some(password), Some(db)] => {
                        format!("postgres://{user}:{password}@{host}:{port}/{db}?sslmode=disable")
                    },
                    _ => anyhow::bail!(
                        "Database is not configured: set DATABASE_URL or all of POSTGRES_HOST, POSTGRES_PORT, POSTGRES_USER, POSTGRES_PASSWORD, POSTGRES_DB"
                    ),
                }
            },
        };

        let positive = |key: &str, default: u64| {
            text(key).and_then(|v| parse_positive(&v)).unwrap_or(default)
        };

        Ok(Self {
            url,
            max_connections: u32::try_from(positive(
                "DATABASE_MAX_CONNECTIONS",
                u64::from(DEFAULT_DATABASE_MAX_CONNECTIONS),
            ))
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            connect_timeout_secs: positive(
                "DATABASE_CONNECT_TIMEOUT",
                DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            ),
            connect_attempts: u32::try_from(positive(
                "DATABASE_CONNECT_ATTEMPTS",
                u64::from(DEFAULT_DATABASE_CONNECT_ATTEMPTS),
            ))
            .unwrap_or(DEFAULT_DATABASE_CONNECT_ATTEMPTS),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
