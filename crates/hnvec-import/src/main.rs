//! hnvec-import - Hacker News embedding dataset loader

use anyhow::{Context, Result};
use clap::Parser;
use hnvec_common::logging::{init_logging, LogConfig, LogLevel};
use hnvec_import::storage::connect_with_retry;
use hnvec_import::{
    start_import_worker, DatabaseConfig, DatasetFetcher, DocumentStore, ImportConfig,
    ImportService, InMemoryDocumentStore, PgDocumentStore, WorkerExit,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "hnvec-import")]
#[command(author, version, about = "Load the Hacker News MiniLM dataset into the documents table")]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Local dataset file (overrides IMPORT_LOCAL_PATH)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Maximum rows to scan (overrides IMPORT_LIMIT)
    #[arg(short, long)]
    limit: Option<u64>,

    /// Decode and batch without a database
    #[arg(long)]
    dry_run: bool,

    /// Apply schema migrations while the import waits for them
    #[arg(long, conflicts_with = "dry_run")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("hnvec-import")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let mut config = ImportConfig::from_env();
    if let Some(dataset) = cli.dataset {
        config.local_path = dataset;
    }
    if let Some(limit) = cli.limit {
        config.row_limit = limit;
    }

    info!(
        enabled = config.enabled,
        path = %config.local_path.display(),
        limit = config.row_limit,
        dry_run = cli.dry_run,
        "Starting hnvec-import"
    );

    let store: Arc<dyn DocumentStore> = if cli.dry_run {
        Arc::new(InMemoryDocumentStore::new())
    } else {
        let db_config = DatabaseConfig::from_env()?;
        let pool = connect_with_retry(&db_config)
            .await
            .context("Failed to connect to database")?;

        if cli.migrate {
            let pool = pool.clone();
            tokio::spawn(async move {
                match sqlx::migrate!("../../migrations").run(&pool).await {
                    Ok(()) => info!("Database migrations completed"),
                    Err(e) => error!(error = %e, "Failed to run migrations"),
                }
            });
        }

        Arc::new(PgDocumentStore::new(pool))
    };

    let service = Arc::new(ImportService::new(store, config, DatasetFetcher::new()?));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    match start_import_worker(service, shutdown).await {
        Ok(WorkerExit::Abandoned) => warn!("Exiting with the import run still in flight"),
        Ok(exit) => info!(?exit, "hnvec-import finished"),
        Err(e) => error!(error = %e, "Import worker task failed"),
    }

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting shutdown");
        },
    }
}
