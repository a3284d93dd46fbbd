//! Background import worker and its shutdown protocol
//!
//! The run gets its own cancellation scope, independent of the process
//! shutdown token. When shutdown is requested the worker escalates:
//!
//! 1. graceful: wait up to `graceful_timeout` for the run to finish on its own
//! 2. forced: cancel the run scope and wait up to `forced_grace`
//! 3. abandon: log and return; the run task is detached and may still be
//!    finishing in the background
//!
//! Shutdown latency is therefore bounded by `graceful_timeout + forced_grace`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::FORCED_CANCEL_GRACE;
use crate::error::Result;
use crate::models::ImportSummary;
use crate::pipeline::ImportService;

/// How the worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The run finished before shutdown was requested
    Completed,
    /// Shutdown was requested and the run finished within the graceful window
    Drained,
    /// The run stopped after its scope was cancelled
    Forced,
    /// The run ignored cancellation and was left behind
    Abandoned,
}

/// Timeouts for the shutdown escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    pub graceful_timeout: Duration,
    pub forced_grace: Duration,
}

impl ShutdownPolicy {
    pub fn new(graceful_timeout: Duration) -> Self {
        Self {
            graceful_timeout,
            forced_grace: FORCED_CANCEL_GRACE,
        }
    }
}

/// Where in the protocol a run ended
#[derive(Debug, Clone, Copy)]
enum Tier {
    Running,
    Graceful,
    Forced,
}

/// Spawn `run` on a background task supervised by the shutdown protocol.
///
/// The returned handle resolves once the worker is done with the run; it is
/// the completion signal callers should await before exiting.
pub fn spawn_worker<F, Fut>(
    shutdown: CancellationToken,
    policy: ShutdownPolicy,
    run: F,
) -> JoinHandle<WorkerExit>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<ImportSummary>> + Send + 'static,
{
    tokio::spawn(async move {
        let run_scope = CancellationToken::new();
        let mut task = tokio::spawn(run(run_scope.clone()));

        tokio::select! {
            biased;
            joined = &mut task => {
                report(Tier::Running, joined);
                return WorkerExit::Completed;
            }
            _ = shutdown.cancelled() => {}
        }

        info!(
            timeout_ms = policy.graceful_timeout.as_millis() as u64,
            "Shutdown requested, waiting for current import work"
        );
        if let Ok(joined) = tokio::time::timeout(policy.graceful_timeout, &mut task).await {
            report(Tier::Graceful, joined);
            return WorkerExit::Drained;
        }

        warn!(
            timeout_ms = policy.graceful_timeout.as_millis() as u64,
            "Graceful wait timed out, cancelling import run"
        );
        run_scope.cancel();
        if let Ok(joined) = tokio::time::timeout(policy.forced_grace, &mut task).await {
            report(Tier::Forced, joined);
            return WorkerExit::Forced;
        }

        warn!(
            grace_ms = policy.forced_grace.as_millis() as u64,
            "Import run did not stop after cancel, abandoning it"
        );
        WorkerExit::Abandoned
    })
}

/// Start `service` as the background import worker.
pub fn start_import_worker(
    service: Arc<ImportService>,
    shutdown: CancellationToken,
) -> JoinHandle<WorkerExit> {
    let policy = ShutdownPolicy::new(service.config().shutdown_timeout);
    spawn_worker(shutdown, policy, move |scope| async move {
        service.run(&scope).await
    })
}

fn report(tier: Tier, joined: std::result::Result<Result<ImportSummary>, JoinError>) {
    match joined {
        Ok(Ok(summary)) => info!(
            ?tier,
            rows_scanned = summary.scanned,
            rows_inserted = summary.inserted,
            outcome = ?summary.outcome,
            "Import worker finished"
        ),
        Ok(Err(e)) if e.is_cancelled() => warn!(?tier, "Dataset import cancelled"),
        Ok(Err(e)) => match tier {
            Tier::Running => error!(error = %e, "Dataset import failed"),
            Tier::Graceful => error!(error = %e, "Dataset import stopped with error"),
            Tier::Forced => warn!(error = %e, "Dataset import stopped after forced cancel"),
        },
        Err(e) => error!(?tier, error = %e, "Dataset import task aborted"),
    }
}
