//! Destination readiness gate
//!
//! Schema migrations may still be running when the import starts. Until the
//! documents table exists the count query fails with `undefined_table`; that
//! condition is polled through, every other failure is returned.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{ImportError, Result};
use crate::storage::DocumentStore;

/// Poll `store.count()` every `interval` until it succeeds.
///
/// Returns the document count observed once the table is available.
pub async fn wait_for_schema(
    store: &dyn DocumentStore,
    cancel: &CancellationToken,
    interval: Duration,
) -> Result<u64> {
    let mut waiting = false;

    loop {
        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ImportError::Cancelled),
            result = store.count() => result,
        };

        match attempt {
            Ok(count) => {
                if waiting {
                    info!(documents = count, "Documents table detected, continuing");
                }
                return Ok(count);
            },
            Err(e) if e.is_undefined_table() => {
                if !waiting {
                    waiting = true;
                    info!(
                        interval_ms = interval.as_millis() as u64,
                        "Waiting for migrations, documents table not found"
                    );
                }
            },
            Err(e) => return Err(ImportError::Store(e)),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ImportError::Cancelled),
            _ = tokio::time::sleep(interval) => {},
        }
    }
}
