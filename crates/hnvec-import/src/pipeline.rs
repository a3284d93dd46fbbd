//! Import orchestrator
//!
//! One run walks a fixed sequence and never goes back:
//!
//! 1. return immediately when the import is disabled
//! 2. wait for the documents table ([`wait_for_schema`])
//! 3. skip everything when documents already exist (if configured)
//! 4. make sure the dataset file is local ([`DatasetFetcher::ensure_local`])
//! 5. decode the file chunk by chunk and write it ([`BatchWriter`])
//!
//! Decoding blocks on file I/O, so every chunk is pulled on the blocking pool.
//! Reads and writes alternate on a single task, which keeps inserts in scan
//! order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{ImportConfig, PROGRESS_LOG_EVERY, SCHEMA_POLL_INTERVAL};
use crate::decoder::{open_decoder, DatasetFormat, RecordDecoder};
use crate::download::DatasetFetcher;
use crate::error::{ImportError, Result};
use crate::models::{DecodedChunk, ImportOutcome, ImportSummary, NewDocument};
use crate::readiness::wait_for_schema;
use crate::storage::DocumentStore;
use crate::writer::BatchWriter;

/// Runs dataset imports against a document store
pub struct ImportService {
    store: Arc<dyn DocumentStore>,
    config: ImportConfig,
    fetcher: DatasetFetcher,
    poll_interval: Duration,
}

impl ImportService {
    pub fn new(store: Arc<dyn DocumentStore>, config: ImportConfig, fetcher: DatasetFetcher) -> Self {
        Self {
            store,
            config: config.normalized(),
            fetcher,
            poll_interval: SCHEMA_POLL_INTERVAL,
        }
    }

    /// Override how often the readiness gate polls
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Execute one import run.
    ///
    /// Returns [`ImportError::Cancelled`] when `cancel` fires before the run
    /// finishes; batches written up to that point stay in the store.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ImportSummary> {
        if !self.config.enabled {
            info!("Dataset import disabled");
            return Ok(ImportSummary::disabled());
        }

        let start_time = Instant::now();

        // Step 1: Wait for migrations to create the documents table
        let existing = wait_for_schema(self.store.as_ref(), cancel, self.poll_interval).await?;

        // Step 2: Leave populated stores alone
        if self.config.skip_if_data_exists && existing > 0 {
            info!(documents = existing, "Documents already present, skipping dataset import");
            return Ok(ImportSummary::skipped(existing));
        }

        // Step 3: Resolve the format before touching the network
        let format = DatasetFormat::from_path(&self.config.local_path)?;
        let path = self
            .fetcher
            .ensure_local(&self.config.dataset_url, &self.config.local_path, cancel)
            .await?;

        // Step 4: Decode and write
        let (scanned, inserted) = self.import_file(format, path, cancel).await?;

        info!(
            rows_scanned = scanned,
            rows_inserted = inserted,
            duration_secs = start_time.elapsed().as_secs_f64(),
            "Dataset import completed"
        );

        Ok(ImportSummary {
            scanned,
            inserted,
            outcome: ImportOutcome::Imported,
        })
    }

    async fn import_file(
        &self,
        format: DatasetFormat,
        path: PathBuf,
        cancel: &CancellationToken,
    ) -> Result<(u64, u64)> {
        let row_limit = self.config.row_limit;
        let read_batch_size = self.config.read_batch_size;
        let open_path = path.clone();
        let mut decoder = tokio::task::spawn_blocking(move || {
            open_decoder(format, &open_path, row_limit, read_batch_size)
        })
        .await
        .map_err(|e| ImportError::Internal(format!("open decoder task failed: {e}")))??;

        let limit = decoder.limit();
        info!(path = %path.display(), ?format, limit, "Starting dataset import");

        let mut writer = BatchWriter::new(self.store.clone(), self.config.write_batch_size);
        let mut scanned = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }

            let (returned, next) = next_chunk_blocking(decoder, cancel.clone()).await?;
            decoder = returned;
            let Some(chunk) = next? else {
                break;
            };

            let previous = scanned;
            scanned += chunk.scanned;
            writer
                .push(chunk.records.into_iter().map(NewDocument::from), cancel)
                .await?;

            if crossed_progress_mark(previous, scanned) {
                info!(
                    rows_scanned = scanned,
                    rows_inserted = writer.inserted(),
                    limit,
                    "Dataset import progress"
                );
            }
        }

        writer.finish(cancel).await?;
        Ok((scanned, writer.inserted()))
    }
}

type BlockingChunk = (Box<dyn RecordDecoder>, Result<Option<DecodedChunk>>);

/// Pull one chunk on the blocking pool, handing the decoder back afterwards.
async fn next_chunk_blocking(
    mut decoder: Box<dyn RecordDecoder>,
    cancel: CancellationToken,
) -> Result<BlockingChunk> {
    tokio::task::spawn_blocking(move || {
        let next = decoder.next_chunk(&cancel);
        (decoder, next)
    })
    .await
    .map_err(|e| ImportError::Internal(format!("decode task failed: {e}")))
}

fn crossed_progress_mark(previous: u64, scanned: u64) -> bool {
    scanned / PROGRESS_LOG_EVERY > previous / PROGRESS_LOG_EVERY
}
