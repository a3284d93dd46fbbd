//! Write-side batching
//!
//! Read chunks and write batches are sized independently: documents are
//! buffered across read chunks and flushed in `write_batch_size` batches, each
//! sent to the store as its own statement. Only the final batch of a run may
//! be short. Batches are never retried or re-split.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ImportError, Result};
use crate::models::NewDocument;
use crate::storage::DocumentStore;

/// Accumulates documents and flushes them to a [`DocumentStore`] in order.
pub struct BatchWriter {
    store: Arc<dyn DocumentStore>,
    write_batch_size: usize,
    pending: Vec<NewDocument>,
    inserted: u64,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn DocumentStore>, write_batch_size: u64) -> Self {
        let write_batch_size = usize::try_from(write_batch_size.max(1)).unwrap_or(usize::MAX);
        Self {
            store,
            write_batch_size,
            pending: Vec::new(),
            inserted: 0,
        }
    }

    /// Rows accepted by the store so far
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    /// Documents buffered but not yet flushed
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Buffer `docs`, flushing every full batch. Returns rows inserted by this call.
    pub async fn push<I>(&mut self, docs: I, cancel: &CancellationToken) -> Result<u64>
    where
        I: IntoIterator<Item = NewDocument>,
    {
        self.pending.extend(docs);

        let mut inserted = 0;
        while self.pending.len() >= self.write_batch_size {
            let rest = self.pending.split_off(self.write_batch_size);
            let batch = std::mem::replace(&mut self.pending, rest);
            inserted += self.flush(&batch, cancel).await?;
        }
        Ok(inserted)
    }

    /// Flush the remaining short batch, if any. Returns rows inserted by this call.
    pub async fn finish(&mut self, cancel: &CancellationToken) -> Result<u64> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::take(&mut self.pending);
        self.flush(&batch, cancel).await
    }

    /// A batch in flight always runs to completion; cancellation is only
    /// observed before it starts.
    async fn flush(&mut self, batch: &[NewDocument], cancel: &CancellationToken) -> Result<u64> {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        let written = self
            .store
            .create_batch(batch)
            .await
            .map_err(ImportError::Write)?;

        debug!(batch_size = batch.len(), written, "Flushed write batch");
        self.inserted += written;
        Ok(written)
    }
}
