//! In-process document store

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use super::{DocumentStore, StoreError};
use crate::models::NewDocument;

/// Keeps every written batch in memory, in write order.
///
/// Used by `--dry-run` to exercise decoding and batching without a database.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    batches: Mutex<Vec<Vec<NewDocument>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes of the batches received so far
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().iter().map(Vec::len).collect()
    }

    /// All stored documents in insertion order
    pub fn documents(&self) -> Vec<NewDocument> {
        self.lock().iter().flatten().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<NewDocument>>> {
        // Batches are pushed whole, so a poisoned lock still holds consistent data
        self.batches.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_batch(&self, docs: &[NewDocument]) -> Result<u64, StoreError> {
        if docs.is_empty() {
            return Ok(0);
        }
        self.lock().push(docs.to_vec());
        Ok(docs.len() as u64)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.lock().iter().map(|b| b.len() as u64).sum())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(hn_id: i64) -> NewDocument {
        NewDocument {
            hn_id,
            title: format!("story {hn_id}"),
            url: String::new(),
            by: "pg".into(),
            score: 1,
            time: Utc::now(),
            text: String::new(),
            embedding: vec![0.0; 3],
        }
    }

    #[tokio::test]
    async fn test_batches_are_kept_in_order() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(store.create_batch(&[doc(1), doc(2)]).await.unwrap(), 2);
        assert_eq!(store.create_batch(&[]).await.unwrap(), 0);
        assert_eq!(store.create_batch(&[doc(3)]).await.unwrap(), 1);

        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.batch_sizes(), vec![2, 1]);
        let ids: Vec<i64> = store.documents().iter().map(|d| d.hn_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
