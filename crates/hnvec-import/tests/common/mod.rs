//! Shared fixtures for hnvec-import integration tests
//!
//! - [`ScriptedStore`]: a document store with scripted `count` answers and an
//!   optional failing batch
//! - CSV and Parquet dataset writers
//! - [`import_config`]: an enabled config pointing at a fixture file

#![allow(dead_code)]

use arrow_array::builder::{Float32Builder, ListBuilder};
use arrow_array::{ArrayRef, Int32Array, RecordBatch, StringArray};
use arrow_schema::{Field, Schema};
use async_trait::async_trait;
use hnvec_import::{DocumentStore, ImportConfig, InMemoryDocumentStore, NewDocument, StoreError};
use parquet::arrow::ArrowWriter;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DIM: usize = hnvec_import::VECTOR_DIMENSION;

pub const CSV_HEADER: &str = "doc_id,title,by,post_score,time,text,vector";

// ============================================================================
// Scripted Store
// ============================================================================

/// Error shaped like Postgres' answer before migrations ran
pub fn undefined_table() -> StoreError {
    StoreError::Backend(r#"ERROR: relation "documents" does not exist (SQLSTATE 42P01)"#.into())
}

/// In-memory store whose `count` answers can be scripted.
///
/// Scripted answers are consumed in order; afterwards `count` reports the
/// preset `existing` documents plus everything written.
#[derive(Default)]
pub struct ScriptedStore {
    counts: Mutex<VecDeque<Result<u64, StoreError>>>,
    existing: u64,
    fail_batch: Option<usize>,
    written: InMemoryDocumentStore,
    count_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counts(self, answers: Vec<Result<u64, StoreError>>) -> Self {
        *self.counts.lock().unwrap() = answers.into();
        self
    }

    /// Pretend the table already holds `n` documents
    pub fn with_existing(mut self, n: u64) -> Self {
        self.existing = n;
        self
    }

    /// Fail the `n`-th `create_batch` call (1-based)
    pub fn failing_batch(mut self, n: usize) -> Self {
        self.fail_batch = Some(n);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.written.batch_sizes()
    }

    pub fn documents(&self) -> Vec<NewDocument> {
        self.written.documents()
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn create_batch(&self, docs: &[NewDocument]) -> Result<u64, StoreError> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_batch == Some(call) {
            return Err(StoreError::Backend("insert batch documents: connection reset".into()));
        }
        self.written.create_batch(docs).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(answer) = self.counts.lock().unwrap().pop_front() {
            return answer;
        }
        Ok(self.existing + self.written.count().await?)
    }
}

// ============================================================================
// Dataset Fixtures
// ============================================================================

pub fn vector_cell(dim: usize) -> String {
    let values: Vec<String> = (0..dim).map(|i| format!("{:.4}", i as f32 / 10_000.0)).collect();
    format!("\"[{}]\"", values.join(","))
}

/// A CSV row with id `id` and a vector of `dim` elements
pub fn csv_row(id: i64, dim: usize) -> String {
    format!("{id},Story {id},author{id},{},1700000000,text {id},{}", id % 500, vector_cell(dim))
}

pub fn write_csv(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    writeln!(file, "{CSV_HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    path
}

/// Parquet file laid out like the public dataset, one row per entry of
/// `dims` (ids start at 1).
pub fn write_parquet(dir: &Path, name: &str, dims: &[usize]) -> PathBuf {
    let n = dims.len();
    let mut vectors = ListBuilder::new(Float32Builder::new());
    for &dim in dims {
        for i in 0..dim {
            vectors.values().append_value(i as f32 / 1000.0);
        }
        vectors.append(true);
    }

    let columns: Vec<(&str, ArrayRef)> = vec![
        ("doc_id", Arc::new(Int32Array::from_iter_values(1..=n as i32))),
        ("title", Arc::new(StringArray::from_iter_values((1..=n).map(|i| format!("Story {i}"))))),
        ("by", Arc::new(StringArray::from_iter_values((1..=n).map(|i| format!("author{i}"))))),
        ("post_score", Arc::new(Int32Array::from_iter_values((1..=n as i32).map(|i| i % 500)))),
        ("time", Arc::new(Int32Array::from_iter_values((0..n as i32).map(|i| 1_700_000_000 + i)))),
        ("text", Arc::new(StringArray::from_iter_values((1..=n).map(|i| format!("text {i}"))))),
        ("vector", Arc::new(vectors.finish())),
    ];

    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batch =
        RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect()).unwrap();

    let path = dir.join(name);
    let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    path
}

/// Enabled config for `local_path`, fetched from `dataset_url` when missing
pub fn import_config(local_path: PathBuf, dataset_url: String) -> ImportConfig {
    ImportConfig {
        enabled: true,
        dataset_url,
        local_path,
        row_limit: 1_000,
        read_batch_size: 10,
        write_batch_size: 4,
        shutdown_timeout: Duration::from_secs(1),
        skip_if_data_exists: true,
    }
}
