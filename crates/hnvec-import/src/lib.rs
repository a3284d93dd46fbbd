//! hnvec Import Library
//!
//! Bulk loader for the Hacker News MiniLM dataset: rows of story text with a
//! 384-wide embedding, imported into the `documents` table.
//!
//! # Pipeline
//!
//! - **Readiness**: wait for migrations to create the documents table
//! - **Acquisition**: download the dataset once, reuse it on later runs
//! - **Decoding**: Parquet or CSV, chosen by file extension
//! - **Writing**: bounded insert batches, in scan order
//! - **Worker**: background run with a graceful, forced, abandon shutdown
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hnvec_import::{
//!     start_import_worker, DatasetFetcher, ImportConfig, ImportService, InMemoryDocumentStore,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(InMemoryDocumentStore::new());
//!     let service = ImportService::new(store, ImportConfig::from_env(), DatasetFetcher::new()?);
//!
//!     let shutdown = CancellationToken::new();
//!     let exit = start_import_worker(Arc::new(service), shutdown).await?;
//!     println!("worker exit: {exit:?}");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod decoder;
pub mod download;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod readiness;
pub mod storage;
pub mod vector;
pub mod worker;
pub mod writer;

pub use config::{DatabaseConfig, ImportConfig, VECTOR_DIMENSION};
pub use decoder::{open_decoder, DatasetFormat, RecordDecoder};
pub use download::DatasetFetcher;
pub use error::{ImportError, Result};
pub use models::{ImportOutcome, ImportSummary, NewDocument, RawRecord};
pub use pipeline::ImportService;
pub use readiness::wait_for_schema;
pub use storage::{DocumentStore, InMemoryDocumentStore, PgDocumentStore, StoreError};
pub use vector::parse_vector;
pub use worker::{spawn_worker, start_import_worker, ShutdownPolicy, WorkerExit};
pub use writer::BatchWriter;
