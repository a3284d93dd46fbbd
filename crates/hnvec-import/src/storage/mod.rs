//! Storage port for imported documents
//!
//! The pipeline only needs two operations from the destination: insert a batch
//! and count what is already there. [`PgDocumentStore`] is the production
//! adapter; [`InMemoryDocumentStore`] backs dry runs and tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::NewDocument;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryDocumentStore;
pub use postgres::{connect_with_retry, PgDocumentStore};

/// Postgres SQLSTATE for `undefined_table`
pub const UNDEFINED_TABLE_SQLSTATE: &str = "42P01";

const UNDEFINED_TABLE_MESSAGE: &str = r#"relation "documents" does not exist"#;

/// Errors reported by a [`DocumentStore`]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    /// True when the documents table has not been created yet.
    ///
    /// Checks the structured SQLSTATE first and falls back to the server
    /// message for drivers or wrappers that lose the code.
    pub fn is_undefined_table(&self) -> bool {
        if let StoreError::Database(sqlx::Error::Database(db_err)) = self {
            if db_err.code().as_deref() == Some(UNDEFINED_TABLE_SQLSTATE) {
                return true;
            }
        }
        self.to_string().contains(UNDEFINED_TABLE_MESSAGE)
    }
}

/// Destination for imported documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert all documents as one write; returns the number of rows stored
    async fn create_batch(&self, docs: &[NewDocument]) -> Result<u64, StoreError>;

    /// Number of documents currently stored
    async fn count(&self) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;

    /// Server error carrying a SQLSTATE and an arbitrary message
    #[derive(Debug)]
    struct CodedError {
        code: &'static str,
        message: &'static str,
    }

    impl std::fmt::Display for CodedError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.message)
        }
    }

    impl std::error::Error for CodedError {}

    impl DatabaseError for CodedError {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn coded(code: &'static str, message: &'static str) -> StoreError {
        StoreError::Database(sqlx::Error::Database(Box::new(CodedError { code, message })))
    }

    #[test]
    fn test_undefined_table_detected_by_sqlstate() {
        let err = coded(UNDEFINED_TABLE_SQLSTATE, "table missing");
        assert!(!err.to_string().contains(UNDEFINED_TABLE_MESSAGE));
        assert!(err.is_undefined_table());
    }

    #[test]
    fn test_other_sqlstate_is_not_undefined_table() {
        assert!(!coded("23505", "duplicate key value").is_undefined_table());
    }

    #[test]
    fn test_undefined_table_message_fallback() {
        let err = StoreError::Backend(
            r#"count documents: ERROR: relation "documents" does not exist (SQLSTATE 42P01)"#.into(),
        );
        assert!(err.is_undefined_table());
    }

    #[test]
    fn test_other_errors_are_not_undefined_table() {
        assert!(!StoreError::Backend("connection refused".into()).is_undefined_table());
        assert!(!StoreError::Database(sqlx::Error::PoolTimedOut).is_undefined_table());
    }
}
