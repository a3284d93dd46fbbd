//! Error types for the import pipeline

use thiserror::Error;

use crate::storage::StoreError;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Run-level failures. Row-level problems (bad ids, bad vectors) are counted,
/// never raised.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Transport error: {url} answered with status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Transport error: {url} returned an empty body")]
    EmptyDownload { url: String },

    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    #[error("Storage error: {0}")]
    Store(#[source] StoreError),

    #[error("Write error: {0}")]
    Write(#[source] StoreError),

    #[error("Import cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImportError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ImportError::Io {
            context: context.into(),
            source,
        }
    }

    /// Cancellation is an expected shutdown path, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ImportError::Cancelled)
    }
}

impl From<parquet::errors::ParquetError> for ImportError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        ImportError::Decode(format!("parquet: {err}"))
    }
}

impl From<arrow_schema::ArrowError> for ImportError {
    fn from(err: arrow_schema::ArrowError) -> Self {
        ImportError::Decode(format!("arrow: {err}"))
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Decode(format!("csv: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cancellation_is_cancelled() {
        assert!(ImportError::Cancelled.is_cancelled());
        assert!(!ImportError::Schema("missing doc_id".into()).is_cancelled());
        assert!(!ImportError::Write(StoreError::Backend("boom".into())).is_cancelled());
    }

    #[test]
    fn test_io_error_keeps_context() {
        let err = ImportError::io(
            "create dataset dir /data",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "IO error: create dataset dir /data: denied");
    }
}
