//! Dataset row decoders
//!
//! Each supported file format implements [`RecordDecoder`]: a blocking,
//! forward-only reader that hands out [`DecodedChunk`]s until the file is
//! exhausted or the scan limit is reached. Rows with a bad id or an embedding
//! of the wrong width are consumed (counted as scanned) but never emitted.

use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::error::{ImportError, Result};
use crate::models::DecodedChunk;

pub mod csv;
pub mod parquet;

pub use self::csv::CsvDecoder;
pub use self::parquet::ParquetDecoder;

/// Forward-only source of decoded rows.
///
/// Calls block on file I/O; drive them from `spawn_blocking`.
pub trait RecordDecoder: Send {
    /// Next chunk, or `None` once the source or the scan limit is exhausted.
    fn next_chunk(&mut self, cancel: &CancellationToken) -> Result<Option<DecodedChunk>>;

    /// Effective scan limit for this source
    fn limit(&self) -> u64;
}

/// Supported dataset file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Parquet,
}

impl DatasetFormat {
    /// Pick the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(DatasetFormat::Csv),
            "parquet" => Ok(DatasetFormat::Parquet),
            "" => Err(ImportError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))),
            other => Err(ImportError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

/// Open the decoder for `format`
pub fn open_decoder(
    format: DatasetFormat,
    path: &Path,
    row_limit: u64,
    read_batch_size: u64,
) -> Result<Box<dyn RecordDecoder>> {
    let decoder: Box<dyn RecordDecoder> = match format {
        DatasetFormat::Csv => Box::new(CsvDecoder::open(path, row_limit, read_batch_size)?),
        DatasetFormat::Parquet => {
            Box::new(ParquetDecoder::open(path, row_limit, read_batch_size)?)
        },
    };
    Ok(decoder)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DatasetFormat::from_path(Path::new("/tmp/hn.parquet")).unwrap(),
            DatasetFormat::Parquet
        );
        assert_eq!(
            DatasetFormat::from_path(Path::new("/tmp/HN.CSV")).unwrap(),
            DatasetFormat::Csv
        );
    }

    #[test]
    fn test_unknown_extensions_are_rejected() {
        assert!(matches!(
            DatasetFormat::from_path(Path::new("/tmp/hn.json")),
            Err(ImportError::UnsupportedFormat(ext)) if ext == ".json"
        ));
        assert!(matches!(
            DatasetFormat::from_path(Path::new("/tmp/hn")),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }
}
