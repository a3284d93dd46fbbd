//! Columnar dataset decoder
//!
//! Reads the `doc_id`, `title`, `by`, `post_score`, `time`, `text` and
//! `vector` columns. Integer and string columns are cast to `Int64` / `Utf8`
//! so narrower physical types (the public dataset stores `INT32`) decode the
//! same way; the vector column may be any list of floats.

use ::parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use ::parquet::arrow::ProjectionMask;
use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int64Type};
use arrow_array::{Array, ArrayRef, Int64Array, RecordBatch, StringArray};
use arrow_cast::cast;
use arrow_schema::{DataType, Field};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::RecordDecoder;
use crate::config::VECTOR_DIMENSION;
use crate::error::{ImportError, Result};
use crate::models::{DecodedChunk, RawRecord};

const COLUMNS: [&str; 7] = ["doc_id", "title", "by", "post_score", "time", "text", "vector"];

/// Row-group streaming Parquet decoder.
pub struct ParquetDecoder {
    reader: ParquetRecordBatchReader,
    limit: u64,
    scanned: u64,
}

impl ParquetDecoder {
    /// Open `path`, check the schema and clamp the limit to the file's row count.
    pub fn open(path: &Path, row_limit: u64, read_batch_size: u64) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| ImportError::io(format!("open parquet file {}", path.display()), e))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let mut roots = Vec::with_capacity(COLUMNS.len());
        for name in COLUMNS {
            let index = builder
                .schema()
                .index_of(name)
                .map_err(|_| ImportError::Schema(format!("parquet missing {name} column")))?;
            roots.push(index);
        }

        let total_rows = u64::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);
        let limit = row_limit.min(total_rows);
        debug!(total_rows, limit, "Opened parquet dataset");

        let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
        let batch_size = usize::try_from(read_batch_size.max(1)).unwrap_or(usize::MAX);
        let reader = builder
            .with_projection(mask)
            .with_batch_size(batch_size)
            .build()?;

        Ok(Self {
            reader,
            limit,
            scanned: 0,
        })
    }
}

impl RecordDecoder for ParquetDecoder {
    fn next_chunk(&mut self, cancel: &CancellationToken) -> Result<Option<DecodedChunk>> {
        if self.scanned >= self.limit {
            return Ok(None);
        }
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        let Some(batch) = self.reader.next().transpose()? else {
            return Ok(None);
        };

        let remaining = usize::try_from(self.limit - self.scanned).unwrap_or(usize::MAX);
        let batch = if batch.num_rows() > remaining {
            batch.slice(0, remaining)
        } else {
            batch
        };
        if batch.num_rows() == 0 {
            return Ok(None);
        }

        let scanned = batch.num_rows() as u64;
        self.scanned += scanned;

        Ok(Some(DecodedChunk {
            scanned,
            records: decode_batch(&batch)?,
        }))
    }

    fn limit(&self) -> u64 {
        self.limit
    }
}

fn column_as(batch: &RecordBatch, name: &str, to: &DataType) -> Result<ArrayRef> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| ImportError::Schema(format!("parquet missing {name} column")))?;
    Ok(cast(column, to)?)
}

fn decode_batch(batch: &RecordBatch) -> Result<Vec<RawRecord>> {
    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float32, true)));

    let doc_id = column_as(batch, "doc_id", &DataType::Int64)?;
    let post_score = column_as(batch, "post_score", &DataType::Int64)?;
    let time = column_as(batch, "time", &DataType::Int64)?;
    let title = column_as(batch, "title", &DataType::Utf8)?;
    let by = column_as(batch, "by", &DataType::Utf8)?;
    let text = column_as(batch, "text", &DataType::Utf8)?;
    let vector = column_as(batch, "vector", &list_type)?;

    let mismatch = |name: &str| ImportError::Decode(format!("unexpected array type for {name}"));
    let doc_id = doc_id.as_primitive_opt::<Int64Type>().ok_or_else(|| mismatch("doc_id"))?;
    let post_score = post_score
        .as_primitive_opt::<Int64Type>()
        .ok_or_else(|| mismatch("post_score"))?;
    let time = time.as_primitive_opt::<Int64Type>().ok_or_else(|| mismatch("time"))?;
    let title = title.as_string_opt::<i32>().ok_or_else(|| mismatch("title"))?;
    let by = by.as_string_opt::<i32>().ok_or_else(|| mismatch("by"))?;
    let text = text.as_string_opt::<i32>().ok_or_else(|| mismatch("text"))?;
    let vector = vector.as_list_opt::<i32>().ok_or_else(|| mismatch("vector"))?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        if doc_id.is_null(row) || vector.is_null(row) {
            continue;
        }
        let values = vector.value(row);
        let Some(values) = values.as_primitive_opt::<Float32Type>() else {
            continue;
        };
        if values.len() != VECTOR_DIMENSION {
            continue;
        }

        records.push(RawRecord {
            doc_id: doc_id.value(row),
            title: string_at(title, row),
            author: string_at(by, row),
            score: i32::try_from(int_at(post_score, row)).unwrap_or(0),
            time_unix: int_at(time, row),
            text: string_at(text, row),
            embedding: values.values().to_vec(),
        });
    }
    Ok(records)
}

fn string_at(array: &StringArray, row: usize) -> String {
    if array.is_null(row) {
        String::new()
    } else {
        array.value(row).to_string()
    }
}

fn int_at(array: &Int64Array, row: usize) -> i64 {
    if array.is_null(row) {
        0
    } else {
        array.value(row)
    }
}
