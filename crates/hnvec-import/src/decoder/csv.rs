//! Delimited-text dataset decoder
//!
//! Expects a header row naming `doc_id`, `title`, `by`, `post_score`, `text`,
//! `vector` and one of `time_unix` / `time` (any case, any order). Records
//! may be ragged; a missing cell reads as empty. Cells are decoded as UTF-8
//! with invalid sequences replaced, so stray bytes never abort a run.

use ::csv::{ByteRecord, Reader, ReaderBuilder};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::RecordDecoder;
use crate::config::VECTOR_DIMENSION;
use crate::error::{ImportError, Result};
use crate::models::{DecodedChunk, RawRecord};
use crate::vector::parse_vector;

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CsvColumns {
    doc_id: usize,
    title: usize,
    by: usize,
    post_score: usize,
    text: usize,
    vector: usize,
    time: usize,
}

impl CsvColumns {
    fn from_header(header: &ByteRecord) -> Result<Self> {
        let index: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (String::from_utf8_lossy(name).trim().to_lowercase(), i))
            .collect();

        let required = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| ImportError::Schema(format!("csv missing {name} column")))
        };

        let time = index
            .get("time_unix")
            .or_else(|| index.get("time"))
            .copied()
            .ok_or_else(|| ImportError::Schema("csv missing time column".to_string()))?;

        Ok(Self {
            doc_id: required("doc_id")?,
            title: required("title")?,
            by: required("by")?,
            post_score: required("post_score")?,
            text: required("text")?,
            vector: required("vector")?,
            time,
        })
    }
}

/// Why a row was skipped
#[derive(Debug, PartialEq)]
enum Rejection {
    DocId,
    Vector(String),
    Dimension(usize),
}

fn decode_row(columns: &CsvColumns, row: &ByteRecord) -> std::result::Result<RawRecord, Rejection> {
    let field = |i: usize| row.get(i).map(String::from_utf8_lossy).unwrap_or(Cow::Borrowed(""));

    let doc_id = field(columns.doc_id)
        .trim()
        .parse::<i64>()
        .map_err(|_| Rejection::DocId)?;

    let embedding =
        parse_vector(&field(columns.vector)).map_err(|e| Rejection::Vector(e.to_string()))?;
    if embedding.len() != VECTOR_DIMENSION {
        return Err(Rejection::Dimension(embedding.len()));
    }

    Ok(RawRecord {
        doc_id,
        title: field(columns.title).into_owned(),
        author: field(columns.by).into_owned(),
        score: field(columns.post_score).trim().parse().unwrap_or(0),
        time_unix: field(columns.time).trim().parse().unwrap_or(0),
        text: field(columns.text).into_owned(),
        embedding,
    })
}

/// Streaming CSV decoder; reads one record at a time.
pub struct CsvDecoder {
    reader: Reader<File>,
    columns: CsvColumns,
    record: ByteRecord,
    limit: u64,
    read_batch_size: usize,
    scanned: u64,
    exhausted: bool,
}

impl CsvDecoder {
    /// Open `path` and validate its header
    pub fn open(path: &Path, row_limit: u64, read_batch_size: u64) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| ImportError::io(format!("open csv file {}", path.display()), e))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let columns = CsvColumns::from_header(reader.byte_headers()?)?;

        Ok(Self {
            reader,
            columns,
            record: ByteRecord::new(),
            limit: row_limit,
            read_batch_size: usize::try_from(read_batch_size.max(1)).unwrap_or(usize::MAX),
            scanned: 0,
            exhausted: false,
        })
    }
}

impl RecordDecoder for CsvDecoder {
    fn next_chunk(&mut self, cancel: &CancellationToken) -> Result<Option<DecodedChunk>> {
        let mut chunk = DecodedChunk::default();

        while !self.exhausted
            && self.scanned < self.limit
            && chunk.records.len() < self.read_batch_size
        {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            if !self.reader.read_byte_record(&mut self.record)? {
                self.exhausted = true;
                break;
            }
            self.scanned += 1;
            chunk.scanned += 1;

            match decode_row(&self.columns, &self.record) {
                Ok(record) => chunk.records.push(record),
                Err(reason) => debug!(row = self.scanned, ?reason, "Skipping csv row"),
            }
        }

        if chunk.scanned == 0 {
            return Ok(None);
        }
        Ok(Some(chunk))
    }

    fn limit(&self) -> u64 {
        self.limit
    }
}
