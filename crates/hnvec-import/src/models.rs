//! Records flowing through the import pipeline

use chrono::{DateTime, Utc};

/// A decoded dataset row, independent of the source file format.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub doc_id: i64,
    pub title: String,
    pub author: String,
    pub score: i32,
    /// Seconds since the Unix epoch
    pub time_unix: i64,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Write model for one row of the `documents` table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub hn_id: i64,
    pub title: String,
    /// Imported rows carry no link
    pub url: String,
    pub by: String,
    pub score: i32,
    pub time: DateTime<Utc>,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl From<RawRecord> for NewDocument {
    fn from(record: RawRecord) -> Self {
        Self {
            hn_id: record.doc_id,
            title: record.title,
            url: String::new(),
            by: record.author,
            score: record.score,
            // Out-of-range timestamps collapse to the epoch
            time: DateTime::<Utc>::from_timestamp(record.time_unix, 0).unwrap_or_default(),
            text: record.text,
            embedding: record.embedding,
        }
    }
}

/// One read chunk handed out by a decoder.
#[derive(Debug, Default)]
pub struct DecodedChunk {
    /// Rows consumed from the source for this chunk, valid or not
    pub scanned: u64,
    /// Rows that survived validation, in source order
    pub records: Vec<RawRecord>,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Disabled,
    SkippedExisting { documents: u64 },
    Imported,
}

/// Totals of one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub scanned: u64,
    pub inserted: u64,
    pub outcome: ImportOutcome,
}

impl ImportSummary {
    pub fn disabled() -> Self {
        Self {
            scanned: 0,
            inserted: 0,
            outcome: ImportOutcome::Disabled,
        }
    }

    pub fn skipped(documents: u64) -> Self {
        Self {
            scanned: 0,
            inserted: 0,
            outcome: ImportOutcome::SkippedExisting { documents },
        }
    }
}
