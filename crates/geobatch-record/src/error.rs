use std::io;
use std::path::PathBuf;

/// Why a row could not become a [`Record`](crate::Record).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    #[error("expected at least 3 columns, found {found}")]
    TooFewColumns { found: usize },

    #[error("expected 'true' or 'false' sensor flag, found {value:?}")]
    InvalidSensor { value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed record in {file} at row {row}: {reason}")]
    Malformed {
        file:   String,
        row:    usize,
        reason: MalformedReason,
    },

    #[error("record source must not be empty")]
    EmptySource,

    #[error("delimiter {0:?} is not a single-byte character")]
    InvalidDelimiter(char),

    #[error("cannot open {}: {error}", path.display())]
    Open {
        path:  PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("record sink closed")]
    SinkClosed,
}

impl IngestError {
    /// Row index of a malformed record, if this error names one.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::Malformed { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// Ingestion stopped early after pushing `produced` records.
#[derive(Debug, thiserror::Error)]
#[error("ingestion stopped after {produced} records: {error}")]
pub struct IngestFailure {
    pub produced: usize,
    #[source]
    pub error:    IngestError,
}

pub type Result<T> = std::result::Result<T, IngestError>;
