//! Lenient delimited-file ingestion.
//!
//! Rows are read with headers disabled and flexible widths. Leading
//! whitespace of every field is stripped before the csv parser sees it, so
//! a field like ` "a, b"` still parses as quoted. Bytes that are not valid
//! UTF-8 are replaced rather than rejected.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};

use crate::data::Record;
use crate::error::{IngestError, IngestFailure, Result};
use crate::sink::RecordSink;

/// Build a `csv::Reader` with most strictness checks turned off.
pub fn lazy_reader<R: Read>(
    reader: R,
    delimiter: char,
) -> Result<csv::Reader<TrimLeadingSpace<R>>> {
    let delimiter = delimiter_byte(delimiter)?;
    Ok(ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        // rows may carry any number of address fragments
        .flexible(true)
        .from_reader(TrimLeadingSpace::new(reader, delimiter)))
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(IngestError::InvalidDelimiter(delimiter))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    /// A quote inside a quoted field: either an escaped quote or the end.
    QuoteInQuoted,
}

/// Drops spaces and tabs at the start of every field.
///
/// Quote state is tracked so whitespace inside a quoted field is kept.
pub struct TrimLeadingSpace<R> {
    inner:     R,
    delimiter: u8,
    state:     FieldState,
}

impl<R: Read> TrimLeadingSpace<R> {
    pub fn new(inner: R, delimiter: u8) -> Self {
        Self {
            inner,
            delimiter,
            state: FieldState::Start,
        }
    }

    fn ends_field(&self, byte: u8) -> bool {
        byte == self.delimiter || byte == b'\n' || byte == b'\r'
    }

    /// Advance the state machine; returns whether `byte` is kept.
    fn keep(&mut self, byte: u8) -> bool {
        self.state = match self.state {
            FieldState::Start if byte == b' ' || byte == b'\t' => return false,
            FieldState::Start if byte == b'"' => FieldState::Quoted,
            FieldState::Start | FieldState::Unquoted | FieldState::QuoteInQuoted
                if self.ends_field(byte) =>
            {
                FieldState::Start
            }
            FieldState::Start | FieldState::Unquoted => FieldState::Unquoted,
            FieldState::Quoted if byte == b'"' => FieldState::QuoteInQuoted,
            FieldState::Quoted => FieldState::Quoted,
            FieldState::QuoteInQuoted if byte == b'"' => FieldState::Quoted,
            FieldState::QuoteInQuoted => FieldState::Unquoted,
        };
        true
    }
}

impl<R: Read> Read for TrimLeadingSpace<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let byte = buf[i];
                if self.keep(byte) {
                    buf[kept] = byte;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

/// Lazy sequence of records from a single source.
///
/// The sequence cannot be restarted. It ends after the first error; a new
/// `Records` has to be built to read the source again.
pub struct Records<R> {
    reader: csv::Reader<TrimLeadingSpace<R>>,
    source: String,
    row:    usize,
    buf:    ByteRecord,
    done:   bool,
}

impl<R: Read> Records<R> {
    pub fn new(reader: R, source: impl Into<String>, delimiter: char) -> Result<Self> {
        let source = source.into();
        if source.is_empty() {
            return Err(IngestError::EmptySource);
        }
        Ok(Self {
            reader: lazy_reader(reader, delimiter)?,
            source,
            row: 0,
            buf: ByteRecord::new(),
            done: false,
        })
    }

    pub fn source(&self) -> &str { &self.source }

    /// Number of rows consumed so far, including a failed one.
    pub fn rows_read(&self) -> usize { self.row }
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read_byte_record(&mut self.buf) {
            Ok(false) => {
                self.done = true;
                None
            }
            Ok(true) => {
                let fields: Vec<_> = self.buf.iter().map(String::from_utf8_lossy).collect();
                let record = Record::from_row(&fields, &self.source, self.row);
                self.row += 1;
                if record.is_err() {
                    self.done = true;
                }
                Some(record)
            }
            Err(e) => {
                self.done = true;
                Some(Err(IngestError::Csv(e)))
            }
        }
    }
}

/// Read every record from `reader` and push it onto `sink` in file order.
///
/// Returns the number of records pushed. Reading stops at the first
/// malformed row or read fault; the failure carries the count of records
/// already pushed, and no record is pushed for the failing row.
pub fn read_records<R, S>(
    reader: R,
    source: &str,
    delimiter: char,
    sink: &mut S,
) -> std::result::Result<usize, IngestFailure>
where
    R: Read,
    S: RecordSink + ?Sized,
{
    let mut produced = 0;
    let records =
        Records::new(reader, source, delimiter).map_err(|error| IngestFailure { produced, error })?;

    for record in records {
        let record = record.map_err(|error| IngestFailure { produced, error })?;
        sink.push(record)
            .map_err(|error| IngestFailure { produced, error })?;
        produced += 1;
    }

    tracing::debug!(source, produced, "ingestion finished");
    Ok(produced)
}

/// Open `path` and ingest it, using the path as the record source.
pub fn read_file<S>(
    path: &Path,
    delimiter: char,
    sink: &mut S,
) -> std::result::Result<usize, IngestFailure>
where
    S: RecordSink + ?Sized,
{
    let file = File::open(path).map_err(|error| IngestFailure {
        produced: 0,
        error:    IngestError::Open {
            path: path.to_path_buf(),
            error,
        },
    })?;
    let source = path.display().to_string();
    read_records(BufReader::new(file), &source, delimiter, sink)
}
