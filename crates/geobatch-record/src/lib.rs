//! Address records and their ingestion from delimited files.
//!
//! # Architecture
//!
//! - [`Record`] - immutable unit of work: one address plus its provenance
//! - [`Records`] - lazy, non-restartable row reader over one source
//! - [`RecordSink`] - where ingested records are pushed; channel sinks give
//!   backpressure
//!
//! # Example
//!
//! ```
//! use geobatch_record::read_records;
//!
//! let input = "17,false,1600 Amphitheatre Pkwy, Mountain View\n";
//! let mut records = Vec::new();
//! let produced = read_records(input.as_bytes(), "inline", ',', &mut records).unwrap();
//!
//! assert_eq!(produced, 1);
//! assert_eq!(records[0].address(), "1600 Amphitheatre PkwyMountain View");
//! ```

pub use self::data::{Record, parse_sensor};
pub use self::error::{IngestError, IngestFailure, MalformedReason, Result};
pub use self::ingest::{Records, TrimLeadingSpace, lazy_reader, read_file, read_records};
pub use self::sink::RecordSink;

mod data;
mod error;
mod ingest;
mod sink;
