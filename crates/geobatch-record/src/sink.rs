use std::sync::mpsc;

use crate::data::Record;
use crate::error::{IngestError, Result};

/// Destination for ingested records.
///
/// Channel-backed sinks block while full, which lets downstream stages
/// throttle ingestion.
pub trait RecordSink {
    fn push(&mut self, record: Record) -> Result<()>;
}

impl RecordSink for Vec<Record> {
    fn push(&mut self, record: Record) -> Result<()> {
        Vec::push(self, record);
        Ok(())
    }
}

impl RecordSink for mpsc::Sender<Record> {
    fn push(&mut self, record: Record) -> Result<()> {
        self.send(record).map_err(|_| IngestError::SinkClosed)
    }
}

impl RecordSink for mpsc::SyncSender<Record> {
    fn push(&mut self, record: Record) -> Result<()> {
        self.send(record).map_err(|_| IngestError::SinkClosed)
    }
}

/// Uses `blocking_send`; call from a blocking thread, never from inside an
/// async task.
#[cfg(feature = "tokio")]
impl RecordSink for tokio::sync::mpsc::Sender<Record> {
    fn push(&mut self, record: Record) -> Result<()> {
        self.blocking_send(record)
            .map_err(|_| IngestError::SinkClosed)
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn push(&mut self, record: Record) -> Result<()> { (**self).push(record) }
}
