//! End-to-end batch runs.
//!
//! ```text
//! files ──ingest (blocking)──▶ records ──sign──▶ queries ──dispatch──▶ outcomes
//! ```
//!
//! Every stage hands values over bounded channels, so a slow dispatcher
//! throttles signing, which throttles ingestion.

use std::path::PathBuf;

use geobatch_dispatch::{
    DispatchError, DispatchOptions, Dispatcher, HttpClient, Query, QueryOutcome, RateControl,
    RateUpdates, rate_channel,
};
use geobatch_record::{IngestError, IngestFailure, Record, read_file};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::GeocodeConfig;
use crate::error::{GeobatchError, Result};
use crate::query::QueryFactory;

/// Knobs for a batch run beyond the [`GeocodeConfig`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Field delimiter of every input file.
    ///
    /// Default: `,`
    pub delimiter: char,

    /// Capacity of the record and query channels between stages.
    ///
    /// Default: 64
    pub channel_capacity: usize,

    /// Dispatch settings. The initial pacing is taken from
    /// [`GeocodeConfig::qps`], not from here.
    pub dispatch: DispatchOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            delimiter:        ',',
            channel_capacity: 64,
            dispatch:         DispatchOptions::default(),
        }
    }
}

/// Partial-success summary of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Records successfully read from the input files.
    pub records_read: usize,
    pub succeeded:    usize,
    /// Queries that failed, including records whose request could not be built.
    pub failed:       usize,
    pub cancelled:    usize,
    /// The failure that stopped ingestion early, if any.
    pub fatal:        Option<GeobatchError>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool { self.fatal.is_none() && self.cancelled == 0 }
}

/// A configured batch run, not yet started.
pub struct BatchRun<C> {
    config:  GeocodeConfig,
    client:  C,
    options: BatchOptions,
    control: RateControl,
    updates: RateUpdates,
}

impl<C: HttpClient + 'static> BatchRun<C> {
    pub fn new(config: GeocodeConfig, client: C, options: BatchOptions) -> Self {
        let (control, updates) = rate_channel(8);
        Self {
            config,
            client,
            options,
            control,
            updates,
        }
    }

    /// Handle for changing the rate ceiling while the run is going.
    pub fn rate_control(&self) -> RateControl { self.control.clone() }

    /// Ingest `files` in order, dispatch one query per record and send
    /// every outcome to `output`.
    ///
    /// # Errors
    ///
    /// Fails before any I/O if the signing key does not decode. Failures
    /// after that point are reported through [`RunSummary`]: per-record
    /// problems as failed outcomes, an ingestion fault as
    /// [`RunSummary::fatal`].
    pub async fn run(
        self,
        files: Vec<PathBuf>,
        output: mpsc::Sender<QueryOutcome>,
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let factory = QueryFactory::from_config(&self.config)?;
        let capacity = self.options.channel_capacity.max(1);

        tracing::info!(files = files.len(), qps = self.config.qps, "batch run starting");

        let (record_tx, mut record_rx) = mpsc::channel::<Record>(capacity);
        let delimiter = self.options.delimiter;
        let ingest = tokio::task::spawn_blocking(move || ingest_files(files, delimiter, record_tx));

        let (query_tx, query_rx) = mpsc::channel::<Query>(capacity);
        let dispatch_options = self.options.dispatch.pacing(self.config.pacing());
        let dispatcher = Dispatcher::new(self.client, dispatch_options);
        let dispatch = tokio::spawn(dispatcher.run(
            query_rx,
            output.clone(),
            self.updates,
            cancel.clone(),
        ));
        drop(self.control);

        let rejected = forward_queries(&factory, &mut record_rx, query_tx, &output, &cancel).await;
        drop(record_rx);

        let (records_read, failure) = ingest
            .await
            .map_err(|e| GeobatchError::Task(e.to_string()))?;
        let dispatched = dispatch
            .await
            .map_err(|e| GeobatchError::Task(e.to_string()))?;

        // A closed record channel only means the run stopped reading early.
        let fatal = failure
            .filter(|f| !matches!(f.error, IngestError::SinkClosed))
            .map(GeobatchError::Ingest);
        if let Some(error) = &fatal {
            tracing::warn!(%error, "ingestion stopped early");
        }

        let summary = RunSummary {
            records_read,
            succeeded: dispatched.succeeded,
            failed: dispatched.failed + rejected,
            cancelled: dispatched.cancelled,
            fatal,
        };
        tracing::info!(
            records_read = summary.records_read,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch run finished"
        );
        Ok(summary)
    }
}

/// Run a batch with a fresh [`BatchRun`].
pub async fn run_batch<C: HttpClient + 'static>(
    config: GeocodeConfig,
    files: Vec<PathBuf>,
    options: BatchOptions,
    client: C,
    output: mpsc::Sender<QueryOutcome>,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    BatchRun::new(config, client, options)
        .run(files, output, cancel)
        .await
}

/// Returns the records read and the failure that stopped ingestion, if any.
fn ingest_files(
    files: Vec<PathBuf>,
    delimiter: char,
    mut sink: mpsc::Sender<Record>,
) -> (usize, Option<IngestFailure>) {
    let mut total = 0;
    for path in files {
        match read_file(&path, delimiter, &mut sink) {
            Ok(produced) => total += produced,
            Err(failure) => return (total + failure.produced, Some(failure)),
        }
    }
    (total, None)
}

/// Sign records into queries until input ends or the run is cancelled.
///
/// Returns the number of records rejected before dispatch.
async fn forward_queries(
    factory: &QueryFactory,
    records: &mut mpsc::Receiver<Record>,
    queries: mpsc::Sender<Query>,
    output: &mpsc::Sender<QueryOutcome>,
    cancel: &CancellationToken,
) -> usize {
    let mut rejected = 0;
    loop {
        let record = tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            next = records.recv() => match next {
                Some(record) => record,
                None => break,
            },
        };

        match factory.query(&record) {
            Ok(query) => {
                let sent = tokio::select! {
                    biased;

                    () = cancel.cancelled() => false,
                    sent = queries.send(query) => sent.is_ok(),
                };
                if !sent {
                    break;
                }
            }
            Err(error) => {
                rejected += 1;
                tracing::warn!(id = record.id(), source = record.source(), %error, "request rejected");
                let outcome = QueryOutcome::failed(
                    record.id(),
                    record.source(),
                    DispatchError::InvalidRequest(error.to_string()),
                );
                if output.send(outcome).await.is_err() {
                    tracing::warn!("outcome receiver dropped, discarding outcome");
                }
            }
        }
    }
    rejected
}
