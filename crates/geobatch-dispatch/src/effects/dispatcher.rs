//! The dispatch coordinator.
//!
//! One coordinator task owns the pacing state and makes every admission
//! decision. Each admitted query runs in its own task; outcomes are
//! forwarded by the coordinator, so the output channel closes only after
//! the last outcome has been delivered.
//!
//! Each loop iteration waits on whichever is ready first, polled in this
//! order:
//!
//! 1. cancellation
//! 2. a rate update (so pacing changes are never starved by work)
//! 3. a finished query
//! 4. the next admission slot, then the next input query

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::core::{admission_deadline, slot_open};
use crate::data::{DispatchOptions, DispatchSummary, Pacing, Query, QueryOutcome};
use crate::effects::control::RateUpdates;
use crate::effects::http::HttpClient;
use crate::error::DispatchError;

/// Rate-limited dispatcher of queries against an [`HttpClient`].
pub struct Dispatcher<C> {
    client:  Arc<C>,
    options: DispatchOptions,
}

impl<C: HttpClient + 'static> Dispatcher<C> {
    pub fn new(client: C, options: DispatchOptions) -> Self { Self::from_shared(Arc::new(client), options) }

    pub fn from_shared(client: Arc<C>, options: DispatchOptions) -> Self { Self { client, options } }

    /// Dispatch queries from `input` until it closes or `cancel` fires.
    ///
    /// Every admitted query yields exactly one outcome on `output`. When
    /// `input` closes, in-flight queries are drained. When `cancel` fires,
    /// admission stops at once and in-flight queries get
    /// [`DispatchOptions::grace_period`] to finish before they are aborted
    /// and reported as [`DispatchError::Cancelled`]. Queries still queued in
    /// `input` are never admitted and produce no outcome.
    pub async fn run(
        self,
        mut input: mpsc::Receiver<Query>,
        output: mpsc::Sender<QueryOutcome>,
        mut updates: RateUpdates,
        cancel: CancellationToken,
    ) -> DispatchSummary {
        let mut coordinator = Coordinator {
            client: self.client,
            pacing: self.options.pacing,
            request_timeout: self.options.request_timeout,
            last_admission: None,
            in_flight: JoinSet::new(),
            pending: HashMap::new(),
            summary: DispatchSummary::default(),
            output,
        };

        let mut cancelled = false;
        loop {
            let deadline = admission_deadline(coordinator.last_admission, coordinator.pacing);
            let ready = slot_open(deadline, Instant::now());

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                update = updates.recv(), if updates.is_open() => {
                    if let Some(pacing) = update {
                        coordinator.set_pacing(pacing);
                    }
                }
                Some(joined) = coordinator.in_flight.join_next_with_id(), if !coordinator.in_flight.is_empty() => {
                    coordinator.deliver(joined).await;
                }
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if !ready => {}
                next = input.recv(), if ready => match next {
                    Some(query) => coordinator.admit(query),
                    None => break,
                },
            }
        }

        if !cancelled {
            cancelled = coordinator.drain(&cancel).await;
        }
        if cancelled {
            tracing::info!(
                in_flight = coordinator.in_flight.len(),
                "dispatch cancelled, waiting for in-flight queries"
            );
            coordinator.drain_with_grace(self.options.grace_period).await;
        }

        let summary = coordinator.summary;
        tracing::info!(
            admitted = summary.admitted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "dispatch finished"
        );
        summary
    }
}

struct Coordinator<C> {
    client:          Arc<C>,
    pacing:          Pacing,
    request_timeout: Option<Duration>,
    last_admission:  Option<Instant>,
    in_flight:       JoinSet<QueryOutcome>,
    pending:         HashMap<task::Id, (String, String)>,
    summary:         DispatchSummary,
    output:          mpsc::Sender<QueryOutcome>,
}

impl<C: HttpClient + 'static> Coordinator<C> {
    fn set_pacing(&mut self, pacing: Pacing) {
        tracing::debug!(interval = ?pacing.interval(), "pacing updated");
        self.pacing = pacing;
    }

    fn admit(&mut self, query: Query) {
        tracing::debug!(id = %query.id, source = %query.source, "admitting query");
        let meta = (query.id.clone(), query.source.clone());
        let handle = self.in_flight.spawn(execute(
            Arc::clone(&self.client),
            query,
            self.request_timeout,
        ));
        self.pending.insert(handle.id(), meta);
        self.last_admission = Some(Instant::now());
        self.summary.admitted += 1;
    }

    async fn deliver(&mut self, joined: Result<(task::Id, QueryOutcome), JoinError>) {
        let outcome = match joined {
            Ok((task_id, outcome)) => {
                self.pending.remove(&task_id);
                outcome
            }
            Err(e) => {
                let (id, source) = self.pending.remove(&e.id()).unwrap_or_default();
                let error = if e.is_cancelled() {
                    DispatchError::Cancelled
                } else {
                    DispatchError::Transport(format!("query task failed: {e}"))
                };
                QueryOutcome::failed(id, source, error)
            }
        };

        if let Err(error) = &outcome.result {
            tracing::warn!(id = %outcome.id, source = %outcome.source, %error, "query failed");
        }
        self.summary.record(&outcome);
        if self.output.send(outcome).await.is_err() {
            tracing::warn!("outcome receiver dropped, discarding outcome");
        }
    }

    /// Deliver every in-flight outcome. Returns `true` if cancelled first.
    async fn drain(&mut self, cancel: &CancellationToken) -> bool {
        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => return true,
                joined = self.in_flight.join_next_with_id() => match joined {
                    Some(joined) => self.deliver(joined).await,
                    None => return false,
                },
            }
        }
    }

    /// Wait up to `grace` for in-flight queries, then abort the rest.
    async fn drain_with_grace(&mut self, grace: Duration) {
        let deadline = Instant::now() + grace;
        loop {
            tokio::select! {
                biased;

                joined = self.in_flight.join_next_with_id() => match joined {
                    Some(joined) => self.deliver(joined).await,
                    None => return,
                },
                () = sleep_until(deadline) => break,
            }
        }

        self.in_flight.abort_all();
        while let Some(joined) = self.in_flight.join_next_with_id().await {
            self.deliver(joined).await;
        }
    }
}

async fn execute<C: HttpClient>(
    client: Arc<C>,
    query: Query,
    request_timeout: Option<Duration>,
) -> QueryOutcome {
    let result: Result<Bytes, DispatchError> = match request_timeout {
        Some(limit) => match tokio::time::timeout(limit, client.get(&query.url)).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(DispatchError::Timeout(limit)),
        },
        None => client.get(&query.url).await.map_err(Into::into),
    };

    QueryOutcome {
        id: query.id,
        source: query.source,
        result,
    }
}
