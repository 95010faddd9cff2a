//! Pipeline tests for the dispatch coordinator.
//!
//! Time is paused in every test, so pacing gaps are measured exactly.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use geobatch_dispatch::{
    DispatchError, DispatchOptions, DispatchSummary, Dispatcher, HttpClient, Pacing, Query,
    QueryOutcome, RateUpdates, rate_channel,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Mock HTTP client recording when each query reaches the network.
#[derive(Clone)]
struct TestHttpClient {
    calls:    Arc<Mutex<Vec<(String, Instant)>>>,
    notify:   Option<mpsc::UnboundedSender<String>>,
    delay:    fn(&str) -> Duration,
    fails:    fn(&str) -> bool,
}

impl TestHttpClient {
    fn new() -> Self {
        Self {
            calls:  Arc::new(Mutex::new(Vec::new())),
            notify: None,
            delay:  |_| Duration::ZERO,
            fails:  |_| false,
        }
    }

    fn with_delay(mut self, delay: fn(&str) -> Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_failures(mut self, fails: fn(&str) -> bool) -> Self {
        self.fails = fails;
        self
    }

    fn with_notify(mut self, notify: mpsc::UnboundedSender<String>) -> Self {
        self.notify = Some(notify);
        self
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

impl HttpClient for TestHttpClient {
    type Error = DispatchError;

    async fn get(&self, url: &Url) -> Result<Bytes, DispatchError> {
        let id = url
            .query_pairs()
            .find(|(k, _)| k == "address")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();

        self.calls.lock().unwrap().push((id.clone(), Instant::now()));
        if let Some(notify) = &self.notify {
            let _ = notify.send(id.clone());
        }

        tokio::time::sleep((self.delay)(&id)).await;

        if (self.fails)(&id) {
            Err(DispatchError::Status(500))
        } else {
            Ok(Bytes::from(format!("{{\"status\":\"OK\",\"id\":\"{id}\"}}")))
        }
    }
}

fn query(n: usize) -> Query {
    let url = Url::parse(&format!("https://geo.test/json?address={n}&sensor=false")).unwrap();
    Query::new(n.to_string(), "test.csv", url)
}

fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|w| w[1] - w[0]).collect()
}

async fn collect(mut rx: mpsc::Receiver<QueryOutcome>) -> Vec<QueryOutcome> {
    let mut outcomes = Vec::new();
    while let Some(outcome) = rx.recv().await {
        outcomes.push(outcome);
    }
    outcomes
}

/// Feed `count` queries, close the input, and run to completion.
async fn run_closed(
    client: TestHttpClient,
    options: DispatchOptions,
    count: usize,
    updates: RateUpdates,
) -> (Vec<QueryOutcome>, DispatchSummary) {
    let (input_tx, input_rx) = mpsc::channel(count.max(1));
    let (output_tx, output_rx) = mpsc::channel(4);
    for n in 0..count {
        input_tx.send(query(n)).await.unwrap();
    }
    drop(input_tx);

    let dispatcher = Dispatcher::new(client, options);
    let run = tokio::spawn(dispatcher.run(input_rx, output_tx, updates, CancellationToken::new()));

    let outcomes = collect(output_rx).await;
    (outcomes, run.await.unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_admission_gaps_match_qps() {
    let client = TestHttpClient::new();
    let options = DispatchOptions::default().pacing(Pacing::from_qps(10));

    let (outcomes, summary) = run_closed(client.clone(), options, 20, RateUpdates::fixed()).await;

    assert_eq!(outcomes.len(), 20);
    assert_eq!(summary.admitted, 20);
    let gaps = gaps(&client.call_times());
    assert_eq!(gaps.len(), 19);
    for gap in gaps {
        assert!(gap >= Duration::from_millis(100), "gap too short: {gap:?}");
        assert!(gap < Duration::from_millis(101), "gap too long: {gap:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_unpaced_admits_everything_at_once() {
    let client = TestHttpClient::new();

    let (outcomes, _) =
        run_closed(client.clone(), DispatchOptions::default(), 8, RateUpdates::fixed()).await;

    assert_eq!(outcomes.len(), 8);
    let times = client.call_times();
    assert!(times.iter().all(|t| *t == times[0]));
}

#[tokio::test(start_paused = true)]
async fn test_rate_update_changes_next_gap() {
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let client = TestHttpClient::new().with_notify(notify_tx);
    let options = DispatchOptions::default().pacing(Pacing::from_qps(10));
    let (control, updates) = rate_channel(4);

    let (input_tx, input_rx) = mpsc::channel(8);
    let (output_tx, output_rx) = mpsc::channel(8);
    for n in 0..3 {
        input_tx.send(query(n)).await.unwrap();
    }
    drop(input_tx);

    let run = tokio::spawn(Dispatcher::new(client.clone(), options).run(
        input_rx,
        output_tx,
        updates,
        CancellationToken::new(),
    ));

    // Slow down right after the first admission, before the second one.
    assert_eq!(notify_rx.recv().await.as_deref(), Some("0"));
    control.set_qps(2).await.unwrap();

    let outcomes = collect(output_rx).await;
    run.await.unwrap();

    assert_eq!(outcomes.len(), 3);
    let gaps = gaps(&client.call_times());
    assert_eq!(gaps, vec![Duration::from_millis(500), Duration::from_millis(500)]);
}

#[tokio::test(start_paused = true)]
async fn test_rate_update_wins_over_ready_work() {
    let client = TestHttpClient::new();
    let options = DispatchOptions::default().pacing(Pacing::from_qps(1));
    let (control, updates) = rate_channel(4);

    // Both the update and the work are ready before the coordinator starts.
    control.set_qps(100).await.unwrap();

    let (outcomes, _) = run_closed(client.clone(), options, 3, updates).await;

    assert_eq!(outcomes.len(), 3);
    let gaps = gaps(&client.call_times());
    assert_eq!(gaps, vec![Duration::from_millis(10), Duration::from_millis(10)]);
}

#[tokio::test(start_paused = true)]
async fn test_every_admitted_query_yields_one_outcome() {
    let client = TestHttpClient::new().with_delay(|id| {
        let n: u64 = id.parse().unwrap();
        Duration::from_millis(((n * 37) % 11) * 50)
    });
    let options = DispatchOptions::default().pacing(Pacing::from_qps(50));

    let (outcomes, summary) = run_closed(client, options, 25, RateUpdates::fixed()).await;

    assert_eq!(outcomes.len(), 25);
    let ids: HashSet<_> = outcomes.iter().map(|o| o.id.clone()).collect();
    assert_eq!(ids.len(), 25);
    assert!(ids.iter().all(|id| id.parse::<usize>().unwrap() < 25));
    assert_eq!(summary.succeeded, 25);
    assert_eq!(summary.delivered(), 25);
}

#[tokio::test(start_paused = true)]
async fn test_completion_order_may_differ_from_admission() {
    let client = TestHttpClient::new().with_delay(|id| {
        if id == "0" {
            Duration::from_secs(1)
        } else {
            Duration::ZERO
        }
    });

    let (outcomes, _) =
        run_closed(client, DispatchOptions::default(), 3, RateUpdates::fixed()).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes.last().unwrap().id, "0");
}

#[tokio::test(start_paused = true)]
async fn test_query_failures_do_not_stop_pipeline() {
    let client = TestHttpClient::new().with_failures(|id| id.parse::<usize>().unwrap() % 3 == 0);

    let (outcomes, summary) =
        run_closed(client, DispatchOptions::default(), 9, RateUpdates::fixed()).await;

    assert_eq!(outcomes.len(), 9);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.succeeded, 6);
    for outcome in outcomes.iter().filter(|o| !o.is_success()) {
        assert_eq!(outcome.source, "test.csv");
        assert_eq!(outcome.result, Err(DispatchError::Status(500)));
        assert_eq!(outcome.id.parse::<usize>().unwrap() % 3, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout_is_reported() {
    let client = TestHttpClient::new().with_delay(|_| Duration::from_secs(5));
    let options = DispatchOptions::default().request_timeout(Duration::from_millis(200));

    let (outcomes, summary) = run_closed(client, options, 2, RateUpdates::fixed()).await;

    assert_eq!(summary.failed, 2);
    assert!(
        outcomes
            .iter()
            .all(|o| o.result == Err(DispatchError::Timeout(Duration::from_millis(200))))
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_aborts_slow_queries_after_grace() {
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let client = TestHttpClient::new()
        .with_notify(notify_tx)
        .with_delay(|id| {
            if id.parse::<usize>().unwrap() % 2 == 0 {
                Duration::from_secs(60)
            } else {
                Duration::from_millis(100)
            }
        });
    let options = DispatchOptions::default()
        .grace_period(Duration::from_secs(1))
        .no_request_timeout();
    let cancel = CancellationToken::new();

    let (input_tx, input_rx) = mpsc::channel(8);
    let (output_tx, output_rx) = mpsc::channel(8);
    for n in 0..4 {
        input_tx.send(query(n)).await.unwrap();
    }

    let run = tokio::spawn(Dispatcher::new(client, options).run(
        input_rx,
        output_tx,
        RateUpdates::fixed(),
        cancel.clone(),
    ));

    for _ in 0..4 {
        notify_rx.recv().await.unwrap();
    }
    // Queued after cancellation is requested; must never be admitted.
    input_tx.send(query(4)).await.unwrap();
    let started = Instant::now();
    cancel.cancel();

    let outcomes = collect(output_rx).await;
    let summary = run.await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(summary.admitted, 4);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.cancelled, 2);
    assert_eq!(outcomes.len(), 4);
    for outcome in &outcomes {
        let n: usize = outcome.id.parse().unwrap();
        if n % 2 == 0 {
            assert_eq!(outcome.result, Err(DispatchError::Cancelled));
        } else {
            assert!(outcome.is_success());
        }
    }
    drop(input_tx);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_any_work() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let (_input_tx, input_rx) = mpsc::channel::<Query>(1);
    let (output_tx, output_rx) = mpsc::channel(1);

    let summary = Dispatcher::new(TestHttpClient::new(), DispatchOptions::default())
        .run(input_rx, output_tx, RateUpdates::fixed(), cancel)
        .await;

    assert_eq!(summary, DispatchSummary::default());
    assert!(collect(output_rx).await.is_empty());
}
