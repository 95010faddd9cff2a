//! Batch geocoding client.
//!
//! Reads address records from delimited files, builds signed query URLs
//! against the geocoding API, dispatches them under a live-adjustable rate
//! ceiling and streams back one outcome per record.
//!
//! # Architecture
//!
//! The work is split across focused crates, re-exported here:
//! - [`geobatch_record`] - [`Record`] model and lenient ingestion
//! - [`geobatch_request`] - URL building and HMAC-SHA1 signing
//! - [`geobatch_dispatch`] - the rate-limited dispatch coordinator
//!
//! This crate adds the [`GeocodeConfig`] and wires the stages together in
//! [`BatchRun`].
//!
//! # Example
//!
//! ```no_run
//! use geobatch::{BatchOptions, GeocodeConfig, ReqwestClient, run_batch};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> geobatch::Result<()> {
//! let config = GeocodeConfig::from_env()?;
//! let client = ReqwestClient::new()?;
//! let (tx, mut rx) = mpsc::channel::<geobatch::QueryOutcome>(64);
//!
//! let printer = tokio::spawn(async move {
//!     while let Some(outcome) = rx.recv().await {
//!         println!("{} {}: {}", outcome.source, outcome.id, outcome.is_success());
//!     }
//! });
//!
//! let files = vec!["addresses.csv".into()];
//! let summary = run_batch(config, files, BatchOptions::default(), client, tx, CancellationToken::new()).await?;
//! printer.await.ok();
//! println!("{} ok, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod query;
mod run;

pub use config::{ENV_CLIENT_ID, ENV_KEY, ENV_QPS, GeocodeConfig};
pub use error::{GeobatchError, Result};
pub use query::QueryFactory;
pub use run::{BatchOptions, BatchRun, RunSummary, run_batch};

pub use geobatch_dispatch::{
    DispatchError, DispatchOptions, DispatchSummary, HttpClient, Pacing, Query, QueryOutcome,
    RateControl,
};
pub use geobatch_record::{IngestError, IngestFailure, Record};
pub use geobatch_request::{RequestError, SigningKey};

#[cfg(feature = "reqwest")]
pub use geobatch_dispatch::ReqwestClient;

pub use geobatch_dispatch;
pub use geobatch_record;
pub use geobatch_request;
