//! Rate-limited concurrent dispatch of geocoding queries.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Queries, outcomes, pacing and options
//! - `core` - Pure admission scheduling
//! - `effects` - HTTP I/O and the coordinator task
//!
//! # Key Features
//!
//! - **Single owner**: only the coordinator reads or writes the pacing state
//! - **Live pacing**: [`RateControl`] updates apply before the next admission
//! - **No lost outcomes**: every admitted query yields exactly one outcome
//! - **Bounded shutdown**: cancellation waits a grace period, then aborts

mod core;
mod data;
mod effects;
mod error;

pub use self::core::{admission_deadline, slot_open};
pub use data::{DispatchOptions, DispatchSummary, Pacing, Query, QueryOutcome};
pub use effects::{Dispatcher, HttpClient, RateControl, RateUpdates, rate_channel};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{DispatchError, Result};
