//! Data layer: queries, outcomes and pacing configuration.

use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::error::DispatchError;

/// A signed request ready for dispatch, tagged with its record's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id:     String,
    pub source: String,
    pub url:    Url,
}

impl Query {
    pub fn new(id: impl Into<String>, source: impl Into<String>, url: Url) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            url,
        }
    }
}

/// Result of one query, correlated to its record by `id` and `source`.
///
/// Outcomes arrive in completion order, not admission order.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub id:     String,
    pub source: String,
    pub result: Result<Bytes, DispatchError>,
}

impl QueryOutcome {
    pub fn failed(id: impl Into<String>, source: impl Into<String>, error: DispatchError) -> Self {
        Self {
            id:     id.into(),
            source: source.into(),
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool { self.result.is_ok() }
}

/// Minimum spacing between two admissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pacing {
    interval: Duration,
}

impl Pacing {
    /// No spacing: every ready query is admitted at once.
    pub const UNPACED: Self = Self {
        interval: Duration::ZERO,
    };

    /// Spacing for a ceiling of `qps` queries per second; `0` means unpaced.
    pub fn from_qps(qps: u32) -> Self {
        if qps == 0 {
            Self::UNPACED
        } else {
            Self {
                interval: Duration::from_secs(1) / qps,
            }
        }
    }

    pub fn from_interval(interval: Duration) -> Self { Self { interval } }

    pub fn interval(&self) -> Duration { self.interval }

    pub fn is_unpaced(&self) -> bool { self.interval.is_zero() }
}

/// Configuration for a dispatch run.
///
/// # Examples
///
/// ```
/// use geobatch_dispatch::{DispatchOptions, Pacing};
/// use std::time::Duration;
///
/// let options = DispatchOptions::default()
///     .pacing(Pacing::from_qps(10))
///     .grace_period(Duration::from_secs(5))
///     .request_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Initial admission spacing; replaced by rate updates at runtime.
    ///
    /// Default: unpaced
    pub pacing: Pacing,

    /// How long in-flight queries may keep running after cancellation
    /// before they are aborted and reported as cancelled.
    ///
    /// Default: 10s
    pub grace_period: Duration,

    /// Upper bound for a single query; `None` waits indefinitely.
    ///
    /// Default: 30s
    pub request_timeout: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            pacing:          Pacing::UNPACED,
            grace_period:    Duration::from_secs(10),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl DispatchOptions {
    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn no_request_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }
}

/// Counts of what a dispatch run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    pub admitted:  usize,
    pub succeeded: usize,
    pub failed:    usize,
    pub cancelled: usize,
}

impl DispatchSummary {
    pub fn record(&mut self, outcome: &QueryOutcome) {
        match &outcome.result {
            Ok(_) => self.succeeded += 1,
            Err(DispatchError::Cancelled) => self.cancelled += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// Outcomes delivered so far.
    pub fn delivered(&self) -> usize { self.succeeded + self.failed + self.cancelled }
}
