//! Effects layer: HTTP I/O and the dispatch coordinator.

mod control;
mod dispatcher;
mod http;

pub use control::{RateControl, RateUpdates, rate_channel};
pub use dispatcher::Dispatcher;
pub use http::HttpClient;

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
