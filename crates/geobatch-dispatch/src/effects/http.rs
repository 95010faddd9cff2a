use std::future::Future;

use bytes::Bytes;
use url::Url;

use crate::error::DispatchError;

/// Asynchronous HTTP client abstraction.
///
/// This trait provides the one operation the dispatcher needs: a GET whose
/// response body is returned whole. The payload is not interpreted here.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations, mapped onto the per-query outcome.
    type Error: Into<DispatchError> + Send + 'static;

    /// Issue a GET request for `url` and return the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (DNS failure, connection error,
    /// non-success HTTP status, etc.).
    fn get(&self, url: &Url) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Create a new ReqwestClient with default configuration.
        pub fn new() -> Result<Self, DispatchError> {
            let client = reqwest::Client::builder().build()?;
            Ok(Self { client })
        }

        /// Wrap an already configured client.
        pub fn with_client(client: reqwest::Client) -> Self { Self { client } }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn get(&self, url: &Url) -> Result<Bytes, Self::Error> {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await?
                .error_for_status()?;
            response.bytes().await
        }
    }

    impl From<reqwest::Error> for DispatchError {
        fn from(e: reqwest::Error) -> Self {
            match e.status() {
                Some(status) => DispatchError::Status(status.as_u16()),
                None => DispatchError::Transport(e.to_string()),
            }
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
