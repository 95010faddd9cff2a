//! Turning records into signed queries.

use geobatch_dispatch::Query;
use geobatch_record::Record;
use geobatch_request::{RequestError, SigningKey, build_url};

use crate::config::GeocodeConfig;
use crate::error::Result;

/// Builds and signs one query per record.
#[derive(Debug, Clone, Default)]
pub struct QueryFactory {
    key:       Option<SigningKey>,
    client_id: Option<String>,
}

impl QueryFactory {
    pub fn new(key: Option<SigningKey>, client_id: Option<String>) -> Self { Self { key, client_id } }

    /// Decode the configured key once for the whole run.
    ///
    /// # Errors
    ///
    /// A key that fails to decode is fatal: every signature made with it
    /// would be rejected.
    pub fn from_config(config: &GeocodeConfig) -> Result<Self> {
        Ok(Self::new(
            config.signing_key()?,
            config.client_id().map(str::to_string),
        ))
    }

    /// Build the query for `record`, signing it when a key is configured.
    pub fn query(&self, record: &Record) -> std::result::Result<Query, RequestError> {
        let mut url = build_url(record.address(), record.sensor(), self.client_id.as_deref())?;
        if let Some(key) = &self.key {
            key.sign(&mut url);
        }
        Ok(Query::new(record.id(), record.source(), url))
    }
}
