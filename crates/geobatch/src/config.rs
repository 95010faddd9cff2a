//! Run configuration: rate ceiling, signing key and client id.
//!
//! Built once by the caller and passed by reference; nothing here is
//! global. Only the rate ceiling can change after a run starts, through
//! [`RateControl`](geobatch_dispatch::RateControl).

use std::fmt;
use std::path::Path;

use geobatch_dispatch::Pacing;
use geobatch_request::{SigningKey, validate_client_id};
use serde::Deserialize;

use crate::error::{GeobatchError, Result};

pub const ENV_QPS: &str = "GEOBATCH_QPS";
pub const ENV_KEY: &str = "GEOBATCH_KEY";
pub const ENV_CLIENT_ID: &str = "GEOBATCH_CLIENT_ID";

const DEFAULT_QPS: u32 = 10;

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocodeConfig {
    /// Queries per second; `0` disables pacing.
    pub qps:       u32,
    /// URL-safe base64 signing key. Requests go out unsigned without one.
    pub key:       Option<String>,
    /// Enterprise client id, must start with `gme-`.
    pub client_id: Option<String>,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            qps:       DEFAULT_QPS,
            key:       None,
            client_id: None,
        }
    }
}

impl fmt::Debug for GeocodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocodeConfig")
            .field("qps", &self.qps)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl GeocodeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| GeobatchError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| GeobatchError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    /// Read `GEOBATCH_QPS`, `GEOBATCH_KEY` and `GEOBATCH_CLIENT_ID`.
    pub fn from_env() -> Result<Self> { Self::from_lookup(|name| std::env::var(name).ok()) }

    /// Build from any variable lookup; unset or empty values keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let qps = match get(ENV_QPS) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| GeobatchError::Config(format!("{ENV_QPS}={raw:?}: {e}")))?,
            None => DEFAULT_QPS,
        };

        Ok(Self {
            qps,
            key: get(ENV_KEY),
            client_id: get(ENV_CLIENT_ID),
        })
    }

    /// Decode the signing key, if one is configured.
    pub fn signing_key(&self) -> Result<Option<SigningKey>> {
        self.key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(SigningKey::from_base64)
            .transpose()
            .map_err(GeobatchError::from)
    }

    pub fn client_id(&self) -> Option<&str> { self.client_id.as_deref().filter(|id| !id.is_empty()) }

    pub fn pacing(&self) -> Pacing { Pacing::from_qps(self.qps) }

    /// Check the key and client id eagerly instead of per record.
    pub fn validate(&self) -> Result<()> {
        self.signing_key()?;
        if let Some(id) = self.client_id() {
            validate_client_id(id)?;
        }
        Ok(())
    }
}
