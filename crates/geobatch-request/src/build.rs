//! Unsigned query URL construction.

use once_cell::sync::Lazy;
use url::Url;

use crate::error::{RequestError, Result};

/// Geocoding endpoint every query is built against.
pub const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Required prefix of enterprise client identifiers.
pub const CLIENT_ID_PREFIX: &str = "gme-";

// The endpoint is a constant, so a parse failure is a build defect.
static ENDPOINT: Lazy<Url> =
    Lazy::new(|| Url::parse(GEOCODE_ENDPOINT).expect("GEOCODE_ENDPOINT must be a valid URL"));

/// Build the unsigned query URL for one address.
///
/// Parameters are emitted in key order (`address`, `client`, `sensor`) and
/// form-urlencoded once, so the same inputs always produce the same bytes
/// for the signer. An empty `client_id` is treated as absent.
///
/// # Errors
///
/// Returns [`RequestError::InvalidClientId`] if a client id is given that
/// does not start with [`CLIENT_ID_PREFIX`].
pub fn build_url(address: &str, sensor: bool, client_id: Option<&str>) -> Result<Url> {
    let client_id = client_id.filter(|id| !id.is_empty());
    if let Some(id) = client_id {
        validate_client_id(id)?;
    }

    let mut url = ENDPOINT.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair("address", address);
        if let Some(id) = client_id {
            query.append_pair("client", id);
        }
        query.append_pair("sensor", if sensor { "true" } else { "false" });
    }
    Ok(url)
}

pub fn validate_client_id(client_id: &str) -> Result<()> {
    if client_id.starts_with(CLIENT_ID_PREFIX) {
        Ok(())
    } else {
        Err(RequestError::InvalidClientId(client_id.to_string()))
    }
}
