//! HMAC-SHA1 request signing.
//!
//! The signature covers the request target exactly as sent on the wire
//! (`/path?query`, without scheme or host). It is encoded with the
//! URL-safe, padded base64 alphabet and appended as the last `signature`
//! query parameter.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::{Position, Url};

use crate::error::{RequestError, Result};

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_PARAM: &str = "signature";

/// A decoded signing key, keyed once and reused for every request.
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha1,
}

impl SigningKey {
    /// Decode a URL-safe base64 key.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidKey`] when the key uses the wrong
    /// alphabet or padding.
    pub fn from_base64(key: &str) -> Result<Self> {
        let decoded = URL_SAFE
            .decode(key)
            .map_err(|e| RequestError::InvalidKey(e.to_string()))?;
        let mac = HmacSha1::new_from_slice(&decoded)
            .map_err(|e| RequestError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Compute the signature for `url` as it currently stands.
    pub fn signature(&self, url: &Url) -> String {
        let mut mac = self.mac.clone();
        mac.update(request_target(url).as_bytes());
        URL_SAFE.encode(mac.finalize().into_bytes())
    }

    /// Sign `url` in place.
    ///
    /// Any existing `signature` parameter is dropped first, so signing an
    /// already signed URL yields the same result as signing it once.
    pub fn sign(&self, url: &mut Url) {
        strip_signature(url);
        let signature = self.signature(url);
        let query = match url.query() {
            Some(query) if !query.is_empty() => format!("{query}&{SIGNATURE_PARAM}={signature}"),
            _ => format!("{SIGNATURE_PARAM}={signature}"),
        };
        url.set_query(Some(&query));
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("SigningKey(..)") }
}

/// Decode `key` and sign `url` with it.
pub fn sign_url(url: &mut Url, key: &str) -> Result<()> {
    SigningKey::from_base64(key)?.sign(url);
    Ok(())
}

/// `path?query` exactly as it appears in the request line.
pub fn request_target(url: &Url) -> &str { &url[Position::BeforePath..Position::AfterQuery] }

/// Remove `signature` pairs while leaving every other raw pair untouched.
pub fn strip_signature(url: &mut Url) {
    let Some(query) = url.query() else {
        return;
    };
    let prefix = format!("{SIGNATURE_PARAM}=");
    if !query.split('&').any(|pair| pair.starts_with(&prefix)) {
        return;
    }

    let kept = query
        .split('&')
        .filter(|pair| !pair.starts_with(&prefix))
        .collect::<Vec<_>>()
        .join("&");
    url.set_query(if kept.is_empty() { None } else { Some(&kept) });
}
