//! Geocoding request construction and signing.
//!
//! # Architecture
//!
//! - [`build_url`] - unsigned query URL against [`GEOCODE_ENDPOINT`]
//! - [`SigningKey`] / [`sign_url`] - HMAC-SHA1 signature over the request
//!   target, appended as the `signature` parameter
//!
//! # Example
//!
//! ```
//! use geobatch_request::{SigningKey, build_url};
//!
//! let key = SigningKey::from_base64("vNIXE0xscrmjlyV-12Nj_BvUPaw=").unwrap();
//! let mut url = build_url("New York", false, Some("gme-example")).unwrap();
//! key.sign(&mut url);
//!
//! assert!(url.query().unwrap().contains("&signature="));
//! ```

pub use self::build::{CLIENT_ID_PREFIX, GEOCODE_ENDPOINT, build_url, validate_client_id};
pub use self::error::{RequestError, Result};
pub use self::sign::{SIGNATURE_PARAM, SigningKey, request_target, sign_url, strip_signature};

mod build;
mod error;
mod sign;
