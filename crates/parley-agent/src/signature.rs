//! Webhook signature verification.
//!
//! The platform signs each webhook with a header of the form
//! `t=<unix seconds>,v1=<hex HMAC-SHA256>`, where the MAC covers
//! `"<t>.<raw body>"` under the shared webhook secret.

use crate::error::SignatureError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "layercode-signature";

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, timestamp: i64, body: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}

/// Produces a signature header value for `body` at `timestamp`.
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let digest = mac_for(secret, timestamp, body).finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex::encode(digest))
}

/// Verifies a signature header against the raw request body.
///
/// `now` is the current Unix time in seconds; signatures whose timestamp is
/// more than `tolerance_secs` away from it are rejected. The MAC comparison
/// is constant-time.
///
/// # Errors
///
/// Returns [`SignatureError`] describing why the check failed. An empty
/// secret always fails with [`SignatureError::NoSecret`].
pub fn verify(
    header: &str,
    body: &[u8],
    secret: &str,
    tolerance_secs: u64,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NoSecret);
    }

    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signature = hex::decode(value).ok(),
            _ => {}
        }
    }
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(SignatureError::Malformed);
    };

    if now.abs_diff(timestamp) > tolerance_secs {
        return Err(SignatureError::Expired);
    }

    mac_for(secret, timestamp, body)
        .verify_slice(&signature)
        .map_err(|_| SignatureError::Mismatch)
}
