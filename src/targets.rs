//! Delivery target resolution.
//!
//! Each segment of the request path is an unpadded base64url encoding of an
//! opaque target identifier. Path order is delivery order.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};

use crate::error::RelayError;

/// Decodes the slash-delimited target list from a request path.
///
/// Empty segments are dropped, so a trailing slash is immaterial. A segment
/// that fails to decode aborts the whole resolution; partial lists are
/// never returned.
pub fn resolve(path: &str) -> Result<Vec<String>, RelayError> {
    let mut targets = Vec::new();
    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }
        let decoded = BASE64URL
            .decode(segment)
            .map_err(RelayError::TargetDecodeFailed)?;
        targets.push(String::from_utf8_lossy(&decoded).into_owned());
    }
    Ok(targets)
}
