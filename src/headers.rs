//! Push request header parsing.
//!
//! The push service sends three headers the pipeline cares about:
//!
//! ```text
//! authorization: WebPush <jwt>
//! crypto-key:    p256ecdsa=<base64url pubkey>;dh=<base64url ephemeral pubkey>
//! encryption:    salt=<base64url salt>
//! ```
//!
//! `crypto-key` and `encryption` are semicolon-delimited key/value fields
//! whose values are unpadded base64url. Everything here is pure parsing; no
//! side effects.

use std::collections::HashMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::VerifyingKey;

use crate::error::RelayError;
use crate::request::PushRequest;

/// Header carrying the `WebPush <jwt>` credential.
pub const AUTH_HEADER: &str = "authorization";
/// Header carrying the signing key and the sender's ephemeral ECDH key.
pub const CRYPTO_KEY_HEADER: &str = "crypto-key";
/// Header carrying the per-message salt.
pub const ENCRYPTION_HEADER: &str = "encryption";

const P256_ECDSA_FIELD: &str = "p256ecdsa";
const DH_FIELD: &str = "dh";
const SALT_FIELD: &str = "salt";

/// Scheme prefix of the authorization header. Case sensitive.
const AUTH_SCHEME_PREFIX: &str = "WebPush ";

/// Parses a semicolon-delimited key/value header field.
///
/// Every segment must contain exactly one `=`; a segment that does not is a
/// fatal parse error carrying the offending segment.
pub fn parse_key_val_header(raw: &str) -> Result<HashMap<String, String>, RelayError> {
    let mut result = HashMap::new();
    for pair in raw.split(';') {
        let parts: Vec<&str> = pair.split('=').collect();
        if parts.len() != 2 {
            return Err(RelayError::InvalidHeader(format!(
                "invalid key/val header: [{pair}]"
            )));
        }
        result.insert(parts[0].to_string(), parts[1].to_string());
    }
    Ok(result)
}

/// Extracts the bearer token from the authorization header.
///
/// The scheme prefix must be exactly `WebPush `; `Bearer` or a
/// case-mangled `webPush` is rejected as an invalid header.
pub fn bearer_token(request: &PushRequest) -> Result<String, RelayError> {
    let header = request
        .header(AUTH_HEADER)
        .ok_or(RelayError::MissingHeader(AUTH_HEADER))?;

    let Some(token) = header.strip_prefix(AUTH_SCHEME_PREFIX) else {
        return Err(RelayError::InvalidHeader(AUTH_HEADER.to_string()));
    };
    Ok(token.to_string())
}

/// Decodes an unpadded base64url value, tagging failures with the field name.
pub fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, RelayError> {
    BASE64URL
        .decode(value)
        .map_err(|source| RelayError::NotBase64Encoded { field, source })
}

/// The sender's ephemeral public key from the `dh` field of `crypto-key`.
pub fn sender_public_key(request: &PushRequest) -> Result<Vec<u8>, RelayError> {
    let value = key_val_field(request, CRYPTO_KEY_HEADER, DH_FIELD)?;
    decode_field("sender public key", &value)
}

/// The per-message salt from the `salt` field of `encryption`.
pub fn salt(request: &PushRequest) -> Result<Vec<u8>, RelayError> {
    let value = key_val_field(request, ENCRYPTION_HEADER, SALT_FIELD)?;
    decode_field("salt", &value)
}

/// The ECDSA verifying key from the `p256ecdsa` field of `crypto-key`,
/// decoded from its raw uncompressed SEC1 point form.
pub fn verifying_key(request: &PushRequest) -> Result<VerifyingKey, RelayError> {
    let value = key_val_field(request, CRYPTO_KEY_HEADER, P256_ECDSA_FIELD)?;
    if value.is_empty() {
        return Err(RelayError::InvalidInput("public key cannot be empty"));
    }

    let point = decode_field("verifier public key", &value)?;
    VerifyingKey::from_sec1_bytes(&point)
        .map_err(|_| RelayError::CryptoFailure("elliptic point decode failed".to_string()))
}

/// Looks up `header`, parses it as key/value pairs, and returns the value
/// under `key`. A missing key yields an empty string; downstream length
/// validation catches it.
fn key_val_field(
    request: &PushRequest,
    header: &'static str,
    key: &str,
) -> Result<String, RelayError> {
    let raw = request
        .header(header)
        .ok_or(RelayError::MissingHeader(header))?;
    let fields = parse_key_val_header(raw)?;
    Ok(fields.get(key).cloned().unwrap_or_default())
}
