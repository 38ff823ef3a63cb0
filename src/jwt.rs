//! VAPID token verification.
//!
//! The push service authenticates itself with a compact ES256 JWT carried in
//! the `authorization` header, verifiable against the `p256ecdsa` key it
//! published when the subscription was created. Only ES256 is acceptable;
//! in particular, HMAC algorithms are rejected outright so a token signed
//! with the (public!) verification key bytes can never pass.
//!
//! Rust guideline compliant 2026-02

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use p256::ecdsa::VerifyingKey;

use crate::error::RelayError;

/// A compact-serialized signed token, its expected audience, and the ECDSA
/// public key needed to verify it.
///
/// Built once per request and consumed exactly once by [`verify`].
#[derive(Clone, Debug)]
pub struct VerifiableToken {
    /// The compact JWT from the authorization header.
    pub token: String,
    /// Expected audience: `https://` + the request hostname.
    pub audience: String,
    /// P-256 key the token must verify against.
    pub verifier_key: VerifyingKey,
}

/// Verifies the token's signature, audience, and expiry.
///
/// A token signed with anything other than ES256 fails with
/// `InvalidSigningMethod`; expired, audience-mismatched, or badly-signed
/// tokens all surface as `SignatureInvalid` with the library diagnostic
/// attached.
pub fn verify(vtoken: &VerifiableToken) -> Result<(), RelayError> {
    let header = jsonwebtoken::decode_header(&vtoken.token)
        .map_err(|e| RelayError::SignatureInvalid(e.to_string()))?;
    if header.alg != Algorithm::ES256 {
        return Err(RelayError::InvalidSigningMethod(format!("{:?}", header.alg)));
    }

    let point = vtoken.verifier_key.to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        return Err(RelayError::CryptoFailure(
            "verifier key has no affine coordinates".to_string(),
        ));
    };
    let key = DecodingKey::from_ec_components(&BASE64URL.encode(x), &BASE64URL.encode(y))
        .map_err(|e| RelayError::SignatureInvalid(e.to_string()))?;

    let mut validation = Validation::new(Algorithm::ES256);
    validation.set_audience(&[&vtoken.audience]);
    validation.set_required_spec_claims(&["exp", "aud"]);

    // Claim checks happen inside jsonwebtoken; the deserialized value is unused.
    jsonwebtoken::decode::<serde_json::Value>(&vtoken.token, &key, &validation)
        .map_err(|e| RelayError::SignatureInvalid(e.to_string()))?;
    Ok(())
}
