//! Typed error kinds for the relay pipeline.
//!
//! Every failure a request can hit maps to one of these variants. Each keeps
//! its originating field or step for diagnostics, but never raw key material
//! or ciphertext, only lengths and non-sensitive identifiers only.

use thiserror::Error;

/// Errors surfaced while verifying, decrypting, or fanning out a push.
#[derive(Error, Debug)]
pub enum RelayError {
    /// A required header was absent from the request.
    #[error("expected header not found: {0}")]
    MissingHeader(&'static str),

    /// A header was present but malformed: bad key/value syntax or an
    /// unexpected authorization scheme.
    #[error("header contains invalid contents: {0}")]
    InvalidHeader(String),

    /// A field expected to be base64 encoded failed to decode.
    #[error("input is not base64 encoded [{field}]: {source}")]
    NotBase64Encoded {
        /// Which field failed to decode.
        field: &'static str,
        /// The underlying decode error.
        #[source]
        source: base64::DecodeError,
    },

    /// The request body was not carried with a binary-safe encoding.
    #[error("request body is not binary safe")]
    NotBinarySafe,

    /// Input that decoded but cannot be processed.
    #[error("invalid input received: {0}")]
    InvalidInput(&'static str),

    /// The token is signed with something other than ES256.
    #[error("unexpected signing method: {0}")]
    InvalidSigningMethod(String),

    /// Token parsing, signature, or claim validation failed.
    #[error("token verification failed: {0}")]
    SignatureInvalid(String),

    /// ECDH, key derivation, or AEAD failure.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// A path segment could not be decoded into a target identifier.
    #[error("target decode failed: {0}")]
    TargetDecodeFailed(#[source] base64::DecodeError),

    /// A downstream delivery failed at the transport level.
    #[error("delivery to {target} failed: {reason}")]
    DeliveryFailed {
        /// The opaque target identifier that failed.
        target: String,
        /// Transport-level failure description.
        reason: String,
    },
}
