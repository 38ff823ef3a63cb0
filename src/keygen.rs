//! Offline generation of subscription key material.
//!
//! Produces the server keypair and shared secret needed to subscribe an
//! endpoint to push notifications. The private key and shared secret must be
//! protected: anyone holding them can decrypt every notification for the
//! subscription. The shared secret is given to the push service exactly once
//! when subscribing; the private key is never shared. If either leaks,
//! delete the subscription and generate fresh keys.

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Length of the shared authentication secret.
const SHARED_SECRET_SIZE: usize = 16;

/// Freshly generated subscription key material, base64url encoded.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushKeys {
    /// Uncompressed P-256 public point (65 bytes decoded).
    pub public_key: String,
    /// Raw 32-byte P-256 private scalar.
    pub private_key: String,
    /// 16-byte shared authentication secret.
    pub shared_secret: String,
}

impl PushKeys {
    /// Generates a fresh P-256 keypair and shared auth secret.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_point = signing_key.verifying_key().to_encoded_point(false);

        let mut secret = [0u8; SHARED_SECRET_SIZE];
        rand::rng().fill_bytes(&mut secret);

        Self {
            public_key: BASE64URL.encode(public_point.as_bytes()),
            private_key: BASE64URL.encode(signing_key.to_bytes().as_slice()),
            shared_secret: BASE64URL.encode(secret),
        }
    }
}

/// Generates keys and prints them as pretty JSON to stdout.
pub fn print_keys() -> Result<()> {
    let keys = PushKeys::generate();
    println!("{}", serde_json::to_string_pretty(&keys)?);
    Ok(())
}
