//! Process configuration from environment variables.
//!
//! Read once at startup and shared read-only by every in-flight request.
//! The two secrets are required; everything else has a default. Missing
//! required secrets abort startup; that is the only permitted crash path.
//!
//! | Variable | Meaning |
//! |---|---|
//! | `PUSHBRIDGE_BROKER_URL` | base URL of the downstream publish endpoint |
//! | `PUSHBRIDGE_PRIVATE_KEY` | base64url server P-256 private scalar (required) |
//! | `PUSHBRIDGE_SHARED_SECRET` | base64url 16-byte shared auth secret (required) |
//! | `PUSHBRIDGE_SKIP_JWT_VERIFY` | operator verification bypass |
//! | `PUSHBRIDGE_SKIP_PAYLOAD_DECRYPT` | test-only decryption bypass |
//! | `PUSHBRIDGE_DEV_DELIVERY` | log-only delivery stand-in |
//! | `PUSHBRIDGE_BIND_ADDR` | listen address for `serve` |

use anyhow::{bail, Result};

const BROKER_URL_VAR: &str = "PUSHBRIDGE_BROKER_URL";
const PRIVATE_KEY_VAR: &str = "PUSHBRIDGE_PRIVATE_KEY";
const SHARED_SECRET_VAR: &str = "PUSHBRIDGE_SHARED_SECRET";
const SKIP_JWT_VERIFY_VAR: &str = "PUSHBRIDGE_SKIP_JWT_VERIFY";
const SKIP_PAYLOAD_DECRYPT_VAR: &str = "PUSHBRIDGE_SKIP_PAYLOAD_DECRYPT";
const DEV_DELIVERY_VAR: &str = "PUSHBRIDGE_DEV_DELIVERY";
const BIND_ADDR_VAR: &str = "PUSHBRIDGE_BIND_ADDR";

const DEFAULT_BROKER_URL: &str = "http://localhost:8080";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";

/// Configuration for the relay.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the downstream publish endpoint (routing hint for the
    /// delivery transport).
    pub broker_url: String,
    /// Base64url-encoded server P-256 private scalar.
    pub private_key: String,
    /// Base64url-encoded 16-byte shared authentication secret.
    pub shared_secret: String,
    /// Operator override: skip JWT verification (logged loudly when set).
    pub skip_jwt_verify: bool,
    /// Test-only override: skip payload decryption.
    pub skip_payload_decrypt: bool,
    /// Deliver to the log instead of the broker.
    pub dev_delivery: bool,
    /// Listen address for the HTTP front door.
    pub bind_addr: String,
}

// Secrets never appear in Debug output, only their lengths.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("broker_url", &self.broker_url)
            .field("private_key_len", &self.private_key.len())
            .field("shared_secret_len", &self.shared_secret.len())
            .field("skip_jwt_verify", &self.skip_jwt_verify)
            .field("skip_payload_decrypt", &self.skip_payload_decrypt)
            .field("dev_delivery", &self.dev_delivery)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            private_key: String::new(),
            shared_secret: String::new(),
            skip_jwt_verify: false,
            skip_payload_decrypt: false,
            dev_delivery: false,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Reads configuration from `PUSHBRIDGE_*` environment variables.
    ///
    /// Errors if either required secret is unset or empty.
    pub fn from_env() -> Result<Self> {
        let private_key = match std::env::var(PRIVATE_KEY_VAR) {
            Ok(value) if !value.is_empty() => value,
            _ => bail!("{PRIVATE_KEY_VAR} must be set"),
        };
        let shared_secret = match std::env::var(SHARED_SECRET_VAR) {
            Ok(value) if !value.is_empty() => value,
            _ => bail!("{SHARED_SECRET_VAR} must be set"),
        };

        Ok(Self {
            broker_url: env_or(BROKER_URL_VAR, DEFAULT_BROKER_URL),
            private_key,
            shared_secret,
            skip_jwt_verify: env_flag(SKIP_JWT_VERIFY_VAR),
            skip_payload_decrypt: env_flag(SKIP_PAYLOAD_DECRYPT_VAR),
            dev_delivery: env_flag(DEV_DELIVERY_VAR),
            bind_addr: env_or(BIND_ADDR_VAR, DEFAULT_BIND_ADDR),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
