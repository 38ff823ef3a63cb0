//! Pushbridge - Web Push fan-out relay.
//!
//! This crate receives encrypted Web Push notifications from a push service
//! (Mastodon-style: VAPID ES256 JWT authentication plus the legacy `aesgcm`
//! content encoding), verifies and decrypts them, and fans the plaintext out
//! to the broker topics encoded in the request path.
//!
//! # Architecture
//!
//! ```text
//! push service ──► front door (serve / replay)
//!                      ▼
//!                  PushRequest
//!                      ▼
//!   pipeline: extract ► verify JWT ► decrypt ► resolve targets
//!                      ▼
//!   notify: sequential fan-out, first failure aborts
//!                      ▼
//!              201 ok / 500 fail (push service retries on 500)
//! ```
//!
//! # Modules
//!
//! - [`pipeline`] - Request orchestration, the single entry contract
//! - [`jwt`] - VAPID ES256 token verification
//! - [`payload`] - `aesgcm` Web Push encrypt/decrypt
//! - [`notify`] - Notifier capability + fan-out dispatcher
//! - [`server`] / [`replay`] - HTTP front door and local event harness

// Library modules
pub mod config;
pub mod error;
pub mod headers;
pub mod jwt;
pub mod keygen;
pub mod notify;
pub mod payload;
pub mod pipeline;
pub mod replay;
pub mod request;
pub mod server;
pub mod targets;

// Re-export commonly used types
pub use config::Config;
pub use error::RelayError;
pub use request::{PushRequest, PushResponse};
