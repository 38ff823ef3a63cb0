//! The request pipeline: verify, decrypt, resolve, fan out.
//!
//! One inbound event flows left to right; every stage returns a terminal
//! error value on failure and no later stage runs:
//!
//! ```text
//! event ──► token extracted ──► payload extracted ──► token verified*
//!       ──► decrypted* ──► targets resolved ──► dispatched ──► 201 {"status":"ok"}
//!                  any failure ──────────────────────────────► 500 {"status":"fail"}
//!
//! * skippable via operator/test overrides, always logged at warn level
//! ```
//!
//! There is no retry or backoff here; the push service retries the whole
//! request on a 500, which is also why downstream targets must tolerate
//! duplicate deliveries.

use crate::config::Config;
use crate::error::RelayError;
use crate::jwt;
use crate::notify::Dispatcher;
use crate::payload;
use crate::request::{PushRequest, PushResponse};

/// Status returned when every delivery succeeded.
const STATUS_CREATED: u16 = 201;
/// Status returned on any extraction, verification, or delivery failure.
const STATUS_ERROR: u16 = 500;

/// Processes one inbound push event end to end and maps the outcome to the
/// caller-visible status. Never panics; every pipeline error is recovered
/// here and reported as a failure response.
pub async fn handle(request: &PushRequest, config: &Config) -> PushResponse {
    match run(request, config).await {
        Ok(()) => PushResponse::new(STATUS_CREATED, "ok"),
        Err(err) => {
            log::error!("[Pipeline] request failed: {err}");
            PushResponse::new(STATUS_ERROR, "fail")
        }
    }
}

async fn run(request: &PushRequest, config: &Config) -> Result<(), RelayError> {
    let vtoken = request.extract_token()?;
    let encrypted = request.extract_payload(config)?;

    if config.skip_jwt_verify {
        log::warn!("[Pipeline] JWT VERIFICATION IS DISABLED!");
    } else {
        jwt::verify(&vtoken)?;
    }

    let message = if config.skip_payload_decrypt {
        log::warn!("[Pipeline] payload decryption is disabled; forwarding body as-is");
        String::from_utf8_lossy(&encrypted.data).into_owned()
    } else {
        payload::decrypt(&encrypted)?
    };
    log::debug!("[Pipeline] payload decrypted ({} bytes)", message.len());

    let targets = request.extract_targets()?;
    log::debug!("[Pipeline] dispatching to {} target(s)", targets.len());

    Dispatcher::new(config)
        .dispatch(&message, &targets)
        .await
        .into_result()
}
