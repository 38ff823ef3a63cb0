//! Downstream delivery: the `Notifier` capability and the fan-out dispatcher.
//!
//! Each decoded target is handed to a [`Notifier`] selected by
//! [`notifier_for`]: the broker notifier publishes the message over HTTP to
//! `{broker_url}/{target}`, the dev notifier logs it instead. Delivery is
//! strictly sequential in path order and stops at the first failure;
//! ordering and at-most-one-in-flight per request is a deliberate
//! simplicity/observability trade-off, not a throughput optimization.
//!
//! # At-least-once
//!
//! The push service retries the entire inbound request whenever the relay
//! answers with a failure status, so earlier targets in the list get the same
//! message again on every retry. Every subscriber behind a target MUST be
//! prepared to process duplicate messages. The dispatcher assumes this
//! contract; it cannot enforce it.

use std::sync::OnceLock;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::RelayError;

/// Shared HTTP client for broker publishes.
///
/// Created at most once per process lifetime; `OnceLock` guards the race
/// when concurrent requests initialize it on first use.
static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .build()
            .expect("default client construction cannot fail")
    })
}

/// A receiver of decrypted push messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `message` to this notifier's target.
    async fn deliver(&self, message: &str) -> Result<(), RelayError>;

    /// The opaque target identifier this notifier publishes to.
    fn target(&self) -> &str;
}

/// Selects the delivery implementation for a decoded target.
pub fn notifier_for(target: String, config: &Config) -> Box<dyn Notifier> {
    if config.dev_delivery {
        Box::new(LogNotifier { target })
    } else {
        Box::new(BrokerNotifier {
            target,
            broker_url: config.broker_url.clone(),
        })
    }
}

/// Publishes messages to a broker topic over HTTP.
struct BrokerNotifier {
    target: String,
    broker_url: String,
}

#[async_trait]
impl Notifier for BrokerNotifier {
    async fn deliver(&self, message: &str) -> Result<(), RelayError> {
        let url = format!("{}/{}", self.broker_url.trim_end_matches('/'), self.target);
        let response = http_client()
            .post(&url)
            .body(message.to_string())
            .send()
            .await
            .map_err(|e| RelayError::DeliveryFailed {
                target: self.target.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::DeliveryFailed {
                target: self.target.clone(),
                reason: format!("broker returned HTTP {}", status.as_u16()),
            });
        }
        log::debug!("[Dispatch] delivered to {}", self.target);
        Ok(())
    }

    fn target(&self) -> &str {
        &self.target
    }
}

/// Development stand-in that logs the message instead of publishing it.
struct LogNotifier {
    target: String,
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, message: &str) -> Result<(), RelayError> {
        log::info!("[DevNotify] target={} {message}", self.target);
        Ok(())
    }

    fn target(&self) -> &str {
        &self.target
    }
}

/// Per-target result of a fan-out pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The target acknowledged the message.
    Delivered,
    /// The delivery failed at the transport level.
    Failed(String),
}

/// Outcomes for every attempted target, in path order.
///
/// Targets after the first failure are never attempted and carry no outcome.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// `(target, outcome)` pairs in attempt order.
    pub outcomes: Vec<(String, DeliveryOutcome)>,
}

impl DeliveryReport {
    /// True iff every attempted delivery succeeded (vacuously true for an
    /// empty target list).
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| *outcome == DeliveryOutcome::Delivered)
    }

    /// Number of deliveries attempted.
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Collapses the report into a terminal pipeline value: first failure wins.
    pub fn into_result(self) -> Result<(), RelayError> {
        for (target, outcome) in self.outcomes {
            if let DeliveryOutcome::Failed(reason) = outcome {
                return Err(RelayError::DeliveryFailed { target, reason });
            }
        }
        Ok(())
    }
}

/// Sequential fan-out of one message to an ordered target list.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    config: &'a Config,
}

impl<'a> Dispatcher<'a> {
    /// Builds a dispatcher over the process configuration.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Delivers `message` to every target, strictly in path order, one at a
    /// time. Stops at the first failure; later targets are never attempted
    /// in this request. The caller's retry covers them.
    ///
    /// There is no internal timeout: cancellation comes from the calling
    /// environment's invocation deadline (dropping this future aborts
    /// between deliveries, which the caller surfaces as a failure).
    pub async fn dispatch(&self, message: &str, targets: &[String]) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for target in targets {
            let notifier = notifier_for(target.clone(), self.config);
            match notifier.deliver(message).await {
                Ok(()) => {
                    report
                        .outcomes
                        .push((target.clone(), DeliveryOutcome::Delivered));
                }
                Err(err) => {
                    log::error!("[Dispatch] delivery failed: {err}");
                    report
                        .outcomes
                        .push((target.clone(), DeliveryOutcome::Failed(err.to_string())));
                    break;
                }
            }
        }
        report
    }
}
