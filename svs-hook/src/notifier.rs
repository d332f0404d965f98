//! Outbound SMS replies
//!
//! The provider receives a form POST with `receptor` and `message`. Transport
//! errors, 429 and 5xx responses are retried with exponential backoff; any
//! other 4xx is permanent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use svs_common::config::NotifierConfig;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Notification failure
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier setup failed: {0}")]
    Setup(String),

    #[error("Provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Sends a text message to a recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), NotifyError>;
}

/// Build the notifier described by the configuration
pub fn from_config(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.url {
        Some(url) if !url.trim().is_empty() => Ok(Arc::new(HttpNotifier::new(url, config)?)),
        _ => {
            info!("No notifier URL configured, outbound replies are disabled");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}

/// Logs replies instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
        info!(recipient, body, "Notifier disabled, reply not sent");
        Ok(())
    }
}

enum AttemptError {
    Retryable(String),
    Permanent(NotifyError),
}

/// HTTP provider client with retry
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl HttpNotifier {
    pub fn new(url: &str, config: &NotifierConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| NotifyError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        })
    }

    async fn attempt(&self, recipient: &str, body: &str) -> Result<(), AttemptError> {
        let response = self
            .client
            .post(&self.url)
            .form(&[("receptor", recipient), ("message", body)])
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(AttemptError::Retryable(format!("status {}: {}", status.as_u16(), text)))
        } else {
            Err(AttemptError::Permanent(NotifyError::Rejected {
                status: status.as_u16(),
                body: text,
            }))
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.attempt(recipient, body).await {
                Ok(()) => {
                    debug!(recipient, attempt, "Reply sent");
                    return Ok(());
                }
                Err(AttemptError::Permanent(e)) => {
                    error!(recipient, attempt, error = %e, "Reply rejected by provider");
                    return Err(e);
                }
                Err(AttemptError::Retryable(last_error)) if attempt >= self.max_attempts => {
                    error!(recipient, attempt, error = %last_error, "Reply failed, giving up");
                    return Err(NotifyError::Exhausted {
                        attempts: attempt,
                        last_error,
                    });
                }
                Err(AttemptError::Retryable(last_error)) => {
                    warn!(
                        recipient,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %last_error,
                        "Reply failed, will retry after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }
    }
}
