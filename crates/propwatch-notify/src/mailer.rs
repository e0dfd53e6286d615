//! HTTP mail-relay transport.
//!
//! Mail leaves the engine as a JSON POST to a relay service; the relay
//! owns actual SMTP delivery. The request timeout lives here, so a
//! hung relay surfaces as an isolated per-member dispatch failure.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use propwatch_core::{Error, MailTransport, Result};

/// Default relay request timeout in seconds.
pub const DEFAULT_MAIL_TIMEOUT_SECS: u64 = 10;

/// Mail relay configuration.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Relay endpoint receiving the JSON send request.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional sender address forwarded to the relay.
    pub from: Option<String>,
}

impl MailerConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(DEFAULT_MAIL_TIMEOUT_SECS),
            from: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MAIL_RELAY_URL` | required | Relay endpoint URL |
    /// | `MAIL_TIMEOUT_SECS` | `10` | Per-request timeout |
    /// | `MAIL_FROM` | unset | Sender address |
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("MAIL_RELAY_URL")
            .map_err(|_| Error::Config("MAIL_RELAY_URL is not set".into()))?;

        let timeout_secs = std::env::var("MAIL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAIL_TIMEOUT_SECS);

        Ok(Self {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            from: std::env::var("MAIL_FROM").ok(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}

/// [`MailTransport`] posting JSON send requests to an HTTP relay.
pub struct HttpMailTransport {
    client: reqwest::Client,
    config: MailerConfig,
}

impl HttpMailTransport {
    pub fn new(config: MailerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build mail client: {e}")))?;
        Ok(Self { client, config })
    }
}

/// Build the relay request payload.
fn build_payload(
    to: &str,
    subject: &str,
    body: &str,
    locale: Option<&str>,
    from: Option<&str>,
) -> serde_json::Value {
    json!({
        "to": to,
        "from": from,
        "subject": subject,
        "body": body,
        "locale": locale,
    })
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, to: &str, subject: &str, body: &str, locale: Option<&str>) -> Result<()> {
        let payload = build_payload(to, subject, body, locale, self.config.from.as_deref());

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("mail relay unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Dispatch(format!(
                "mail relay returned {}",
                response.status()
            )));
        }

        debug!(
            subsystem = "notify",
            component = "mailer",
            op = "send",
            "Mail accepted by relay"
        );
        Ok(())
    }
}
