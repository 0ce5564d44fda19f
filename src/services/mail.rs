//! Email delivery.
//!
//! Mail is best effort. A configured transport is tried once; when it fails, or
//! when none is configured, the message is written to the log so an admin can
//! pass the details on by hand. Callers never see a delivery error.

use crate::{
    config::{MailSettings, Secret},
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to_email: String,
    /// Recipient display name
    pub to_name: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Plain-text body, used for the logged transcript
    pub text: String,
}

/// What happened to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Delivery {
    /// Accepted by a transport
    Sent {
        /// Transport name
        via: String,
    },
    /// Only written to the log
    Logged,
}

/// A way of sending email.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name for logs and responses.
    fn name(&self) -> &'static str;

    /// Sends one message.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Posts `{to, subject, html}` to a same-origin backend endpoint.
pub struct BackendTransport {
    client: Client,
    url: String,
}

impl BackendTransport {
    /// Creates a transport for an endpoint URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(15)).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MailTransport for BackendTransport {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "to": message.to_email,
                "subject": message.subject,
                "html": message.html,
            }))
            .send()
            .await
            .map_err(|e| Error::Mail {
                message: format!("Mail endpoint unreachable: {e}"),
            })?;
        if !response.status().is_success() {
            return Err(Error::Mail {
                message: format!("Mail endpoint answered {}", response.status()),
            });
        }
        Ok(())
    }
}

/// Sends through the Brevo transactional-email API.
pub struct BrevoTransport {
    client: Client,
    api_key: Secret,
    sender_email: String,
    sender_name: String,
}

impl BrevoTransport {
    /// Creates a transport with an API key and sender identity.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: Secret, sender_email: String, sender_name: String) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(15)).build()?,
            api_key,
            sender_email,
            sender_name,
        })
    }
}

#[async_trait]
impl MailTransport for BrevoTransport {
    fn name(&self) -> &'static str {
        "brevo"
    }

    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post(BREVO_SEND_URL)
            .header("api-key", self.api_key.expose())
            .json(&json!({
                "sender": { "name": self.sender_name, "email": self.sender_email },
                "to": [{ "email": message.to_email, "name": message.to_name }],
                "subject": message.subject,
                "htmlContent": message.html,
                "textContent": message.text,
            }))
            .send()
            .await
            .map_err(|e| Error::Mail {
                message: format!("Brevo unreachable: {e}"),
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Mail {
                message: format!("Brevo answered {status}: {body}"),
            });
        }
        Ok(())
    }
}

/// Delivers messages through the configured transport, or logs them.
#[derive(Clone, Default)]
pub struct Mailer {
    transport: Option<Arc<dyn MailTransport>>,
}

impl Mailer {
    /// Picks a transport from settings; the backend endpoint wins over Brevo.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_settings(settings: &MailSettings) -> Result<Self> {
        let transport: Option<Arc<dyn MailTransport>> = if let Some(url) = &settings.backend_url {
            Some(Arc::new(BackendTransport::new(url.clone())?))
        } else if let Some(key) = &settings.brevo_api_key {
            Some(Arc::new(BrevoTransport::new(
                key.clone(),
                settings.sender_email.clone(),
                settings.sender_name.clone(),
            )?))
        } else {
            None
        };
        Ok(Self { transport })
    }

    /// A mailer that uses the given transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// A mailer that only logs.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Sends a message, falling back to a logged transcript.
    pub async fn deliver(&self, message: &EmailMessage) -> Delivery {
        if let Some(transport) = &self.transport {
            match transport.send(message).await {
                Ok(()) => {
                    info!(
                        to = %message.to_email,
                        via = transport.name(),
                        "Email sent: {}",
                        message.subject
                    );
                    return Delivery::Sent {
                        via: transport.name().to_string(),
                    };
                }
                Err(e) => {
                    warn!(to = %message.to_email, error = %e, "Email delivery failed, logging instead");
                }
            }
        }

        info!(
            to = %message.to_email,
            subject = %message.subject,
            "Email not sent. Transcript:\n{}",
            message.text
        );
        Delivery::Logged
    }
}
