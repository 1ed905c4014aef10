use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::NotificationError;
use crate::processor::NotificationsMessageProcessor;
use crate::types::{NotificationEnvelope, WebhookConfig};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Signature-256";

/// Forwards raw queue messages to an HTTP endpoint.
pub struct WebhookForwarder {
    http_client: Client,
    config: WebhookConfig,
}

impl WebhookForwarder {
    pub fn new(config: WebhookConfig) -> Result<Self, NotificationError> {
        if config.url.trim().is_empty() {
            return Err(NotificationError::InvalidConfig("Missing webhook url".into()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?;

        Ok(Self { http_client, config })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

/// Hex HMAC-SHA256 of `payload`, as sent in [`SIGNATURE_HEADER`].
pub fn sign_payload(payload: &str, secret: &str) -> Result<String, NotificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl NotificationsMessageProcessor for WebhookForwarder {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn process_message(&self, raw: &str, message_id: &str) -> Result<(), NotificationError> {
        let envelope = NotificationEnvelope::from_raw(raw, message_id)?;
        let payload = serde_json::to_string(&envelope)
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        let mut request = self
            .http_client
            .post(&self.config.url)
            .header("Content-Type", "application/json");

        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        if let Some(secret) = &self.config.secret {
            let signature = sign_payload(&payload, secret)?;
            request = request.header(SIGNATURE_HEADER, format!("sha256={signature}"));
        }

        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(message_id, case_id = ?envelope.case_id, "Notification forwarded");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(message_id, status = status.as_u16(), "Notification endpoint rejected message");
            Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
