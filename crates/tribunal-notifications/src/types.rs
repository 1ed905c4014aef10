use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;

use crate::error::NotificationError;

/// Envelope forwarded to the notification endpoint for each queue message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    pub payload: Value,
}

impl NotificationEnvelope {
    /// Wrap a raw queue message.
    ///
    /// The message must be JSON. Case id and event are lifted out when
    /// present; nothing else about its shape is assumed.
    pub fn from_raw(raw: &str, message_id: &str) -> Result<Self, NotificationError> {
        let payload: Value = serde_json::from_str(raw)
            .map_err(|e| NotificationError::InvalidMessage(format!("{message_id}: {e}")))?;

        let case_id = payload
            .pointer("/case_details/id")
            .and_then(Value::as_i64);
        let event_id = payload
            .get("event_id")
            .and_then(Value::as_str)
            .map(String::from);

        Ok(Self {
            message_id: message_id.to_string(),
            case_id,
            event_id,
            received_at: OffsetDateTime::now_utc(),
            payload,
        })
    }
}

/// Webhook endpoint settings.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    pub url: String,
    pub secret: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
