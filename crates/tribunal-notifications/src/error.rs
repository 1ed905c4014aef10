use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Webhook rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
