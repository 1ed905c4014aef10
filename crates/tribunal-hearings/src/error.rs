use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize hearing request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Partition {partition} is closed")]
    ChannelClosed { partition: usize },

    #[error("Publish timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Send failed: {0}")]
    SendFailed(String),
}
