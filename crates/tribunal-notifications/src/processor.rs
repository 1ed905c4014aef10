use async_trait::async_trait;
use tracing::debug;

use crate::error::NotificationError;

/// Receives every raw case-event message independently of callback dispatch.
///
/// Failures are reported to the caller for logging only; they never affect
/// the dispatch outcome of the same message.
#[async_trait]
pub trait NotificationsMessageProcessor: Send + Sync {
    fn name(&self) -> &str;

    async fn process_message(&self, raw: &str, message_id: &str) -> Result<(), NotificationError>;
}

/// Accepts and drops messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifications;

#[async_trait]
impl NotificationsMessageProcessor for DisabledNotifications {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn process_message(&self, _raw: &str, message_id: &str) -> Result<(), NotificationError> {
        debug!(message_id, "Notifications disabled, dropping message");
        Ok(())
    }
}
