//! Notification sub-pipeline.
//!
//! Every case-event message taken off the queue is also handed to a
//! [`NotificationsMessageProcessor`]. The pipeline is best-effort and
//! independent of callback dispatch.

pub mod error;
pub mod processor;
pub mod types;
pub mod webhook;

pub use error::NotificationError;
pub use processor::{DisabledNotifications, NotificationsMessageProcessor};
pub use types::{NotificationEnvelope, WebhookConfig};
pub use webhook::{SIGNATURE_HEADER, WebhookForwarder, sign_payload};
