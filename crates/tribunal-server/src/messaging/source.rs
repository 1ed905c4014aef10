use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One message taken off a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub body: String,
}

impl QueueMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            body: body.into(),
        }
    }

    pub fn with_id(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
        }
    }
}

/// Where a listener pulls messages from.
///
/// `receive` must be cancel-safe: the listener races it against shutdown.
#[async_trait]
pub trait MessageSource: Send + 'static {
    /// Next message, or `None` once the source is closed.
    async fn receive(&mut self) -> Option<QueueMessage>;

    /// Acknowledge a message so it is not redelivered.
    async fn complete(&mut self, message_id: &str);
}

/// Shared record of acknowledged message ids.
#[derive(Debug, Clone, Default)]
pub struct Acknowledgements(Arc<Mutex<Vec<String>>>);

impl Acknowledgements {
    pub fn ids(&self) -> Vec<String> {
        self.0.lock().map(|ids| ids.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, message_id: &str) {
        if let Ok(mut ids) = self.0.lock() {
            ids.push(message_id.to_string());
        }
    }
}

/// In-process source backed by a bounded mpsc channel.
pub struct ChannelMessageSource {
    receiver: mpsc::Receiver<QueueMessage>,
    acknowledged: Acknowledgements,
}

impl ChannelMessageSource {
    pub fn channel(capacity: usize) -> (mpsc::Sender<QueueMessage>, Self) {
        let (tx, receiver) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                receiver,
                acknowledged: Acknowledgements::default(),
            },
        )
    }

    pub fn acknowledgements(&self) -> Acknowledgements {
        self.acknowledged.clone()
    }
}

#[async_trait]
impl MessageSource for ChannelMessageSource {
    async fn receive(&mut self) -> Option<QueueMessage> {
        self.receiver.recv().await
    }

    async fn complete(&mut self, message_id: &str) {
        self.acknowledged.push(message_id);
    }
}
