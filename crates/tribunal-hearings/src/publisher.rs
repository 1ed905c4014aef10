//! Session-aware publishing of hearing requests.
//!
//! Messages for one case share a session id (the case id) and reach the
//! downstream consumer in publish order. Publish failures are reported as
//! `false` and never escalated to the originating request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::PublishError;
use crate::model::{HearingRequest, HearingRoute};

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Serialized message with its session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMessage {
    pub session_id: String,
    pub body: String,
}

/// Transport that delivers session-keyed messages.
#[async_trait]
pub trait SessionSender: Send + Sync {
    async fn send(&self, message: SessionMessage) -> Result<(), PublishError>;
}

/// Outbound hearing request channel used by handlers.
#[async_trait]
pub trait SessionAwareMessagingService: Send + Sync {
    /// Publish a hearing request. Returns `false` on failure.
    async fn send_message(&self, request: &HearingRequest) -> bool;
}

pub struct SessionAwarePublisher<S> {
    sender: S,
    send_timeout: Duration,
}

impl<S: SessionSender> SessionAwarePublisher<S> {
    pub fn new(sender: S) -> Self {
        Self::with_timeout(sender, DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_timeout(sender: S, send_timeout: Duration) -> Self {
        Self { sender, send_timeout }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    async fn publish(&self, request: &HearingRequest) -> Result<(), PublishError> {
        let message = SessionMessage {
            session_id: request.session_id().to_string(),
            body: serde_json::to_string(request)?,
        };

        tokio::time::timeout(self.send_timeout, self.sender.send(message))
            .await
            .map_err(|_| PublishError::Timeout {
                timeout_ms: self.send_timeout.as_millis() as u64,
            })?
    }
}

#[async_trait]
impl<S: SessionSender> SessionAwareMessagingService for SessionAwarePublisher<S> {
    async fn send_message(&self, request: &HearingRequest) -> bool {
        match self.publish(request).await {
            Ok(()) => {
                info!(
                    case_id = %request.ccd_case_id,
                    hearing_state = %request.hearing_state,
                    "Hearing request published"
                );
                true
            }
            Err(e) => {
                warn!(
                    case_id = %request.ccd_case_id,
                    hearing_state = %request.hearing_state,
                    error = %e,
                    "Failed to publish hearing request"
                );
                false
            }
        }
    }
}

/// In-process session-partitioned channel.
///
/// Each partition is a bounded `mpsc` queue read by a single consumer; a
/// session always maps to the same partition.
#[derive(Debug, Clone)]
pub struct PartitionedChannel {
    partitions: Vec<mpsc::Sender<SessionMessage>>,
}

impl PartitionedChannel {
    /// Create the channel and the receivers, one per partition.
    ///
    /// At least one partition is always created.
    pub fn new(partitions: usize, capacity: usize) -> (Self, Vec<mpsc::Receiver<SessionMessage>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..partitions.max(1))
            .map(|_| mpsc::channel(capacity.max(1)))
            .unzip();
        (Self { partitions: senders }, receivers)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_for(&self, session_id: &str) -> usize {
        (fnv1a(session_id.as_bytes()) % self.partitions.len() as u64) as usize
    }
}

#[async_trait]
impl SessionSender for PartitionedChannel {
    async fn send(&self, message: SessionMessage) -> Result<(), PublishError> {
        let partition = self.partition_for(&message.session_id);
        debug!(session_id = %message.session_id, partition, "Routing session message");
        self.partitions[partition]
            .send(message)
            .await
            .map_err(|_| PublishError::ChannelClosed { partition })
    }
}

// Stable across processes and releases, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// Publisher for cases not scheduled through the scheduling system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpPublisher;

#[async_trait]
impl SessionAwareMessagingService for NoOpPublisher {
    async fn send_message(&self, request: &HearingRequest) -> bool {
        debug!(case_id = %request.ccd_case_id, "Hearing route not scheduled, skipping publish");
        true
    }
}

/// Chooses the publisher for a case's hearing route.
#[derive(Clone)]
pub struct HearingPublishers {
    list_assist: Arc<dyn SessionAwareMessagingService>,
    no_op: Arc<dyn SessionAwareMessagingService>,
}

impl HearingPublishers {
    pub fn new(list_assist: Arc<dyn SessionAwareMessagingService>) -> Self {
        Self {
            list_assist,
            no_op: Arc::new(NoOpPublisher),
        }
    }

    /// Publisher used when the scheduling system is disabled.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoOpPublisher))
    }

    pub fn publisher_for_route(
        &self,
        route: Option<HearingRoute>,
    ) -> Arc<dyn SessionAwareMessagingService> {
        match route {
            Some(HearingRoute::ListAssist) => self.list_assist.clone(),
            _ => self.no_op.clone(),
        }
    }
}

impl std::fmt::Debug for HearingPublishers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HearingPublishers").finish_non_exhaustive()
    }
}
