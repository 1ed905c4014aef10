use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use tribunal_core::{Callback, CallbackDispatcher, DispatchError, FailureClass, ModelError, Phase};
use tribunal_notifications::NotificationsMessageProcessor;

use super::listener::MessageHandler;
use super::retry::RetryPolicy;
use super::source::QueueMessage;

/// Result of consuming one case-event message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Processed { attempts: u32 },
    /// Terminal or configuration failure, not retried.
    Discarded { attempts: u32, reason: String },
    /// Every attempt failed transiently.
    Exhausted { attempts: u32 },
}

impl MessageOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Processed { attempts }
            | Self::Discarded { attempts, .. }
            | Self::Exhausted { attempts } => *attempts,
        }
    }
}

/// Why a single processing attempt failed.
#[derive(Debug, Error)]
pub enum ProcessingFailure {
    #[error("Invalid case event payload: {0}")]
    Payload(#[from] ModelError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Attempt exceeded its deadline of {timeout_ms}ms")]
    AttemptTimeout { timeout_ms: u64 },
}

impl ProcessingFailure {
    /// Payload errors are retried like any other transient failure.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Dispatch(e) => e.class(),
            Self::Payload(_) | Self::AttemptTimeout { .. } => FailureClass::Transient,
        }
    }
}

/// Consumer of the case-event topic.
pub struct TopicConsumer {
    dispatcher: CallbackDispatcher,
    notifications: Arc<dyn NotificationsMessageProcessor>,
    policy: RetryPolicy,
}

impl TopicConsumer {
    pub fn new(
        dispatcher: CallbackDispatcher,
        notifications: Arc<dyn NotificationsMessageProcessor>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            dispatcher,
            notifications,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the evidence-share step, then the notification step.
    ///
    /// The notification step sees every message whatever the outcome of
    /// the first step, and its failures are only logged.
    pub async fn on_message(&self, raw: &str, message_id: &str) -> MessageOutcome {
        let outcome = self.process_evidence_share(raw, message_id).await;

        if let Err(e) = self.notifications.process_message(raw, message_id).await {
            warn!(
                message_id,
                processor = self.notifications.name(),
                error = %e,
                "Notification processing failed"
            );
        }

        outcome
    }

    async fn process_evidence_share(&self, raw: &str, message_id: &str) -> MessageOutcome {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let attempt_result =
                tokio::time::timeout(self.policy.attempt_timeout, self.attempt(raw)).await;
            let failure = match attempt_result {
                Ok(Ok(())) => {
                    info!(message_id, attempts = attempt, "Case event processed");
                    return MessageOutcome::Processed { attempts: attempt };
                }
                Ok(Err(e)) => e,
                Err(_) => ProcessingFailure::AttemptTimeout {
                    timeout_ms: self.policy.attempt_timeout.as_millis() as u64,
                },
            };

            match failure.class() {
                FailureClass::Configuration => {
                    error!(
                        message_id,
                        attempt,
                        error = %failure,
                        "Handler configuration fault, discarding message"
                    );
                    return MessageOutcome::Discarded {
                        attempts: attempt,
                        reason: failure.to_string(),
                    };
                }
                FailureClass::Terminal => {
                    error!(
                        message_id,
                        attempt,
                        error = %failure,
                        "Terminal failure, discarding message"
                    );
                    return MessageOutcome::Discarded {
                        attempts: attempt,
                        reason: failure.to_string(),
                    };
                }
                FailureClass::Transient if self.policy.has_attempts_left(attempt) => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        message_id,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                FailureClass::Transient => {
                    error!(
                        message_id,
                        attempts = attempt,
                        error = %failure,
                        "Unrecoverable case event, retries exhausted"
                    );
                    return MessageOutcome::Exhausted { attempts: attempt };
                }
            }
        }
    }

    async fn attempt(&self, raw: &str) -> Result<(), ProcessingFailure> {
        let callback = Callback::from_json(raw)?;
        let response = self.dispatcher.dispatch(Phase::Submitted, &callback).await?;
        if response.has_errors() {
            warn!(
                case_id = callback.case_id(),
                event = %callback.event,
                errors = ?response.errors,
                "Submitted handlers reported errors"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for TopicConsumer {
    async fn handle(&self, message: &QueueMessage) {
        self.on_message(&message.body, &message.message_id).await;
    }
}
