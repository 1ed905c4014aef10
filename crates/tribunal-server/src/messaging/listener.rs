use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info};

use super::source::{MessageSource, QueueMessage};
use crate::observability::message_span;

/// Processes one queue message. Failures are handled and logged inside.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, message: &QueueMessage);
}

enum Step {
    Shutdown,
    Finished(String),
    Received(Option<QueueMessage>),
}

/// Pulls messages from a source and runs them through a handler with
/// bounded concurrency.
///
/// Every message is acknowledged once its handler returns, whatever the
/// outcome, so the source never redelivers it.
pub struct QueueListener<S, H> {
    name: String,
    source: S,
    handler: Arc<H>,
    concurrency: usize,
}

impl<S: MessageSource, H: MessageHandler> QueueListener<S, H> {
    pub fn new(name: impl Into<String>, source: S, handler: Arc<H>, concurrency: usize) -> Self {
        Self {
            name: name.into(),
            source,
            handler,
            concurrency: concurrency.max(1),
        }
    }

    /// Run until shutdown is signalled or the source closes. In-flight
    /// messages are drained before returning.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(listener = %self.name, concurrency = self.concurrency, "Queue listener started");

        let mut in_flight: JoinSet<String> = JoinSet::new();

        loop {
            let step = tokio::select! {
                biased;

                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        Step::Shutdown
                    } else {
                        continue;
                    }
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    match joined {
                        Ok(message_id) => Step::Finished(message_id),
                        Err(e) => {
                            error!(
                                listener = %self.name,
                                error = %e,
                                "Message task failed to join"
                            );
                            continue;
                        }
                    }
                }

                message = self.source.receive(), if in_flight.len() < self.concurrency => {
                    Step::Received(message)
                }
            };

            match step {
                Step::Shutdown => {
                    info!(listener = %self.name, "Queue listener received shutdown signal");
                    break;
                }
                Step::Finished(message_id) => {
                    self.source.complete(&message_id).await;
                }
                Step::Received(Some(message)) => {
                    let span = message_span(&self.name, &message.message_id);
                    let handler = self.handler.clone();
                    in_flight.spawn(
                        async move {
                            debug!("Message received");
                            let result =
                                AssertUnwindSafe(handler.handle(&message)).catch_unwind().await;
                            if result.is_err() {
                                error!("Message handler panicked");
                            }
                            message.message_id
                        }
                        .instrument(span),
                    );
                }
                Step::Received(None) => {
                    info!(listener = %self.name, "Message source closed");
                    break;
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Ok(message_id) = joined {
                self.source.complete(&message_id).await;
            }
        }

        info!(listener = %self.name, "Queue listener stopped");
    }
}
