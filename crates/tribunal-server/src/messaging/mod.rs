//! Queue-side processing of case events.
//!
//! A [`QueueListener`] pulls [`QueueMessage`]s from a [`MessageSource`] and
//! hands each one to a [`MessageHandler`]. The case-event handler is the
//! [`TopicConsumer`], which dispatches the SUBMITTED phase with bounded
//! retries and then forwards the raw message to the notification pipeline.

mod consumer;
mod listener;
mod retry;
mod source;

pub use consumer::{MessageOutcome, ProcessingFailure, TopicConsumer};
pub use listener::{MessageHandler, QueueListener};
pub use retry::RetryPolicy;
pub use source::{Acknowledgements, ChannelMessageSource, MessageSource, QueueMessage};
