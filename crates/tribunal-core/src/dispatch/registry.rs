//! Handler registry.
//!
//! The registry is assembled once at start-up through
//! [`HandlerRegistryBuilder`] and is read-only afterwards, so dispatch
//! never takes a lock.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::handler::CallbackHandler;
use crate::callback::{Callback, EventType, Phase};
use crate::error::DispatchError;

pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Handlers accepting the callback, in registration order.
    pub fn matching(&self, phase: Phase, callback: &Callback) -> Vec<Arc<dyn CallbackHandler>> {
        self.handlers
            .iter()
            .filter(|h| h.can_handle(phase, callback))
            .cloned()
            .collect()
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handler_names())
            .finish()
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        debug!(
            handler = %handler.name(),
            routes = handler.routes().len(),
            "Registered callback handler"
        );
        self.handlers.push(handler);
        self
    }

    /// Freeze the registry.
    ///
    /// Fails when two handlers declare the same pre-commit route.
    pub fn build(self) -> Result<HandlerRegistry, DispatchError> {
        let mut owners: HashMap<(Phase, EventType), &str> = HashMap::new();

        for handler in &self.handlers {
            for &(phase, event) in handler.routes() {
                if !phase.is_pre_commit() {
                    continue;
                }
                if let Some(existing) = owners.insert((phase, event), handler.name()) {
                    return Err(DispatchError::configuration(
                        phase,
                        event,
                        format!(
                            "handlers '{existing}' and '{}' both declare this route",
                            handler.name()
                        ),
                    ));
                }
            }
        }

        info!(handlers = self.handlers.len(), "Callback handler registry built");
        Ok(HandlerRegistry {
            handlers: self.handlers,
        })
    }
}
