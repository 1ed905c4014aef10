//! Callback dispatcher.
//!
//! Routes a callback to the registered handlers for its phase:
//!
//! - pre-commit phases need exactly one handler, whose response is
//!   returned as-is;
//! - `Submitted` runs every matching handler in priority order, feeding
//!   each the data produced by the previous one.
//!
//! Every handler call runs under a deadline and with panic recovery.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use super::handler::CallbackHandler;
use super::registry::HandlerRegistry;
use crate::callback::{Callback, Phase};
use crate::error::{DispatchError, HandlerError};
use crate::response::CallbackResponse;

/// Default deadline for a single handler call.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub handler_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallbackDispatcher {
    registry: Arc<HandlerRegistry>,
    options: DispatchOptions,
}

impl CallbackDispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_options(registry, DispatchOptions::default())
    }

    pub fn with_options(registry: Arc<HandlerRegistry>, options: DispatchOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, DispatchError> {
        if phase.is_pre_commit() {
            self.dispatch_pre_commit(phase, callback).await
        } else {
            self.dispatch_submitted(phase, callback).await
        }
    }

    async fn dispatch_pre_commit(
        &self,
        phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, DispatchError> {
        let mut matches = self.registry.matching(phase, callback);

        let handler = match matches.len() {
            1 => matches.remove(0),
            0 => {
                return Err(self.configuration_fault(
                    phase,
                    callback,
                    "no handler accepts this callback".into(),
                ));
            }
            n => {
                let names: Vec<&str> = matches.iter().map(|h| h.name()).collect();
                return Err(self.configuration_fault(
                    phase,
                    callback,
                    format!("{n} handlers accept this callback: {}", names.join(", ")),
                ));
            }
        };

        self.invoke(handler.as_ref(), phase, callback).await
    }

    async fn dispatch_submitted(
        &self,
        phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, DispatchError> {
        let mut handlers = self.registry.matching(phase, callback);
        let mut response = CallbackResponse::new(callback.case_data().clone());

        if handlers.is_empty() {
            debug!(
                case_id = callback.case_id(),
                event = %callback.event,
                "No submitted handlers matched"
            );
            return Ok(response);
        }

        // Stable: equal priorities keep registration order.
        handlers.sort_by_key(|h| h.priority());

        for handler in handlers {
            let current = callback.with_case_data(response.data.clone());
            let produced = self.invoke(handler.as_ref(), phase, &current).await?;
            response.merge(produced);
        }

        info!(
            case_id = callback.case_id(),
            event = %callback.event,
            errors = response.errors.len(),
            warnings = response.warnings.len(),
            "Submitted handlers completed"
        );
        Ok(response)
    }

    async fn invoke(
        &self,
        handler: &dyn CallbackHandler,
        phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, DispatchError> {
        let name = handler.name().to_string();
        let timeout = self.options.handler_timeout;

        let result = tokio::time::timeout(timeout, async {
            AssertUnwindSafe(handler.handle(phase, callback))
                .catch_unwind()
                .await
        })
        .await;

        match result {
            Ok(Ok(Ok(response))) => {
                debug!(handler = %name, %phase, case_id = callback.case_id(), "Handler completed");
                Ok(response)
            }
            Ok(Ok(Err(e))) => {
                warn!(
                    handler = %name,
                    %phase,
                    case_id = callback.case_id(),
                    error = %e,
                    "Handler failed"
                );
                Err(DispatchError::Handler {
                    handler: name,
                    source: e,
                })
            }
            Ok(Err(panic)) => {
                let panic_msg = panic_message(panic.as_ref());
                error!(handler = %name, %phase, panic = %panic_msg, "Handler panicked");
                Err(DispatchError::Handler {
                    handler: name,
                    source: HandlerError::Panicked(panic_msg),
                })
            }
            Err(_) => {
                error!(
                    handler = %name,
                    %phase,
                    timeout_ms = timeout.as_millis() as u64,
                    "Handler timed out"
                );
                Err(DispatchError::Timeout {
                    handler: name,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    fn configuration_fault(
        &self,
        phase: Phase,
        callback: &Callback,
        message: String,
    ) -> DispatchError {
        error!(
            %phase,
            event = %callback.event,
            case_id = callback.case_id(),
            reason = %message,
            "Callback handler configuration fault"
        );
        DispatchError::configuration(phase, callback.event, message)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
