//! Callback handler trait.

use async_trait::async_trait;

use crate::callback::{Callback, EventType, Phase};
use crate::error::HandlerError;
use crate::response::CallbackResponse;

/// Execution order for `Submitted` handlers.
///
/// Handlers with equal priority run in registration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DispatchPriority {
    Earliest,
    Early,
    #[default]
    Late,
    Latest,
}

/// Business logic bound to one or more `(phase, event)` routes.
///
/// # Example
///
/// ```ignore
/// struct ReadyToListValidator;
///
/// #[async_trait]
/// impl CallbackHandler for ReadyToListValidator {
///     fn name(&self) -> &str { "ready_to_list_validator" }
///     fn routes(&self) -> &[(Phase, EventType)] {
///         &[(Phase::AboutToSubmit, EventType::ReadyToList)]
///     }
///
///     async fn handle(
///         &self,
///         _phase: Phase,
///         callback: &Callback,
///     ) -> Result<CallbackResponse, HandlerError> {
///         Ok(CallbackResponse::new(callback.case_data().clone()))
///     }
/// }
/// ```
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    /// Unique name for logs and error reports.
    fn name(&self) -> &str;

    /// Routes this handler is registered for.
    ///
    /// Pre-commit routes must be unique across the registry.
    fn routes(&self) -> &[(Phase, EventType)];

    /// Whether this handler applies to the callback.
    ///
    /// Defaults to a route lookup. Override to add case-data conditions;
    /// a handler must never accept a route it does not declare.
    fn can_handle(&self, phase: Phase, callback: &Callback) -> bool {
        self.declares(phase, callback.event)
    }

    fn priority(&self) -> DispatchPriority {
        DispatchPriority::Late
    }

    /// Run the business logic.
    ///
    /// Rejections go into the response's errors; `Err` is reserved for
    /// failures the message processor should classify and possibly retry.
    async fn handle(
        &self,
        phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, HandlerError>;

    fn declares(&self, phase: Phase, event: EventType) -> bool {
        self.routes().iter().any(|route| *route == (phase, event))
    }
}
