//! Case-event core for the tribunal service.
//!
//! - [`callback`]: the event envelope and case data
//! - [`response`]: handler output with errors and warnings
//! - [`dispatch`]: handler registry and callback dispatcher
//! - [`error`]: failure taxonomy used by the retry policy

pub mod callback;
pub mod dispatch;
pub mod error;
pub mod response;
pub mod time;

pub use callback::{Callback, CaseData, CaseDetails, EventType, Phase};
pub use dispatch::{
    CallbackDispatcher, CallbackHandler, DispatchOptions, DispatchPriority, HandlerRegistry,
    HandlerRegistryBuilder,
};
pub use error::{DispatchError, FailureClass, HandlerError, ModelError, TerminalFailure};
pub use response::CallbackResponse;
pub use time::LocalDateTime;
