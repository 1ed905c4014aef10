//! Handler registration and callback dispatch.
//!
//! # Example
//!
//! ```ignore
//! use tribunal_core::dispatch::{CallbackDispatcher, HandlerRegistry};
//!
//! let registry = HandlerRegistry::builder()
//!     .register(Arc::new(ReadyToListAboutToSubmitHandler))
//!     .register(Arc::new(ReadyToListSubmittedHandler::new(publishers, pending)))
//!     .build()?;
//!
//! let dispatcher = CallbackDispatcher::new(Arc::new(registry));
//! let response = dispatcher.dispatch(Phase::AboutToSubmit, &callback).await?;
//! ```

pub mod dispatcher;
pub mod handler;
pub mod registry;

pub use dispatcher::{CallbackDispatcher, DEFAULT_HANDLER_TIMEOUT, DispatchOptions};
pub use handler::{CallbackHandler, DispatchPriority};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
