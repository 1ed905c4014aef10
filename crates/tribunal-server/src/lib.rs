pub mod config;
pub mod error;
pub mod handlers;
pub mod hearing_updates;
pub mod messaging;
pub mod observability;
pub mod routes;
pub mod server;

pub use config::AppConfig;
pub use error::ApiError;
pub use hearing_updates::{CaseStore, HearingUpdateListener, InMemoryCaseStore};
pub use messaging::{MessageOutcome, QueueListener, RetryPolicy, TopicConsumer};
pub use observability::init_tracing;
pub use routes::{AppState, build_app};
pub use server::{ServerBuilder, TribunalServer};
