//! Hearing scheduling integration.
//!
//! - [`model`]: scheduling-system and case hearing types
//! - [`reconcile`]: applies scheduling-system updates to local hearing records
//! - [`publisher`]: session-partitioned outbound hearing requests
//! - [`pending`]: requests awaiting a scheduling-system answer

pub mod error;
pub mod model;
pub mod pending;
pub mod publisher;
pub mod reconcile;

pub use error::PublishError;
pub use model::{
    CaseHearing, Hearing, HearingChannel, HearingRequest, HearingRoute, HearingState,
    HearingStatus, HearingUpdate, HearingsGetResponse, HmcStatus,
};
pub use pending::PendingHearingRequests;
pub use publisher::{
    HearingPublishers, NoOpPublisher, PartitionedChannel, SessionAwareMessagingService,
    SessionAwarePublisher, SessionMessage, SessionSender,
};
