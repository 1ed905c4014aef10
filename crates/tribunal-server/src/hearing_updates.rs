//! Applies scheduling-system hearing updates to the cases they belong to.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use tribunal_core::{CaseDetails, ModelError};
use tribunal_hearings::reconcile::{
    apply_update, resolve_dwp_state, set_hearing_status, upsert_hearing,
};
use tribunal_hearings::{Hearing, HearingChannel, HearingUpdate, PendingHearingRequests};

use crate::messaging::{MessageHandler, QueueMessage};

pub const HEARINGS_FIELD: &str = "hearings";
pub const DWP_STATE_FIELD: &str = "dwpState";

#[derive(Debug, Error)]
pub enum CaseStoreError {
    #[error("Case store unavailable: {0}")]
    Unavailable(String),
}

/// Read/write access to case details.
#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn get_case(&self, case_id: i64) -> Result<Option<CaseDetails>, CaseStoreError>;

    async fn update_case(&self, case: CaseDetails) -> Result<(), CaseStoreError>;
}

/// Case store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCaseStore {
    cases: DashMap<i64, CaseDetails>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, case: CaseDetails) {
        self.cases.insert(case.id, case);
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn get_case(&self, case_id: i64) -> Result<Option<CaseDetails>, CaseStoreError> {
        Ok(self.cases.get(&case_id).map(|entry| entry.value().clone()))
    }

    async fn update_case(&self, case: CaseDetails) -> Result<(), CaseStoreError> {
        self.cases.insert(case.id, case);
        Ok(())
    }
}

/// Message published by the scheduling system when a hearing changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmcMessage {
    pub case_id: String,
    #[serde(default)]
    pub hearing_id: Option<String>,
    pub hearing_update: HearingUpdate,
    #[serde(default)]
    pub hearing_sub_channel: Option<String>,
    #[serde(default)]
    pub hearing_venue_id: Option<String>,
}

impl HmcMessage {
    /// Hearing id from the envelope, or the request id of the update.
    pub fn hearing_id(&self) -> Option<String> {
        self.hearing_id
            .clone()
            .or_else(|| self.hearing_update.hearing_request_id.map(|id| id.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum HearingUpdateError {
    #[error("Invalid hearing update message: {0}")]
    InvalidMessage(String),

    #[error("Case {0} not found")]
    CaseNotFound(i64),

    #[error(transparent)]
    Store(#[from] CaseStoreError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Applies scheduling-system updates to stored cases.
///
/// Updates for the same case run one at a time; updates for different
/// cases run concurrently.
pub struct HearingUpdateListener {
    store: Arc<dyn CaseStore>,
    case_locks: DashMap<i64, Arc<Mutex<()>>>,
    pending: Option<Arc<PendingHearingRequests>>,
}

impl HearingUpdateListener {
    pub fn new(store: Arc<dyn CaseStore>) -> Self {
        Self {
            store,
            case_locks: DashMap::new(),
            pending: None,
        }
    }

    /// Outstanding hearing requests to settle when the scheduling system
    /// answers for a case.
    pub fn with_pending_requests(mut self, pending: Arc<PendingHearingRequests>) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Apply one update and persist the case. Returns the updated record.
    pub async fn process(&self, raw: &str) -> Result<Hearing, HearingUpdateError> {
        let message: HmcMessage = serde_json::from_str(raw)
            .map_err(|e| HearingUpdateError::InvalidMessage(e.to_string()))?;
        let case_id: i64 = message.case_id.trim().parse().map_err(|_| {
            HearingUpdateError::InvalidMessage(format!("case id '{}'", message.case_id))
        })?;
        let hearing_id = message
            .hearing_id()
            .ok_or_else(|| HearingUpdateError::InvalidMessage("no hearing id".into()))?;

        let lock = self.case_lock(case_id);
        let result = {
            let _guard = lock.lock().await;
            self.apply(case_id, &hearing_id, &message).await
        };
        drop(lock);
        self.case_locks.remove_if(&case_id, |_, idle| Arc::strong_count(idle) == 1);

        let updated = result?;
        if let Some(pending) = &self.pending
            && pending.settle(&case_id.to_string(), message.hearing_update.status)
        {
            debug!(case_id, "Outstanding hearing request settled");
        }
        Ok(updated)
    }

    fn case_lock(&self, case_id: i64) -> Arc<Mutex<()>> {
        self.case_locks.entry(case_id).or_default().value().clone()
    }

    // Read, change and write one case. Callers hold the case lock.
    async fn apply(
        &self,
        case_id: i64,
        hearing_id: &str,
        message: &HmcMessage,
    ) -> Result<Hearing, HearingUpdateError> {
        let mut case = self
            .store
            .get_case(case_id)
            .await?
            .ok_or(HearingUpdateError::CaseNotFound(case_id))?;

        let mut hearings: Vec<Hearing> =
            case.case_data.get_as(HEARINGS_FIELD)?.unwrap_or_default();
        let status = message.hearing_update.status;

        let hearing = upsert_hearing(&mut hearings, hearing_id);
        apply_update(hearing, &message.hearing_update);
        set_hearing_status(hearing, status);
        if let Some(code) = message.hearing_sub_channel.as_deref() {
            match HearingChannel::from_sub_channel(code) {
                Some(channel) => hearing.hearing_channel = Some(channel),
                None => debug!(case_id, code, "Unknown hearing sub-channel"),
            }
        }
        if let Some(venue) = message.hearing_venue_id.clone() {
            hearing.epims_id = Some(venue);
        }
        let updated = hearing.clone();

        case.case_data.set_as(HEARINGS_FIELD, &hearings)?;
        if let Some(dwp_state) = resolve_dwp_state(status) {
            case.case_data.set(DWP_STATE_FIELD, dwp_state);
        }
        self.store.update_case(case).await?;

        info!(case_id, hearing_id = %hearing_id, status = ?status, "Hearing update applied");
        Ok(updated)
    }
}

#[async_trait]
impl MessageHandler for HearingUpdateListener {
    async fn handle(&self, message: &QueueMessage) {
        if let Err(e) = self.process(&message.body).await {
            warn!(message_id = %message.message_id, error = %e, "Hearing update not applied");
        }
    }
}
