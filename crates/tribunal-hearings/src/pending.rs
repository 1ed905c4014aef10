//! Hearing requests sent to the scheduling system that it has not yet
//! answered.
//!
//! A SUBMITTED callback can run more than once for the same case event: the
//! queue consumer retries the whole dispatch when any handler fails. Handlers
//! reserve a request here before publishing it so a retry finds the earlier
//! request outstanding and does not send it again.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::model::{HearingRequest, HearingState, HmcStatus};

/// Outstanding requests keyed by case reference and requested action.
#[derive(Debug, Default)]
pub struct PendingHearingRequests {
    requests: DashMap<(String, HearingState), ()>,
}

impl PendingHearingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `request`. Returns false when the same action is already
    /// outstanding for the case.
    pub fn try_reserve(&self, request: &HearingRequest) -> bool {
        let key = (request.ccd_case_id.clone(), request.hearing_state);
        match self.requests.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        }
    }

    /// Drop a reservation whose request never reached the scheduling system.
    pub fn release(&self, request: &HearingRequest) {
        self.requests.remove(&(request.ccd_case_id.clone(), request.hearing_state));
    }

    /// Clear every outstanding request for a case once the scheduling system
    /// reports a status outside the pending set. Returns whether anything was
    /// cleared.
    pub fn settle(&self, ccd_case_id: &str, status: HmcStatus) -> bool {
        if status.is_pending() {
            return false;
        }
        let before = self.requests.len();
        self.requests.retain(|(case, _), _| case != ccd_case_id);
        self.requests.len() < before
    }

    pub fn is_outstanding(&self, ccd_case_id: &str, state: HearingState) -> bool {
        self.requests.contains_key(&(ccd_case_id.to_string(), state))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
