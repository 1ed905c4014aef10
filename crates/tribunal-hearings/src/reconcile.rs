//! Hearing state reconciler.
//!
//! Applies scheduling-system updates to the hearing records held on a case.
//! Updates arrive without ordering guarantees; the reconciler does no
//! ordering check of its own and callers must apply updates in the
//! scheduling system's order.

use tracing::debug;

use crate::model::{CaseHearing, Hearing, HearingUpdate, HearingsGetResponse, HmcStatus};

/// DWP state recorded once a hearing has been listed.
pub const HEARING_DATE_ISSUED: &str = "hearingDateIssued";

/// Copy identifiers from an update onto the local record.
///
/// Present values replace the local ones regardless of magnitude; absent
/// values leave the local field untouched.
pub fn apply_update(hearing: &mut Hearing, update: &HearingUpdate) {
    if let Some(request_id) = update.hearing_request_id {
        hearing.hearing_id = Some(request_id.to_string());
    }
    if let Some(version) = update.version_number {
        hearing.version_number = Some(version);
    }
}

/// Record the local status implied by `status`, when it implies one.
pub fn set_hearing_status(hearing: &mut Hearing, status: HmcStatus) {
    if let Some(local) = status.hearing_status() {
        hearing.hearing_status = Some(local);
    }
}

pub fn is_case_listed(status: HmcStatus) -> bool {
    status == HmcStatus::Listed
}

pub fn resolve_dwp_state(status: HmcStatus) -> Option<&'static str> {
    is_case_listed(status).then_some(HEARING_DATE_ISSUED)
}

/// Whether a scheduling-system record is in the state a caller is looking for.
///
/// `is_update` selects the pending set; otherwise the status must equal
/// `desired` exactly.
pub fn is_in_desired_state(
    status: Option<HmcStatus>,
    desired: Option<HmcStatus>,
    is_update: bool,
) -> bool {
    match status {
        None => false,
        Some(status) if is_update => status.is_pending(),
        Some(status) => desired == Some(status),
    }
}

/// The pending hearing request for a case, if there is one.
pub fn find_existing_requested_hearings(response: &HearingsGetResponse) -> Option<&CaseHearing> {
    find_hearings_with_requested_hearing_state(response, None, true)
}

/// Select one record matching the desired state.
///
/// With several candidates the earliest request date-time wins, then the
/// lower request version, then input order. Records without a date-time or
/// version sort after those that have one.
pub fn find_hearings_with_requested_hearing_state(
    response: &HearingsGetResponse,
    desired: Option<HmcStatus>,
    is_update: bool,
) -> Option<&CaseHearing> {
    let selected = response
        .case_hearings
        .iter()
        .filter(|h| is_in_desired_state(h.hmc_status, desired, is_update))
        .min_by_key(|h| {
            (
                h.hearing_request_date_time.is_none(),
                h.hearing_request_date_time,
                h.request_version.is_none(),
                h.request_version,
            )
        });

    if let Some(hearing) = selected {
        debug!(
            hearing_id = hearing.hearing_id,
            status = ?hearing.hmc_status,
            "Selected existing hearing request"
        );
    }
    selected
}

pub fn find_hearing<'a>(hearings: &'a [Hearing], hearing_id: &str) -> Option<&'a Hearing> {
    hearings
        .iter()
        .find(|h| h.hearing_id.as_deref() == Some(hearing_id))
}

pub fn find_hearing_mut<'a>(
    hearings: &'a mut [Hearing],
    hearing_id: &str,
) -> Option<&'a mut Hearing> {
    hearings
        .iter_mut()
        .find(|h| h.hearing_id.as_deref() == Some(hearing_id))
}

/// Locate the local record for `hearing_id`, creating it when missing.
pub fn upsert_hearing<'a>(hearings: &'a mut Vec<Hearing>, hearing_id: &str) -> &'a mut Hearing {
    let index = match hearings
        .iter()
        .position(|h| h.hearing_id.as_deref() == Some(hearing_id))
    {
        Some(index) => index,
        None => {
            debug!(hearing_id, "Creating local hearing record");
            hearings.push(Hearing::with_id(hearing_id));
            hearings.len() - 1
        }
    };
    &mut hearings[index]
}
