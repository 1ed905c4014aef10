//! Business handlers registered with the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use tribunal_core::{
    Callback, CallbackHandler, CallbackResponse, DispatchError, DispatchPriority, EventType,
    HandlerError, HandlerRegistry, Phase,
};
use tribunal_hearings::{
    HearingPublishers, HearingRequest, HearingRoute, HearingState, PendingHearingRequests,
};

pub const HEARING_ROUTE_FIELD: &str = "hearingRoute";
pub const HEARING_STATE_FIELD: &str = "hearingState";

pub const GAPS_CASE_WARNING: &str = "This is a GAPS case, If you do want to proceed, \
     then please change the hearing route to List Assist";

/// Handlers served by this process.
pub fn registry(
    publishers: HearingPublishers,
    pending: Arc<PendingHearingRequests>,
) -> Result<HandlerRegistry, DispatchError> {
    HandlerRegistry::builder()
        .register(Arc::new(ReadyToListAboutToSubmitHandler))
        .register(Arc::new(ReadyToListSubmittedHandler::new(publishers, pending)))
        .build()
}

/// Checks the hearing route before a case is listed.
///
/// A missing route defaults to list assist. A GAPS route needs the caller
/// to confirm the warning.
#[derive(Debug, Default)]
pub struct ReadyToListAboutToSubmitHandler;

#[async_trait]
impl CallbackHandler for ReadyToListAboutToSubmitHandler {
    fn name(&self) -> &str {
        "ready_to_list_about_to_submit"
    }

    fn routes(&self) -> &[(Phase, EventType)] {
        &[(Phase::AboutToSubmit, EventType::ReadyToList)]
    }

    async fn handle(
        &self,
        _phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, HandlerError> {
        let mut response = CallbackResponse::new(callback.case_data().clone());

        match response.data.get_str(HEARING_ROUTE_FIELD).map(str::to_owned) {
            None => {
                response.data.set(HEARING_ROUTE_FIELD, HearingRoute::ListAssist.as_str());
                response.data.set(HEARING_STATE_FIELD, HearingState::CreateHearing.as_str());
            }
            Some(route) => match HearingRoute::parse(&route) {
                Some(HearingRoute::ListAssist) => {
                    response.data.set(HEARING_STATE_FIELD, HearingState::CreateHearing.as_str());
                }
                Some(HearingRoute::Gaps) if !callback.ignore_warnings => {
                    response.add_warning(GAPS_CASE_WARNING);
                }
                Some(HearingRoute::Gaps) => {}
                None => response.add_error(format!("Unknown hearing route '{route}'")),
            },
        }

        Ok(response)
    }
}

/// Requests a hearing once a case is ready to list.
///
/// A request already outstanding for the case is not sent again, so a
/// retried dispatch publishes at most once.
pub struct ReadyToListSubmittedHandler {
    publishers: HearingPublishers,
    pending: Arc<PendingHearingRequests>,
}

impl ReadyToListSubmittedHandler {
    pub fn new(publishers: HearingPublishers, pending: Arc<PendingHearingRequests>) -> Self {
        Self {
            publishers,
            pending,
        }
    }
}

#[async_trait]
impl CallbackHandler for ReadyToListSubmittedHandler {
    fn name(&self) -> &str {
        "ready_to_list_submitted"
    }

    fn routes(&self) -> &[(Phase, EventType)] {
        &[(Phase::Submitted, EventType::ReadyToList)]
    }

    fn priority(&self) -> DispatchPriority {
        DispatchPriority::Early
    }

    async fn handle(
        &self,
        _phase: Phase,
        callback: &Callback,
    ) -> Result<CallbackResponse, HandlerError> {
        let data = callback.case_data().clone();
        let Some(route) = data.get_str(HEARING_ROUTE_FIELD).and_then(HearingRoute::parse) else {
            debug!(case_id = callback.case_id(), "No hearing route, nothing to publish");
            return Ok(CallbackResponse::new(data));
        };

        let case_id = data
            .ccd_case_id()
            .map(str::to_owned)
            .unwrap_or_else(|| callback.case_id().to_string());
        let request = HearingRequest::new(case_id, route, HearingState::CreateHearing);
        if !self.pending.try_reserve(&request) {
            info!(
                case_id = %request.ccd_case_id,
                "Hearing already requested, awaiting scheduling system"
            );
            return Ok(CallbackResponse::new(data));
        }

        let publisher = self.publishers.publisher_for_route(Some(route));
        if publisher.send_message(&request).await {
            info!(case_id = %request.ccd_case_id, route = %route, "Hearing request published");
        } else {
            self.pending.release(&request);
            warn!(
                case_id = %request.ccd_case_id,
                route = %route,
                "Hearing request could not be published"
            );
        }

        Ok(CallbackResponse::new(data))
    }
}
