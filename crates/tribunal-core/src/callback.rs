//! Callback model: the event envelope raised by the case platform.
//!
//! A [`Callback`] carries the case as it will look after the event
//! (`case_details`), optionally the case before it, the event identifier
//! and the warning-suppression flag. It is immutable for the duration of
//! one dispatch; handlers hand mutated case data forward by returning a
//! [`CallbackResponse`](crate::response::CallbackResponse) rather than by
//! mutating a shared snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::ModelError;
use crate::time::LocalDateTime;

/// Point in a case event's lifecycle at which handlers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    AboutToStart,
    MidEvent,
    AboutToSubmit,
    Submitted,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::AboutToStart,
        Phase::MidEvent,
        Phase::AboutToSubmit,
        Phase::Submitted,
    ];

    /// Pre-commit phases run inside the case platform's request and may
    /// block the transaction; `Submitted` runs after the commit.
    pub fn is_pre_commit(&self) -> bool {
        !matches!(self, Phase::Submitted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::AboutToStart => "ABOUT_TO_START",
            Phase::MidEvent => "MID_EVENT",
            Phase::AboutToSubmit => "ABOUT_TO_SUBMIT",
            Phase::Submitted => "SUBMITTED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case platform event identifiers handled by this service.
///
/// Unknown identifiers are rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    AppealReceived,
    ValidAppealCreated,
    SendToDwp,
    DwpUploadResponse,
    DwpRespond,
    ReadyToList,
    UpdateListingRequirements,
    ListingError,
    HearingBooked,
    CancelHearing,
    AdjournCase,
    IssueAdjournmentNotice,
    PostponementRequest,
    ActionFurtherEvidence,
    UploadDocumentFurtherEvidence,
    IssueFurtherEvidence,
    ReissueFurtherEvidence,
    IssueGenericLetter,
    WriteFinalDecision,
    IssueFinalDecision,
    DirectionIssued,
    DecisionIssued,
    UpdateOtherParty,
    CaseUpdated,
    CreateBundle,
}

impl EventType {
    pub fn ccd_id(&self) -> &'static str {
        match self {
            EventType::AppealReceived => "appealReceived",
            EventType::ValidAppealCreated => "validAppealCreated",
            EventType::SendToDwp => "sendToDwp",
            EventType::DwpUploadResponse => "dwpUploadResponse",
            EventType::DwpRespond => "dwpRespond",
            EventType::ReadyToList => "readyToList",
            EventType::UpdateListingRequirements => "updateListingRequirements",
            EventType::ListingError => "listingError",
            EventType::HearingBooked => "hearingBooked",
            EventType::CancelHearing => "cancelHearing",
            EventType::AdjournCase => "adjournCase",
            EventType::IssueAdjournmentNotice => "issueAdjournmentNotice",
            EventType::PostponementRequest => "postponementRequest",
            EventType::ActionFurtherEvidence => "actionFurtherEvidence",
            EventType::UploadDocumentFurtherEvidence => "uploadDocumentFurtherEvidence",
            EventType::IssueFurtherEvidence => "issueFurtherEvidence",
            EventType::ReissueFurtherEvidence => "reissueFurtherEvidence",
            EventType::IssueGenericLetter => "issueGenericLetter",
            EventType::WriteFinalDecision => "writeFinalDecision",
            EventType::IssueFinalDecision => "issueFinalDecision",
            EventType::DirectionIssued => "directionIssued",
            EventType::DecisionIssued => "decisionIssued",
            EventType::UpdateOtherParty => "updateOtherParty",
            EventType::CaseUpdated => "caseUpdated",
            EventType::CreateBundle => "createBundle",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ccd_id())
    }
}

/// Case data as a JSON object keyed by case platform field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseData(Map<String, Value>);

impl CaseData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String value of a field; `None` when absent, null or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn ccd_case_id(&self) -> Option<&str> {
        self.get_str("ccdCaseId")
    }

    /// Deserialize a structured field into a typed value.
    pub fn get_as<T: serde::de::DeserializeOwned>(
        &self,
        field: &str,
    ) -> Result<Option<T>, ModelError> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    /// Serialize a typed value into a field.
    pub fn set_as<T: Serialize>(
        &mut self,
        field: impl Into<String>,
        value: &T,
    ) -> Result<(), ModelError> {
        self.0.insert(field.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for CaseData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Snapshot of a case as held by the case platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseDetails {
    pub id: i64,
    #[serde(default)]
    pub jurisdiction: String,
    #[serde(default)]
    pub case_type_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<LocalDateTime>,
    #[serde(default)]
    pub case_data: CaseData,
}

impl CaseDetails {
    pub fn new(id: i64, state: impl Into<String>, case_data: CaseData) -> Self {
        Self {
            id,
            jurisdiction: "SSCS".to_string(),
            case_type_id: "Benefit".to_string(),
            state: state.into(),
            created_date: None,
            case_data,
        }
    }
}

/// Event envelope delivered for one phase of a case event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    pub case_details: CaseDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_details_before: Option<CaseDetails>,
    #[serde(rename = "event_id")]
    pub event: EventType,
    #[serde(default)]
    pub ignore_warnings: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
}

impl Callback {
    pub fn new(event: EventType, case_details: CaseDetails) -> Self {
        Self {
            case_details,
            case_details_before: None,
            event,
            ignore_warnings: false,
            page_id: None,
        }
    }

    pub fn with_case_details_before(mut self, before: CaseDetails) -> Self {
        self.case_details_before = Some(before);
        self
    }

    pub fn with_ignore_warnings(mut self, ignore_warnings: bool) -> Self {
        self.ignore_warnings = ignore_warnings;
        self
    }

    pub fn with_page_id(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    /// Parse a serialized callback as delivered on the queue or over HTTP.
    pub fn from_json(payload: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn case_id(&self) -> i64 {
        self.case_details.id
    }

    pub fn case_data(&self) -> &CaseData {
        &self.case_details.case_data
    }

    /// A new envelope for the same event carrying `data` as the case after.
    ///
    /// Used to hand one handler's output to the next without sharing a
    /// mutable snapshot.
    pub fn with_case_data(&self, data: CaseData) -> Self {
        let mut next = self.clone();
        next.case_details.case_data = data;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Value {
        json!({
            "case_details": {
                "id": 1625080769409918i64,
                "jurisdiction": "SSCS",
                "case_type_id": "Benefit",
                "state": "readyToList",
                "created_date": "2021-06-30T10:00:00.000",
                "case_data": {
                    "ccdCaseId": "1625080769409918",
                    "hearingRoute": "listAssist"
                }
            },
            "event_id": "readyToList",
            "ignore_warnings": true
        })
    }

    #[test]
    fn test_callback_deserializes_platform_payload() {
        let callback = Callback::from_json(&payload().to_string()).unwrap();
        assert_eq!(callback.event, EventType::ReadyToList);
        assert_eq!(callback.case_id(), 1625080769409918);
        assert!(callback.ignore_warnings);
        assert!(callback.case_details_before.is_none());
        assert_eq!(callback.case_data().get_str("hearingRoute"), Some("listAssist"));
        assert_eq!(callback.case_data().ccd_case_id(), Some("1625080769409918"));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let mut body = payload();
        body["event_id"] = json!("notARealEvent");
        let err = Callback::from_json(&body.to_string()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidPayload(_)));
    }

    #[test]
    fn test_missing_case_details_is_rejected() {
        let err = Callback::from_json(r#"{"event_id":"readyToList"}"#).unwrap_err();
        assert!(err.to_string().contains("case_details"));
    }

    #[test]
    fn test_with_case_data_leaves_original_untouched() {
        let callback = Callback::new(
            EventType::SendToDwp,
            CaseDetails::new(1, "withDwp", CaseData::new().with("dwpState", "unregistered")),
        );
        let next =
            callback.with_case_data(callback.case_data().clone().with("dwpState", "registered"));

        assert_eq!(callback.case_data().get_str("dwpState"), Some("unregistered"));
        assert_eq!(next.case_data().get_str("dwpState"), Some("registered"));
        assert_eq!(next.event, callback.event);
    }

    #[test]
    fn test_phase_pre_commit() {
        assert!(Phase::AboutToStart.is_pre_commit());
        assert!(Phase::MidEvent.is_pre_commit());
        assert!(Phase::AboutToSubmit.is_pre_commit());
        assert!(!Phase::Submitted.is_pre_commit());
    }

    #[test]
    fn test_event_display_matches_serde() {
        for event in [
            EventType::DwpUploadResponse,
            EventType::IssueFurtherEvidence,
            EventType::SendToDwp,
        ] {
            let serialized = serde_json::to_value(event).unwrap();
            assert_eq!(serialized, json!(event.to_string()));
        }
    }

    #[test]
    fn test_case_data_typed_fields() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Venue {
            name: String,
        }

        let mut data = CaseData::new();
        data.set_as("venue", &Venue { name: "Leeds".into() }).unwrap();
        let venue: Option<Venue> = data.get_as("venue").unwrap();
        assert_eq!(venue, Some(Venue { name: "Leeds".into() }));

        data.set("venue", Value::Null);
        let missing: Option<Venue> = data.get_as("venue").unwrap();
        assert!(missing.is_none());
    }
}
