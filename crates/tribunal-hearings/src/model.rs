//! Hearing types shared with the scheduling system and stored on the case.

use serde::{Deserialize, Serialize};
use tribunal_core::LocalDateTime;

/// Hearing status as reported by the scheduling system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HmcStatus {
    HearingRequested,
    AwaitingListing,
    Listed,
    UpdateRequested,
    UpdateSubmitted,
    Exception,
    CancellationRequested,
    CancellationSubmitted,
    Cancelled,
    AwaitingActuals,
    Completed,
    Adjourned,
}

impl HmcStatus {
    pub const ALL: [HmcStatus; 12] = [
        HmcStatus::HearingRequested,
        HmcStatus::AwaitingListing,
        HmcStatus::Listed,
        HmcStatus::UpdateRequested,
        HmcStatus::UpdateSubmitted,
        HmcStatus::Exception,
        HmcStatus::CancellationRequested,
        HmcStatus::CancellationSubmitted,
        HmcStatus::Cancelled,
        HmcStatus::AwaitingActuals,
        HmcStatus::Completed,
        HmcStatus::Adjourned,
    ];

    /// Requested but neither listed nor cancelled yet.
    pub const PENDING: [HmcStatus; 4] = [
        HmcStatus::HearingRequested,
        HmcStatus::AwaitingListing,
        HmcStatus::UpdateRequested,
        HmcStatus::UpdateSubmitted,
    ];

    pub fn is_pending(&self) -> bool {
        Self::PENDING.contains(self)
    }

    /// Local status recorded on the case, if this status changes it.
    pub fn hearing_status(&self) -> Option<HearingStatus> {
        match self {
            HmcStatus::HearingRequested | HmcStatus::AwaitingListing => {
                Some(HearingStatus::AwaitingListing)
            }
            HmcStatus::Listed | HmcStatus::AwaitingActuals => Some(HearingStatus::Listed),
            HmcStatus::Exception => Some(HearingStatus::Exception),
            HmcStatus::Cancelled => Some(HearingStatus::Cancelled),
            HmcStatus::Completed => Some(HearingStatus::Completed),
            HmcStatus::Adjourned => Some(HearingStatus::Adjourned),
            HmcStatus::UpdateRequested
            | HmcStatus::UpdateSubmitted
            | HmcStatus::CancellationRequested
            | HmcStatus::CancellationSubmitted => None,
        }
    }
}

/// Hearing status held on the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HearingStatus {
    AwaitingListing,
    Listed,
    Cancelled,
    Exception,
    Adjourned,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HearingChannel {
    FaceToFace,
    Telephone,
    Video,
    Paper,
    NotAttending,
}

impl HearingChannel {
    /// Map a scheduling-system attendance sub-channel code.
    pub fn from_sub_channel(code: &str) -> Option<Self> {
        match code.trim() {
            "INTER" => Some(HearingChannel::FaceToFace),
            "TEL" | "TELBTM" | "TELCVP" | "TELOTHER" | "TELSKYP" => Some(HearingChannel::Telephone),
            "VID" | "VIDCVP" | "VIDOTHER" | "VIDPVL" | "VIDSKYPE" | "VIDTEAMS" | "VIDVHS" => {
                Some(HearingChannel::Video)
            }
            "ONPPRS" => Some(HearingChannel::Paper),
            "NA" => Some(HearingChannel::NotAttending),
            _ => None,
        }
    }
}

/// Route through which a case's hearings are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HearingRoute {
    ListAssist,
    Gaps,
}

impl HearingRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            HearingRoute::ListAssist => "listAssist",
            HearingRoute::Gaps => "gaps",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "listAssist" => Some(HearingRoute::ListAssist),
            "gaps" => Some(HearingRoute::Gaps),
            _ => None,
        }
    }
}

impl std::fmt::Display for HearingRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action requested of the scheduling system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HearingState {
    CreateHearing,
    UpdateHearing,
    UpdatedCase,
    CancelHearing,
    AdjournCreateHearing,
}

impl HearingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HearingState::CreateHearing => "createHearing",
            HearingState::UpdateHearing => "updateHearing",
            HearingState::UpdatedCase => "updatedCase",
            HearingState::CancelHearing => "cancelHearing",
            HearingState::AdjournCreateHearing => "adjournCreateHearing",
        }
    }
}

impl std::fmt::Display for HearingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hearing request as listed by the scheduling system for a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseHearing {
    #[serde(rename = "hearingID")]
    pub hearing_id: i64,
    #[serde(default)]
    pub hmc_status: Option<HmcStatus>,
    #[serde(default)]
    pub request_version: Option<i64>,
    #[serde(default)]
    pub hearing_request_date_time: Option<LocalDateTime>,
}

impl CaseHearing {
    pub fn new(hearing_id: i64, hmc_status: HmcStatus) -> Self {
        Self {
            hearing_id,
            hmc_status: Some(hmc_status),
            request_version: None,
            hearing_request_date_time: None,
        }
    }

    pub fn with_request_version(mut self, version: i64) -> Self {
        self.request_version = Some(version);
        self
    }

    pub fn with_request_date_time(mut self, requested: LocalDateTime) -> Self {
        self.hearing_request_date_time = Some(requested);
        self
    }
}

/// All hearing requests the scheduling system holds for a case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HearingsGetResponse {
    #[serde(default)]
    pub case_ref: Option<String>,
    #[serde(default)]
    pub hmcts_service_code: Option<String>,
    #[serde(default)]
    pub case_hearings: Vec<CaseHearing>,
}

/// Local hearing record held in the case data `hearings` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hearing {
    #[serde(default)]
    pub hearing_id: Option<String>,
    #[serde(default)]
    pub version_number: Option<i64>,
    #[serde(default)]
    pub hearing_status: Option<HearingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hearing_channel: Option<HearingChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epims_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<LocalDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<LocalDateTime>,
}

impl Hearing {
    pub fn with_id(hearing_id: impl Into<String>) -> Self {
        Self {
            hearing_id: Some(hearing_id.into()),
            ..Self::default()
        }
    }
}

/// State change broadcast by the scheduling system for one hearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HearingUpdate {
    #[serde(default)]
    pub hearing_request_id: Option<i64>,
    #[serde(default)]
    pub version_number: Option<i64>,
    #[serde(rename = "hmcStatus")]
    pub status: HmcStatus,
    #[serde(default)]
    pub timestamp: Option<LocalDateTime>,
}

impl HearingUpdate {
    pub fn new(status: HmcStatus) -> Self {
        Self {
            hearing_request_id: None,
            version_number: None,
            status,
            timestamp: None,
        }
    }

    pub fn with_request_id(mut self, id: i64) -> Self {
        self.hearing_request_id = Some(id);
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version_number = Some(version);
        self
    }
}

/// Message sent to the scheduling system on the session-partitioned channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HearingRequest {
    pub ccd_case_id: String,
    pub hearing_route: HearingRoute,
    pub hearing_state: HearingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl HearingRequest {
    pub fn new(
        ccd_case_id: impl Into<String>,
        hearing_route: HearingRoute,
        hearing_state: HearingState,
    ) -> Self {
        Self {
            ccd_case_id: ccd_case_id.into(),
            hearing_route,
            hearing_state,
            cancellation_reason: None,
        }
    }

    pub fn with_cancellation_reason(mut self, reason: impl Into<String>) -> Self {
        self.cancellation_reason = Some(reason.into());
        self
    }

    /// Partition key: all messages for one case share a session.
    pub fn session_id(&self) -> &str {
        &self.ccd_case_id
    }
}
