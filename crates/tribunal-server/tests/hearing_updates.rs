use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;

use tribunal_core::{CaseData, CaseDetails};
use tribunal_hearings::{
    Hearing, HearingChannel, HearingRequest, HearingRoute, HearingState, HearingStatus,
    PendingHearingRequests,
};
use tribunal_server::hearing_updates::{
    CaseStore, CaseStoreError, DWP_STATE_FIELD, HEARINGS_FIELD, HearingUpdateError,
    HearingUpdateListener, InMemoryCaseStore,
};
use tribunal_server::messaging::{ChannelMessageSource, QueueListener, QueueMessage};

const CASE_ID: i64 = 1625080769409918;

fn store_with_case(data: CaseData) -> Arc<InMemoryCaseStore> {
    let store = Arc::new(InMemoryCaseStore::new());
    store.insert(CaseDetails::new(CASE_ID, "readyToList", data));
    store
}

async fn hearings(store: &InMemoryCaseStore) -> Vec<Hearing> {
    let case = store.get_case(CASE_ID).await.unwrap().unwrap();
    case.case_data.get_as(HEARINGS_FIELD).unwrap().unwrap_or_default()
}

#[tokio::test]
async fn test_listed_update_creates_hearing_and_sets_dwp_state() {
    let store = store_with_case(CaseData::new());
    let listener = HearingUpdateListener::new(store.clone());

    let message = json!({
        "caseId": CASE_ID.to_string(),
        "hearingId": "2000000001",
        "hearingUpdate": {
            "hearingRequestId": 2000000001i64,
            "versionNumber": 2,
            "hmcStatus": "LISTED"
        },
        "hearingSubChannel": "VIDTEAMS",
        "hearingVenueId": "372653"
    });

    let hearing = listener.process(&message.to_string()).await.unwrap();
    assert_eq!(hearing.hearing_status, Some(HearingStatus::Listed));

    let stored = hearings(&store).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].hearing_id.as_deref(), Some("2000000001"));
    assert_eq!(stored[0].version_number, Some(2));
    assert_eq!(stored[0].hearing_channel, Some(HearingChannel::Video));
    assert_eq!(stored[0].epims_id.as_deref(), Some("372653"));

    let case = store.get_case(CASE_ID).await.unwrap().unwrap();
    assert_eq!(case.case_data.get_str(DWP_STATE_FIELD), Some("hearingDateIssued"));
}

#[tokio::test]
async fn test_update_keeps_existing_version_when_absent() {
    let existing = vec![Hearing {
        hearing_id: Some("42".into()),
        version_number: Some(3),
        hearing_status: Some(HearingStatus::Listed),
        ..Hearing::default()
    }];
    let mut data = CaseData::new();
    data.set_as(HEARINGS_FIELD, &existing).unwrap();
    let store = store_with_case(data);
    let listener = HearingUpdateListener::new(store.clone());

    let message = json!({
        "caseId": CASE_ID.to_string(),
        "hearingId": "42",
        "hearingUpdate": { "hmcStatus": "CANCELLED" }
    });
    listener.process(&message.to_string()).await.unwrap();

    let stored = hearings(&store).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].version_number, Some(3));
    assert_eq!(stored[0].hearing_status, Some(HearingStatus::Cancelled));

    let case = store.get_case(CASE_ID).await.unwrap().unwrap();
    assert!(case.case_data.get(DWP_STATE_FIELD).is_none());
}

#[tokio::test]
async fn test_hearing_id_falls_back_to_request_id() {
    let store = store_with_case(CaseData::new());
    let listener = HearingUpdateListener::new(store.clone());

    let message = json!({
        "caseId": CASE_ID.to_string(),
        "hearingUpdate": { "hearingRequestId": 77, "hmcStatus": "AWAITING_LISTING" }
    });
    listener.process(&message.to_string()).await.unwrap();

    let stored = hearings(&store).await;
    assert_eq!(stored[0].hearing_id.as_deref(), Some("77"));
    assert_eq!(stored[0].hearing_status, Some(HearingStatus::AwaitingListing));
}

#[tokio::test]
async fn test_unknown_case_is_rejected() {
    let listener = HearingUpdateListener::new(Arc::new(InMemoryCaseStore::new()));
    let message = json!({
        "caseId": "123",
        "hearingId": "1",
        "hearingUpdate": { "hmcStatus": "LISTED" }
    });

    let err = listener.process(&message.to_string()).await.unwrap_err();
    assert!(matches!(err, HearingUpdateError::CaseNotFound(123)));
}

#[tokio::test]
async fn test_malformed_message_is_rejected() {
    let listener = HearingUpdateListener::new(store_with_case(CaseData::new()));

    let err = listener.process("{}").await.unwrap_err();
    assert!(matches!(err, HearingUpdateError::InvalidMessage(_)));

    let no_id = json!({
        "caseId": CASE_ID.to_string(),
        "hearingUpdate": { "hmcStatus": "LISTED" }
    });
    let err = listener.process(&no_id.to_string()).await.unwrap_err();
    assert!(matches!(err, HearingUpdateError::InvalidMessage(_)));
}

/// Yields between the read and the write so concurrent updates interleave.
struct SlowStore(Arc<InMemoryCaseStore>);

#[async_trait]
impl CaseStore for SlowStore {
    async fn get_case(&self, case_id: i64) -> Result<Option<CaseDetails>, CaseStoreError> {
        let case = self.0.get_case(case_id).await;
        tokio::task::yield_now().await;
        case
    }

    async fn update_case(&self, case: CaseDetails) -> Result<(), CaseStoreError> {
        tokio::task::yield_now().await;
        self.0.update_case(case).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_for_one_case_are_all_kept() {
    let store = store_with_case(CaseData::new());
    let listener = Arc::new(HearingUpdateListener::new(Arc::new(SlowStore(store.clone()))));
    let (tx, source) = ChannelMessageSource::channel(64);
    let acks = source.acknowledgements();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = QueueListener::new("hearing-updates", source, listener, 4);
    let handle = tokio::spawn(listener.run(shutdown_rx));

    for hearing_id in 1..=32 {
        let message = json!({
            "caseId": CASE_ID.to_string(),
            "hearingId": hearing_id.to_string(),
            "hearingUpdate": { "versionNumber": 1, "hmcStatus": "LISTED" }
        });
        tx.send(QueueMessage::new(message.to_string())).await.unwrap();
    }
    drop(tx);

    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("listener should stop once the source closes")
        .unwrap();

    assert_eq!(acks.len(), 32);
    let stored = hearings(&store).await;
    assert_eq!(stored.len(), 32);
    assert!(stored.iter().all(|h| h.hearing_status == Some(HearingStatus::Listed)));
}

#[tokio::test]
async fn test_answered_request_is_settled() {
    let pending = Arc::new(PendingHearingRequests::new());
    let request = HearingRequest::new(
        CASE_ID.to_string(),
        HearingRoute::ListAssist,
        HearingState::CreateHearing,
    );
    assert!(pending.try_reserve(&request));

    let listener = HearingUpdateListener::new(store_with_case(CaseData::new()))
        .with_pending_requests(pending.clone());

    let awaiting = json!({
        "caseId": CASE_ID.to_string(),
        "hearingUpdate": { "hearingRequestId": 9, "hmcStatus": "AWAITING_LISTING" }
    });
    listener.process(&awaiting.to_string()).await.unwrap();
    assert!(pending.is_outstanding(&CASE_ID.to_string(), HearingState::CreateHearing));

    let listed = json!({
        "caseId": CASE_ID.to_string(),
        "hearingUpdate": { "hearingRequestId": 9, "hmcStatus": "LISTED" }
    });
    listener.process(&listed.to_string()).await.unwrap();
    assert!(pending.is_empty());
}
