use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use tribunal_core::CallbackDispatcher;
use tribunal_hearings::{
    HearingPublishers, HearingRequest, HearingRoute, HearingState, PendingHearingRequests,
    SessionAwareMessagingService,
};
use tribunal_server::config::AppConfig;
use tribunal_server::handlers::{self, GAPS_CASE_WARNING};
use tribunal_server::routes::{AppState, build_app};

#[derive(Default)]
struct RecordingPublisher {
    sent: Mutex<Vec<HearingRequest>>,
}

#[async_trait]
impl SessionAwareMessagingService for RecordingPublisher {
    async fn send_message(&self, request: &HearingRequest) -> bool {
        self.sent.lock().unwrap().push(request.clone());
        true
    }
}

fn app(publisher: Arc<RecordingPublisher>) -> Router {
    app_with_pending(publisher, Arc::default())
}

fn app_with_pending(
    publisher: Arc<RecordingPublisher>,
    pending: Arc<PendingHearingRequests>,
) -> Router {
    let registry = handlers::registry(HearingPublishers::new(publisher), pending).unwrap();
    let dispatcher = CallbackDispatcher::new(Arc::new(registry));
    build_app(&AppConfig::default(), AppState { dispatcher })
}

fn ready_to_list(case_data: Value) -> String {
    json!({
        "case_details": {
            "id": 1625080769409918i64,
            "jurisdiction": "SSCS",
            "case_type_id": "Benefit",
            "state": "readyToList",
            "case_data": case_data
        },
        "event_id": "readyToList",
        "ignore_warnings": false
    })
    .to_string()
}

async fn post(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let response = app(Arc::default())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_about_to_submit_defaults_hearing_route() {
    let (status, body) = post(
        app(Arc::default()),
        "/ccdAboutToSubmit",
        ready_to_list(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hearingRoute"], "listAssist");
    assert_eq!(body["data"]["hearingState"], "createHearing");
    assert_eq!(body["errors"], json!([]));
    assert_eq!(body["warnings"], json!([]));
}

#[tokio::test]
async fn test_business_rejection_is_returned_with_200() {
    let (status, body) = post(
        app(Arc::default()),
        "/ccdAboutToSubmit",
        ready_to_list(json!({ "hearingRoute": "gaps" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warnings"], json!([GAPS_CASE_WARNING]));
}

#[tokio::test]
async fn test_missing_handler_is_server_error() {
    let (status, body) = post(
        app(Arc::default()),
        "/ccdAboutToStart",
        ready_to_list(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "configuration");
}

#[tokio::test]
async fn test_mid_event_without_handler_is_server_error() {
    let (status, _) = post(
        app(Arc::default()),
        "/ccdMidEvent?pageId=hearingRoute",
        ready_to_list(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_malformed_callback_is_bad_request() {
    let (status, body) =
        post(app(Arc::default()), "/ccdAboutToSubmit", "{\"nope\":1}".into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid");
}

#[tokio::test]
async fn test_submitted_publishes_hearing_request() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (status, body) = post(
        app(publisher.clone()),
        "/ccdSubmittedEvent",
        ready_to_list(json!({ "hearingRoute": "listAssist", "ccdCaseId": "1625080769409918" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hearingRoute"], "listAssist");

    let sent = publisher.sent.lock().unwrap();
    assert_eq!(
        *sent,
        vec![HearingRequest::new(
            "1625080769409918",
            HearingRoute::ListAssist,
            HearingState::CreateHearing
        )]
    );
}

#[tokio::test]
async fn test_resubmitted_event_publishes_once_until_answered() {
    let publisher = Arc::new(RecordingPublisher::default());
    let pending = Arc::new(PendingHearingRequests::new());
    let app = app_with_pending(publisher.clone(), pending.clone());
    let body = ready_to_list(json!({ "hearingRoute": "listAssist" }));

    for _ in 0..3 {
        let (status, _) = post(app.clone(), "/ccdSubmittedEvent", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(publisher.sent.lock().unwrap().len(), 1);

    // The scheduling system answered; a new listing request goes out.
    assert!(pending.settle("1625080769409918", tribunal_hearings::HmcStatus::Cancelled));
    let (status, _) = post(app, "/ccdSubmittedEvent", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(publisher.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_submitted_gaps_case_is_not_published() {
    let publisher = Arc::new(RecordingPublisher::default());
    let (status, _) = post(
        app(publisher.clone()),
        "/ccdSubmittedEvent",
        ready_to_list(json!({ "hearingRoute": "gaps" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(publisher.sent.lock().unwrap().is_empty());
}
