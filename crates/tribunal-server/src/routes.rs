//! Callback endpoints called by the case platform.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{Instrument, debug};

use tribunal_core::{Callback, CallbackDispatcher, CallbackResponse, Phase};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::observability::callback_span;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: CallbackDispatcher,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidEventParams {
    #[serde(default)]
    pub page_id: Option<String>,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/ccdAboutToStart", post(about_to_start))
        .route("/ccdMidEvent", post(mid_event))
        .route("/ccdAboutToSubmit", post(about_to_submit))
        .route("/ccdSubmittedEvent", post(submitted))
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    if req.uri().path() == "/health" {
                        return tracing::span!(tracing::Level::TRACE, "noop");
                    }
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status().as_u16();
                        span.record("http.status_code", tracing::field::display(status));
                        if let Some(meta) = span.metadata()
                            && meta.name() != "noop"
                        {
                            tracing::info!(
                                http.status = %res.status().as_u16(),
                                elapsed_ms = %latency.as_millis(),
                                "request handled"
                            );
                        }
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

async fn about_to_start(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<CallbackResponse>, ApiError> {
    handle_callback(&state, Phase::AboutToStart, &body, None).await
}

async fn mid_event(
    State(state): State<AppState>,
    Query(params): Query<MidEventParams>,
    body: String,
) -> Result<Json<CallbackResponse>, ApiError> {
    handle_callback(&state, Phase::MidEvent, &body, params.page_id).await
}

async fn about_to_submit(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<CallbackResponse>, ApiError> {
    handle_callback(&state, Phase::AboutToSubmit, &body, None).await
}

async fn submitted(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<CallbackResponse>, ApiError> {
    handle_callback(&state, Phase::Submitted, &body, None).await
}

async fn handle_callback(
    state: &AppState,
    phase: Phase,
    body: &str,
    page_id: Option<String>,
) -> Result<Json<CallbackResponse>, ApiError> {
    let mut callback = Callback::from_json(body)?;
    if let Some(page_id) = page_id {
        callback = callback.with_page_id(page_id);
    }
    let span = callback_span(phase.as_str(), callback.event.ccd_id(), callback.case_id());
    span.in_scope(|| debug!("Dispatching callback"));
    let response = state
        .dispatcher
        .dispatch(phase, &callback)
        .instrument(span)
        .await?;
    Ok(Json(response))
}
