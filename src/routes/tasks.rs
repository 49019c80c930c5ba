// SPDX-License-Identifier: MIT

//! Stage handler routes for Cloud Tasks callbacks.
//!
//! Each handler runs one pipeline stage and maps its report onto an HTTP
//! status the queue understands: 500 retries the task, 429 makes the
//! queue back off, anything else completes it. The handlers themselves
//! never return an error for a handled stage outcome.

use crate::config::{PUBLISH_QUEUE_NAME, SCRAPE_QUEUE_NAME};
use crate::services::pipeline::{self, OutcomeStatus};
use crate::services::tasks::{PublishTask, ScrapeTask, SearchTask};
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Stage handler routes (called by Cloud Tasks and Cloud Scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/search", post(search))
        .route("/tasks/scrape", post(scrape))
        .route("/tasks/publish", post(publish))
        .route("/tasks/catchup", post(catchup))
        .route("/tasks/retention", post(retention))
}

fn status_code(status: OutcomeStatus) -> StatusCode {
    match status {
        OutcomeStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
        OutcomeStatus::Deferred => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::OK,
    }
}

fn report_response<T: Serialize>(status: OutcomeStatus, report: &T) -> Response {
    (status_code(status), Json(serde_json::json!(report))).into_response()
}

/// Verify the request came off the expected Cloud Tasks queue.
///
/// Cloud Run strips this header from external requests, so its presence
/// guarantees internal origin; the queue name is checked on top so a task
/// cannot land on the wrong stage handler.
fn verify_queue(headers: &HeaderMap, expected: &str) -> bool {
    let valid = headers
        .get("x-cloudtasks-queuename")
        .and_then(|h| h.to_str().ok())
        .map(|name| name == expected)
        .unwrap_or(false);

    if !valid {
        tracing::warn!(
            expected,
            header = ?headers.get("x-cloudtasks-queuename"),
            "Blocked request with missing or wrong queue header"
        );
    }

    valid
}

/// Scan one page of search results.
///
/// Cloud Scheduler kicks the pipeline off with an empty body; pagination
/// continuations carry an explicit offset.
async fn search(State(state): State<Arc<AppState>>, body: Option<Json<SearchTask>>) -> Response {
    let task = body.map(|Json(t)| t).unwrap_or_default();

    tracing::info!(start_index = task.start_index, "Search task received");

    let report = pipeline::run_search(
        &state.config,
        &state.db,
        &state.tasks_service,
        &state.source,
        task,
    )
    .await;

    report_response(report.status, &report)
}

/// Scrape one activity detail page (called by Cloud Tasks).
async fn scrape(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(task): Json<ScrapeTask>,
) -> Response {
    if !verify_queue(&headers, SCRAPE_QUEUE_NAME) {
        return StatusCode::FORBIDDEN.into_response();
    }

    tracing::info!(activity_url = %task.activity_url, "Scrape task received");

    let report = pipeline::run_scrape(&state.db, &state.tasks_service, &state.source, task).await;

    report_response(report.status, &report)
}

/// Announce one cached activity (called by Cloud Tasks).
async fn publish(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(task): Json<PublishTask>,
) -> Response {
    if !verify_queue(&headers, PUBLISH_QUEUE_NAME) {
        return StatusCode::FORBIDDEN.into_response();
    }

    tracing::info!(activity_id = %task.activity_id, "Publish task received");

    let report = pipeline::run_publish(&state.db, &state.discord, task).await;

    report_response(report.status, &report)
}

/// Re-enqueue publishes for unannounced records (Cloud Scheduler).
async fn catchup(State(state): State<Arc<AppState>>) -> Response {
    let report = pipeline::run_catchup(&state.db, &state.tasks_service).await;

    report_response(report.status, &report)
}

/// Drop cache entries outside the retention window (Cloud Scheduler).
async fn retention(State(state): State<Arc<AppState>>) -> Response {
    let report = pipeline::run_retention(&state.config, &state.db).await;

    report_response(report.status, &report)
}
