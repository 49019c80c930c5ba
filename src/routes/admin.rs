// SPDX-License-Identifier: MIT

//! Operator routes: pause/resume the pipeline, drain queues, and read
//! the bookkeeping record. Deployed behind Cloud Run IAM, so no
//! application-level auth here.

use crate::error::Result;
use crate::models::Bookkeeping;
use crate::AppState;
use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/pause", post(pause))
        .route("/admin/resume", post(resume))
        .route("/admin/drain", post(drain))
        .route("/admin/status", get(status))
}

#[derive(Serialize)]
struct ProcessingResponse {
    processing_enabled: bool,
}

#[derive(Serialize)]
struct DrainResponse {
    purged_queues: Vec<String>,
}

/// Stop the search and scrape stages from taking on new work.
async fn pause(State(state): State<Arc<AppState>>) -> Result<Json<ProcessingResponse>> {
    state.db.set_processing_enabled(false).await?;
    Ok(Json(ProcessingResponse {
        processing_enabled: false,
    }))
}

/// Resume paused processing.
async fn resume(State(state): State<Arc<AppState>>) -> Result<Json<ProcessingResponse>> {
    state.db.set_processing_enabled(true).await?;
    Ok(Json(ProcessingResponse {
        processing_enabled: true,
    }))
}

/// Purge queued discovery work.
///
/// Only the search and scrape queues are purged; queued publishes refer
/// to records already cached and should still go out.
async fn drain(State(state): State<Arc<AppState>>) -> Result<Json<DrainResponse>> {
    let purged_queues = state.tasks_service.purge_pipeline_queues().await?;
    Ok(Json(DrainResponse { purged_queues }))
}

/// Read the per-stage bookkeeping record.
async fn status(State(state): State<Arc<AppState>>) -> Result<Json<Bookkeeping>> {
    let bookkeeping = state.db.get_bookkeeping().await?;
    Ok(Json(bookkeeping))
}
