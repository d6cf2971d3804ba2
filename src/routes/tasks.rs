// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scheduled trigger routes.
//!
//! These endpoints are called by Cloud Scheduler via the dispatch queue,
//! not directly by users. They should be protected by OIDC token
//! verification in production.

use crate::windows::ReportWindow;
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Trigger routes (called by the scheduler).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/dispatch-leaderboard", post(dispatch_leaderboard))
}

/// Payload sent by the scheduler for one leaderboard run.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchTriggerPayload {
    pub window: ReportWindow,
    /// Any date inside the wanted window; defaults to today (UTC)
    pub date: Option<NaiveDate>,
}

/// Build and dispatch one leaderboard digest (called by the scheduler).
async fn dispatch_leaderboard(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<DispatchTriggerPayload>,
) -> Response {
    // Security Check: Ensure request comes through the scheduler queue.
    // Cloud Run strips this header from external requests, so its presence
    // guarantees internal origin. We also verify the queue name matches.
    let queue_name_header = headers.get("x-cloudtasks-queuename");
    let is_valid_queue = queue_name_header
        .and_then(|h| h.to_str().ok())
        .map(|name| name == crate::config::DISPATCH_QUEUE_NAME)
        .unwrap_or(false);

    if !is_valid_queue {
        tracing::warn!(
            window = ?payload.window,
            header = ?queue_name_header,
            "Security Alert: Blocked unauthorized access to dispatch_leaderboard"
        );
        return StatusCode::FORBIDDEN.into_response();
    }

    let date = payload.date.unwrap_or_else(|| Utc::now().date_naive());
    tracing::info!(window = ?payload.window, %date, "Dispatch trigger received");

    match state.digest.run(payload.window, date).await {
        Ok(outcome) => axum::Json(outcome).into_response(),
        // Storage/render failure: return 500 to trigger a scheduler retry
        Err(e) => e.into_response(),
    }
}
