// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes: activity ingestion and leaderboard preview.

use crate::error::{AppError, Result};
use crate::models::{LeaderboardEntry, LeaderboardStats, UserTotals};
use crate::services::aggregation::ActivityInput;
use crate::services::leaderboard::build_leaderboard;
use crate::services::render::render_milestone;
use crate::services::IngestResult;
use crate::windows::{format_utc_rfc3339, ReportWindow};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const MAX_TOP_N: usize = 100;

/// API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", post(ingest_activities))
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/users/{user_id}/totals", get(get_user_totals))
}

// ─── Ingestion ───────────────────────────────────────────────

/// Batch ingestion request.
#[derive(Debug, Deserialize, Validate)]
pub struct IngestRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
    /// One transaction's worth at most; larger imports are split by the caller
    #[validate(length(min = 1, max = 400))]
    pub activities: Vec<ActivityInput>,
}

/// Ingest a batch of activities for one user.
///
/// Duplicates (retried submissions) are counted, not errors. Items with
/// unknown activity types are rejected individually; the rest of the
/// batch still lands atomically.
async fn ingest_activities(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResult>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let result = state
        .engine
        .ingest(&req.user_id, &req.display_name, req.activities)
        .await?;

    tracing::info!(
        user_id = %req.user_id,
        accepted = result.accepted,
        duplicates = result.duplicates,
        rejected = result.rejected.len(),
        new_total = result.new_total,
        "Activity batch ingested"
    );

    if result.achieved_milestone {
        // Celebratory message is best-effort: a channel failure must not
        // fail the ingest that already committed
        let message = render_milestone(&req.display_name, result.accepted_points, result.new_total);
        let token = format!("milestone:{}:{}", req.user_id, result.new_total);
        let dispatch = state.dispatch.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatch.send(&message, &token).await {
                tracing::warn!(token, error = %e, "Milestone notification failed");
            }
        });
    }

    Ok(Json(result))
}

// ─── Leaderboard Preview ─────────────────────────────────────

#[derive(Deserialize)]
struct LeaderboardQuery {
    window: ReportWindow,
    /// Any date inside the wanted window; defaults to today (UTC)
    date: Option<NaiveDate>,
    top_n: Option<usize>,
}

/// Leaderboard preview response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardResponse {
    pub window_label: String,
    pub as_of: String,
    pub entries: Vec<LeaderboardEntry>,
    pub stats: LeaderboardStats,
}

/// Build a leaderboard snapshot without dispatching it.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>> {
    let as_of = Utc::now();
    let date = params.date.unwrap_or_else(|| as_of.date_naive());
    let top_n = params
        .top_n
        .unwrap_or(state.config.leaderboard_top_n)
        .clamp(1, MAX_TOP_N);

    let (start, end) = params.window.bounds(date);
    let summaries = state.engine.query_window(start, end).await?;
    let (entries, stats) = build_leaderboard(&summaries, top_n);

    Ok(Json(LeaderboardResponse {
        window_label: params.window.label(date),
        as_of: format_utc_rfc3339(as_of),
        entries,
        stats,
    }))
}

// ─── User Totals ─────────────────────────────────────────────

/// Running totals response for one user.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TotalsResponse {
    pub user_id: String,
    pub display_name: String,
    pub total_points: i64,
    pub total_activities: u32,
    pub last_activity_at: Option<String>,
}

/// Get the running totals for one user.
async fn get_user_totals(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<TotalsResponse>> {
    let totals: UserTotals = state
        .engine
        .totals(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} has no activity", user_id)))?;

    Ok(Json(TotalsResponse {
        user_id: totals.user_id,
        display_name: totals.display_name,
        total_points: totals.total_points,
        total_activities: totals.total_activities,
        last_activity_at: totals.last_activity_at.map(format_utc_rfc3339),
    }))
}
