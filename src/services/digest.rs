// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard digest orchestration.
//!
//! Ties the pipeline together for one scheduled run:
//! window bounds -> summary recomputation -> ranking -> rendering ->
//! webhook dispatch. Aggregation and dispatch stay decoupled: a failed
//! send is reported and can be re-triggered without recomputing anything
//! durable.

use crate::error::Result;
use crate::services::aggregation::AggregationEngine;
use crate::services::dispatch::DispatchClient;
use crate::services::leaderboard::build_leaderboard;
use crate::services::render::{render_leaderboard, MAX_MESSAGE_CHARS};
use crate::windows::ReportWindow;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Result of one dispatch trigger.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DispatchOutcome {
    pub dispatched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub window_label: String,
}

/// Builds and dispatches leaderboard digests.
#[derive(Clone)]
pub struct DigestService {
    engine: AggregationEngine,
    dispatch: DispatchClient,
    top_n: usize,
    /// Dedup tokens of windows already dispatched by this process.
    /// The scheduler contract serializes triggers; this set defensively
    /// suppresses re-entrant calls for an identical window.
    dispatched: Arc<DashMap<String, DateTime<Utc>>>,
}

impl DigestService {
    pub fn new(engine: AggregationEngine, dispatch: DispatchClient, top_n: usize) -> Self {
        Self {
            engine,
            dispatch,
            top_n,
            dispatched: Arc::new(DashMap::new()),
        }
    }

    /// Run one leaderboard digest: aggregate the window, rank, render,
    /// dispatch to the channel.
    ///
    /// A duplicate trigger for an already-dispatched window is suppressed
    /// (`dispatched=false`, no error). Dispatch failures are reported in
    /// the outcome with the token needed for a manual re-trigger; they
    /// never corrupt aggregates and never panic. Only storage and render
    /// failures propagate as errors so the scheduler retries the run.
    pub async fn run(&self, window: ReportWindow, date: NaiveDate) -> Result<DispatchOutcome> {
        let token = window.dedup_token(date);
        let label = window.label(date);

        if let Some(at) = self.dispatched.get(&token) {
            tracing::warn!(
                token,
                dispatched_at = %crate::windows::format_utc_rfc3339(*at),
                "Duplicate dispatch trigger suppressed"
            );
            return Ok(DispatchOutcome {
                dispatched: false,
                message_id: None,
                error: None,
                window_label: label,
            });
        }

        let (start, end) = window.bounds(date);
        tracing::info!(
            token,
            start = %crate::windows::format_utc_rfc3339(start),
            end = %crate::windows::format_utc_rfc3339(end),
            "Building leaderboard digest"
        );

        let summaries = self.engine.query_window(start, end).await?;
        let (entries, stats) = build_leaderboard(&summaries, self.top_n);
        let payload = render_leaderboard(&entries, &stats, &label, MAX_MESSAGE_CHARS)?;

        match self.dispatch.send(&payload, &token).await {
            Ok(receipt) => {
                self.dispatched.insert(token.clone(), Utc::now());
                tracing::info!(
                    token,
                    message_id = %receipt.message_id,
                    attempts = receipt.attempts,
                    active_users = stats.active_users,
                    "Leaderboard dispatched"
                );
                Ok(DispatchOutcome {
                    dispatched: true,
                    message_id: Some(receipt.message_id),
                    error: None,
                    window_label: label,
                })
            }
            Err(e) => {
                // Aggregation is untouched; the operator can re-trigger
                // this window as-is
                tracing::error!(token, error = %e, "Digest dispatch failed");
                Ok(DispatchOutcome {
                    dispatched: false,
                    message_id: None,
                    error: Some(e.to_string()),
                    window_label: label,
                })
            }
        }
    }
}
