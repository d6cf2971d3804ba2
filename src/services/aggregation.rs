// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity aggregation engine.
//!
//! Handles the core ingestion workflow:
//! 1. Validate and normalize the submitted batch (resolve points, fill
//!    missing ids/timestamps, drop in-batch duplicates)
//! 2. Commit the surviving activities and the updated totals atomically
//! 3. Report per-item rejections and the milestone flag to the caller
//!
//! Also recomputes per-user window summaries for leaderboard builds.

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::{Activity, WindowSummary};
use crate::rules::PointRules;
use chrono::{DateTime, Timelike, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One submitted activity, before validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityInput {
    /// Caller-supplied idempotency id; generated when absent
    pub id: Option<String>,
    pub activity_type: String,
    /// Defaults to ingestion time when absent
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A batch item that failed validation. The rest of the batch still counts.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RejectedActivity {
    pub id: Option<String>,
    pub activity_type: String,
    pub reason: String,
}

/// Result of ingesting one batch.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IngestResult {
    /// Activities newly applied to the user's totals
    pub accepted: u32,
    /// Point sum of the accepted activities
    pub accepted_points: i64,
    /// Activities skipped as already ingested (in-batch or stored)
    pub duplicates: u32,
    /// Items rejected by validation
    pub rejected: Vec<RejectedActivity>,
    /// Running total after the batch
    pub new_total: i64,
    /// True when the accepted batch alone reached the milestone threshold
    pub achieved_milestone: bool,
}

/// Folds raw activity records into durable totals and window summaries.
#[derive(Clone)]
pub struct AggregationEngine {
    db: FirestoreDb,
    rules: PointRules,
    /// Point sum in a single submission that counts as a milestone
    milestone_points: i64,
    /// Per-user ingestion locks: writes for one user are serialized,
    /// different users proceed in parallel
    user_locks: Arc<DashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AggregationEngine {
    pub fn new(db: FirestoreDb, rules: PointRules, milestone_points: i64) -> Self {
        Self {
            db,
            rules,
            milestone_points,
            user_locks: Arc::new(DashMap::new()),
        }
    }

    /// Ingest a batch of activities for one user.
    ///
    /// Validation failures are item-scoped; duplicates are counted, not
    /// errors. The accepted remainder commits atomically: on a storage
    /// failure nothing is applied and the caller retries the whole batch
    /// (safe, because re-ingestion deduplicates).
    pub async fn ingest(
        &self,
        user_id: &str,
        display_name: &str,
        items: Vec<ActivityInput>,
    ) -> Result<IngestResult> {
        let now = Utc::now().with_nanosecond(0).unwrap_or_else(Utc::now);
        let (batch, rejected, in_batch_duplicates) =
            prepare_batch(&self.rules, user_id, display_name, items, now);

        if batch.is_empty() {
            // Every item failed validation outright: that is a batch-level
            // error, not a partial success
            if in_batch_duplicates == 0 && !rejected.is_empty() {
                let types: Vec<&str> =
                    rejected.iter().map(|r| r.activity_type.as_str()).collect();
                return Err(crate::error::AppError::UnknownActivityType(types.join(", ")));
            }

            // Only duplicates survived validation; report current totals untouched
            let total = self
                .db
                .get_user_totals(user_id)
                .await?
                .map(|t| t.total_points)
                .unwrap_or(0);
            return Ok(IngestResult {
                accepted: 0,
                accepted_points: 0,
                duplicates: in_batch_duplicates,
                rejected,
                new_total: total,
                achieved_milestone: false,
            });
        }

        // Serialize ingestion per user. The shard guard from the map is
        // dropped before awaiting so only the per-user mutex is held
        // across the transaction.
        let lock = self
            .user_locks
            .entry(user_id.to_string())
            .or_default()
            .clone();
        let _guard = lock.lock().await;

        let commit = self
            .db
            .ingest_batch_atomic(user_id, display_name, &batch)
            .await?;

        let achieved_milestone =
            self.milestone_points > 0 && commit.applied_points >= self.milestone_points;
        if achieved_milestone {
            tracing::info!(
                user_id,
                batch_points = commit.applied_points,
                threshold = self.milestone_points,
                "Submission milestone reached"
            );
        }

        Ok(IngestResult {
            accepted: commit.applied,
            accepted_points: commit.applied_points,
            duplicates: in_batch_duplicates + commit.duplicates,
            rejected,
            new_total: commit.totals.total_points,
            achieved_milestone,
        })
    }

    /// Recompute per-user summaries for every activity in `[start, end)`.
    ///
    /// Pure function of stored activities: idempotent, safe to run
    /// concurrently with ingestion (a build may miss an in-flight commit;
    /// the next build will see it).
    pub async fn query_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WindowSummary>> {
        let activities = self.db.query_activities(start, end).await?;
        Ok(summarize(&activities, start, end))
    }

    /// Current totals for one user (API surface).
    pub async fn totals(&self, user_id: &str) -> Result<Option<crate::models::UserTotals>> {
        self.db.get_user_totals(user_id).await
    }
}

/// Validate and normalize a submitted batch.
///
/// Returns the normalized activities, the rejected items, and the number
/// of in-batch duplicates (first occurrence of an id wins).
fn prepare_batch(
    rules: &PointRules,
    user_id: &str,
    display_name: &str,
    items: Vec<ActivityInput>,
    now: DateTime<Utc>,
) -> (Vec<Activity>, Vec<RejectedActivity>, u32) {
    let mut batch = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates = 0u32;

    for item in items {
        let Some(points) = rules.resolve(&item.activity_type) else {
            rejected.push(RejectedActivity {
                id: item.id,
                activity_type: item.activity_type,
                reason: "unknown activity type".to_string(),
            });
            continue;
        };
        if points < 0 {
            rejected.push(RejectedActivity {
                id: item.id,
                activity_type: item.activity_type,
                reason: format!("negative point value {}", points),
            });
            continue;
        }

        let activity_id = item
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if !seen.insert(activity_id.clone()) {
            duplicates += 1;
            continue;
        }

        // Whole-second normalization keeps the stored RFC3339 encoding
        // uniform for range filters.
        let timestamp = item
            .timestamp
            .unwrap_or(now)
            .with_nanosecond(0)
            .unwrap_or(now);

        batch.push(Activity {
            activity_id,
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            activity_type: item.activity_type,
            points,
            timestamp,
            metadata: item.metadata,
            recorded_at: now,
        });
    }

    (batch, rejected, duplicates)
}

/// Fold activities into per-user window summaries.
///
/// Activities are expected in ascending timestamp order (as returned by
/// the store), so the last seen display name per user wins.
pub fn summarize(
    activities: &[Activity],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<WindowSummary> {
    let mut by_user: HashMap<String, WindowSummary> = HashMap::new();

    for activity in activities {
        let entry = by_user
            .entry(activity.user_id.clone())
            .or_insert_with(|| WindowSummary {
                user_id: activity.user_id.clone(),
                display_name: activity.display_name.clone(),
                window_start: start,
                window_end: end,
                points: 0,
                activity_counts: HashMap::new(),
                last_activity_at: activity.timestamp,
            });

        entry.points += activity.points;
        *entry
            .activity_counts
            .entry(activity.activity_type.clone())
            .or_insert(0) += 1;
        if activity.timestamp >= entry.last_activity_at {
            entry.last_activity_at = activity.timestamp;
            entry.display_name = activity.display_name.clone();
        }
    }

    let mut summaries: Vec<WindowSummary> = by_user.into_values().collect();
    // Deterministic output order independent of hash iteration
    summaries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    summaries
}
