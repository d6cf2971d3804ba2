//! Per-user point total aggregates.
//!
//! These aggregates are the durable source of truth for running totals,
//! updated atomically with activity writes via Firestore transactions.
//! The set of ingested activity IDs lives on the same document so the
//! idempotency check and the total update commit together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::models::Activity;

/// Materialized running totals for a user.
///
/// Stored in the `user_totals` collection, keyed by user ID.
/// `total_points` is monotonically non-decreasing: it only changes when
/// a previously unseen activity is applied, and point values are
/// validated non-negative at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTotals {
    /// User ID (also the document ID)
    pub user_id: String,
    /// Display name shown on leaderboards
    pub display_name: String,

    // ─── Totals ──────────────────────────────────────────────────
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub total_activities: u32,
    /// Activity count per type
    #[serde(default)]
    pub activities_by_type: HashMap<String, u32>,

    // ─── Idempotency ─────────────────────────────────────────────
    /// IDs of every activity ever applied (duplicate detection)
    #[serde(default)]
    pub ingested_activity_ids: HashSet<String>,

    // ─── Metadata ────────────────────────────────────────────────
    /// Timestamp of the most recent activity; only moves forward
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Last aggregate update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserTotals {
    pub fn new(user_id: &str, display_name: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            total_points: 0,
            total_activities: 0,
            activities_by_type: HashMap::new(),
            ingested_activity_ids: HashSet::new(),
            last_activity_at: None,
            updated_at: None,
        }
    }

    /// Apply a new activity to the aggregate.
    ///
    /// Returns `true` if the activity was applied (new).
    /// Returns `false` if the activity was already ingested (duplicate);
    /// in that case no field changes.
    pub fn apply_activity(&mut self, activity: &Activity, now: DateTime<Utc>) -> bool {
        // Idempotency check: skip if already ingested
        if self.ingested_activity_ids.contains(&activity.activity_id) {
            return false;
        }

        self.ingested_activity_ids
            .insert(activity.activity_id.clone());
        self.updated_at = Some(now);

        self.total_points += activity.points;
        self.total_activities += 1;
        *self
            .activities_by_type
            .entry(activity.activity_type.clone())
            .or_insert(0) += 1;

        // last_activity_at only moves forward
        if self
            .last_activity_at
            .is_none_or(|prev| activity.timestamp > prev)
        {
            self.last_activity_at = Some(activity.timestamp);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_activity(id: &str, activity_type: &str, points: i64, ts: &str) -> Activity {
        Activity {
            activity_id: id.to_string(),
            user_id: "u1".to_string(),
            display_name: "Kim".to_string(),
            activity_type: activity_type.to_string(),
            points,
            timestamp: ts.parse().unwrap(),
            metadata: HashMap::new(),
            recorded_at: "2026-08-07T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_apply_activity_basic() {
        let mut totals = UserTotals::new("u1", "Kim");
        let activity = make_activity("a1", "call", 10, "2026-08-07T10:00:00Z");

        let applied = totals.apply_activity(&activity, Utc::now());

        assert!(applied);
        assert_eq!(totals.total_points, 10);
        assert_eq!(totals.total_activities, 1);
        assert_eq!(totals.activities_by_type.get("call"), Some(&1));
        assert_eq!(
            totals.last_activity_at,
            Some("2026-08-07T10:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn test_idempotency_skips_duplicate() {
        let mut totals = UserTotals::new("u1", "Kim");
        let activity = make_activity("a1", "call", 10, "2026-08-07T10:00:00Z");

        totals.apply_activity(&activity, Utc::now());
        let applied_again = totals.apply_activity(&activity, Utc::now());

        assert!(!applied_again);
        assert_eq!(totals.total_points, 10); // Not counted twice
        assert_eq!(totals.total_activities, 1);
    }

    #[test]
    fn test_totals_monotonic_over_sequence() {
        let mut totals = UserTotals::new("u1", "Kim");
        let mut previous = 0;

        for (i, points) in [10, 0, 20, 50, 5].iter().enumerate() {
            let activity = make_activity(
                &format!("a{}", i),
                "call",
                *points,
                "2026-08-07T10:00:00Z",
            );
            totals.apply_activity(&activity, Utc::now());
            assert!(totals.total_points >= previous);
            previous = totals.total_points;
        }
        assert_eq!(totals.total_points, 85);
    }

    #[test]
    fn test_last_activity_at_never_moves_backward() {
        let mut totals = UserTotals::new("u1", "Kim");

        let newer = make_activity("a1", "call", 10, "2026-08-07T10:00:00Z");
        let older = make_activity("a2", "email", 5, "2026-08-01T10:00:00Z");

        totals.apply_activity(&newer, Utc::now());
        totals.apply_activity(&older, Utc::now());

        // The older activity still counts, but the timestamp stays put
        assert_eq!(totals.total_points, 15);
        assert_eq!(
            totals.last_activity_at,
            Some("2026-08-07T10:00:00Z".parse().unwrap())
        );
    }
}
