// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard builder: pure ranking over window summaries.
//!
//! The ordering is a total order, so ranks are dense and every build
//! over the same input yields byte-identical output:
//! points descending, then last activity ascending (earlier achievement
//! ranks higher), then user id ascending.

use crate::models::{LeaderboardEntry, LeaderboardStats, WindowSummary};
use std::cmp::Ordering;

/// Build a ranked leaderboard from window summaries.
///
/// Users with zero points are excluded, not ranked. `stats` covers the
/// entire filtered set; `entries` is truncated to `top_n`.
pub fn build_leaderboard(
    summaries: &[WindowSummary],
    top_n: usize,
) -> (Vec<LeaderboardEntry>, LeaderboardStats) {
    let mut active: Vec<&WindowSummary> = summaries.iter().filter(|s| s.points > 0).collect();
    active.sort_by(compare_summaries);

    let stats = LeaderboardStats {
        active_users: active.len() as u32,
        total_points: active.iter().map(|s| s.points).sum(),
    };

    let entries = active
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, summary)| LeaderboardEntry {
            rank: (i + 1) as u32,
            user_id: summary.user_id.clone(),
            display_name: summary.display_name.clone(),
            points: summary.points,
            activity_counts: summary.activity_counts.clone(),
        })
        .collect();

    (entries, stats)
}

/// The ranking total order.
fn compare_summaries(a: &&WindowSummary, b: &&WindowSummary) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| a.last_activity_at.cmp(&b.last_activity_at))
        .then_with(|| a.user_id.cmp(&b.user_id))
}
