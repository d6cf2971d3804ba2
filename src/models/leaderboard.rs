// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard snapshot types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One ranked row of a leaderboard snapshot.
///
/// Produced fresh for each build; never stored as authoritative state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    /// Dense rank, starting at 1
    pub rank: u32,
    pub user_id: String,
    pub display_name: String,
    pub points: i64,
    /// Activity count per type over the ranked window
    pub activity_counts: HashMap<String, u32>,
}

/// Aggregate stats over the entire filtered set (not just the top-N slice).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardStats {
    /// Users with at least one point in the window
    pub active_users: u32,
    /// Point sum across all active users
    pub total_points: i64,
}
