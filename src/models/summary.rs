//! Derived per-user window summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Points and activity counts for one user over one window.
///
/// Always recomputed from the stored activities; never persisted as
/// authoritative state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSummary {
    pub user_id: String,
    pub display_name: String,
    /// Inclusive window start
    pub window_start: DateTime<Utc>,
    /// Exclusive window end
    pub window_end: DateTime<Utc>,
    /// Point sum over the window
    pub points: i64,
    /// Activity count per type over the window
    pub activity_counts: HashMap<String, u32>,
    /// Most recent activity timestamp inside the window (ranking tie-break)
    pub last_activity_at: DateTime<Utc>,
}
