// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sales activity record for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stored activity record in Firestore.
///
/// Records are append-only: once ingested they are immutable and never
/// deleted. `points` is resolved from the rule table at ingestion time
/// and stored here so later rule changes do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Caller-supplied or generated activity ID (unique per user)
    pub activity_id: String,
    /// Owning user ID
    pub user_id: String,
    /// Display name, denormalized for window scans
    pub display_name: String,
    /// Activity type ("call", "appointment", ...)
    pub activity_type: String,
    /// Point value resolved at ingestion
    pub points: i64,
    /// When the activity happened
    pub timestamp: DateTime<Utc>,
    /// Free-form caller metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// When this record was ingested
    pub recorded_at: DateTime<Utc>,
}

impl Activity {
    /// Firestore document ID: the idempotency key `(user_id, activity_id)`.
    ///
    /// Both parts are caller-supplied strings, so they are url-encoded to
    /// keep the document path well-formed.
    pub fn doc_id(user_id: &str, activity_id: &str) -> String {
        // ':' is percent-encoded inside each part, so the separator is
        // unambiguous and distinct key pairs cannot collide.
        format!(
            "{}:{}",
            urlencoding::encode(user_id),
            urlencoding::encode(activity_id)
        )
    }
}
