// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activities (append-only log of ingested sales activities)
//! - User totals (running point aggregates + idempotency set)
//!
//! All range queries filter on the RFC3339 encoding of `timestamp`;
//! activity timestamps are normalized to whole seconds at ingestion so
//! the encoding is uniform and string range filters compare correctly.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Activity, UserTotals};
use crate::windows::format_utc_rfc3339;
use chrono::{DateTime, Utc};

// Firestore limits a single transaction to 500 operations. Ingestion
// writes one document per accepted activity plus the totals document,
// so batches are capped with headroom to spare.
pub const MAX_BATCH_ACTIVITIES: usize = 400;

/// Outcome of a transactional batch ingest.
#[derive(Debug, Clone)]
pub struct BatchCommit {
    /// Activities newly written in this call
    pub applied: u32,
    /// Point sum of the newly written activities
    pub applied_points: i64,
    /// Activities skipped as already ingested
    pub duplicates: u32,
    /// Totals document as of after the commit
    pub totals: UserTotals,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // ExternalJwtFunctionSource provides a dummy token without needing
        // a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Totals Operations ──────────────────────────────────

    /// Get the totals aggregate for a user.
    pub async fn get_user_totals(&self, user_id: &str) -> Result<Option<UserTotals>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_TOTALS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store the totals aggregate for a user.
    pub async fn set_user_totals(&self, totals: &UserTotals) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_TOTALS)
            .document_id(&totals.user_id)
            .object(totals)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Get a single activity by its idempotency key.
    pub async fn get_activity(
        &self,
        user_id: &str,
        activity_id: &str,
    ) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(&Activity::doc_id(user_id, activity_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get activities for one user within `[start, end)`.
    pub async fn query_activities_by_user(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>, AppError> {
        let user_id = user_id.to_string();
        let start = format_utc_rfc3339(start);
        let end = format_utc_rfc3339(end);

        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("timestamp").greater_than_or_equal(start.clone()),
                    q.field("timestamp").less_than(end.clone()),
                ])
            })
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all activities across users within `[start, end)`.
    pub async fn query_activities(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>, AppError> {
        let start = format_utc_rfc3339(start);
        let end = format_utc_rfc3339(end);

        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("timestamp").greater_than_or_equal(start.clone()),
                    q.field("timestamp").less_than(end.clone()),
                ])
            })
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Batch Ingest ─────────────────────────────────────

    /// Atomically ingest a batch of activities for one user: append every
    /// previously unseen activity and update the totals aggregate in a
    /// single Firestore transaction.
    ///
    /// The duplicate check runs against the `ingested_activity_ids` set on
    /// the totals document inside the transaction, so a concurrent commit
    /// for the same user forces a retry with fresh data rather than
    /// double-counting. If nothing in the batch is new, no write happens.
    ///
    /// All activities in `batch` must belong to `user_id`, carry resolved
    /// non-negative points, and have been deduplicated within the batch by
    /// the caller.
    pub async fn ingest_batch_atomic(
        &self,
        user_id: &str,
        display_name: &str,
        batch: &[Activity],
    ) -> Result<BatchCommit, AppError> {
        if batch.len() > MAX_BATCH_ACTIVITIES {
            return Err(AppError::BadRequest(format!(
                "Batch of {} exceeds the {} activity limit",
                batch.len(),
                MAX_BATCH_ACTIVITIES
            )));
        }

        let now = Utc::now();

        // Begin a transaction
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // 1. Read current totals within the transaction
        //    This registers the document for conflict detection
        let current: Option<UserTotals> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_TOTALS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read totals in transaction: {}", e))
            })?;

        let mut totals = current.unwrap_or_else(|| UserTotals::new(user_id, display_name));
        totals.display_name = display_name.to_string();

        // 2. Apply the batch in memory; the idempotency set decides which
        //    activities are new
        let mut applied = 0u32;
        let mut applied_points = 0i64;
        let mut duplicates = 0u32;
        let mut to_write: Vec<&Activity> = Vec::new();

        for activity in batch {
            if totals.apply_activity(activity, now) {
                applied += 1;
                applied_points += activity.points;
                to_write.push(activity);
            } else {
                duplicates += 1;
            }
        }

        // 3. Nothing new: roll back, no write at all
        if applied == 0 {
            let _ = transaction.rollback().await;
            tracing::debug!(
                user_id,
                duplicates,
                "Batch fully duplicate (idempotent skip)"
            );
            return Ok(BatchCommit {
                applied,
                applied_points,
                duplicates,
                totals,
            });
        }

        // 4. Add activity writes to the transaction
        for activity in &to_write {
            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::ACTIVITIES)
                .document_id(Activity::doc_id(&activity.user_id, &activity.activity_id))
                .object(*activity)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add activity to transaction: {}", e))
                })?;
        }

        // 5. Add the totals write to the transaction
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_TOTALS)
            .document_id(user_id)
            .object(&totals)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add totals to transaction: {}", e))
            })?;

        // 6. Commit atomically: either every activity and the totals land,
        //    or none do (no partial credit)
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id,
            applied,
            duplicates,
            new_total = totals.total_points,
            "Activity batch ingested atomically"
        );

        Ok(BatchCommit {
            applied,
            applied_points,
            duplicates,
            totals,
        })
    }
}
