// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use salesboard::config::Config;
use salesboard::db::FirestoreDb;
use salesboard::routes::create_router;
use salesboard::rules::PointRules;
use salesboard::services::{AggregationEngine, DigestService, DispatchClient};
use salesboard::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create an aggregation engine backed by the emulator.
#[allow(dead_code)]
pub async fn test_engine() -> AggregationEngine {
    let config = Config::default();
    AggregationEngine::new(test_db().await, PointRules::default(), config.milestone_points)
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let db = test_db_offline();
    let engine = AggregationEngine::new(db.clone(), PointRules::default(), config.milestone_points);
    let dispatch = DispatchClient::new(config.chat_webhook_url.clone(), config.dispatch.clone());
    let digest = DigestService::new(engine.clone(), dispatch.clone(), config.leaderboard_top_n);

    let state = Arc::new(AppState {
        config,
        db,
        engine,
        dispatch,
        digest,
    });

    (create_router(state.clone()), state)
}
