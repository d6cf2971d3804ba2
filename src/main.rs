// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Salesboard API Server
//!
//! Tracks sales-team activities, converts them into points, and pushes
//! ranked leaderboards to the team chat channel on a schedule.

use salesboard::{
    config::Config,
    db::FirestoreDb,
    rules::PointRules,
    services::{AggregationEngine, DigestService, DispatchClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Salesboard API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Load point rules (built-in defaults, optionally overridden via env)
    let rules = PointRules::from_env().expect("Failed to load point rules");
    tracing::info!(
        version = rules.version(),
        types = rules.len(),
        "Point rules loaded"
    );

    // Aggregation engine with its per-user lock table
    let engine = AggregationEngine::new(db.clone(), rules, config.milestone_points);

    // Chat webhook dispatch client
    let dispatch = DispatchClient::new(config.chat_webhook_url.clone(), config.dispatch.clone());
    tracing::info!(
        max_retries = config.dispatch.max_retries,
        "Dispatch client initialized"
    );

    // Digest service ties aggregation, ranking, rendering and dispatch together
    let digest = DigestService::new(engine.clone(), dispatch.clone(), config.leaderboard_top_n);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        engine,
        dispatch,
        digest,
    });

    // Build router
    let app = salesboard::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("salesboard=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
