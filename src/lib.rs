// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Salesboard: sales-team activity tracking and leaderboard dispatch.
//!
//! This crate provides the backend API for ingesting sales activities,
//! maintaining per-user point totals, and pushing ranked leaderboards
//! to the team chat channel.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod rules;
pub mod services;
pub mod windows;

use config::Config;
use db::FirestoreDb;
use services::{AggregationEngine, DigestService, DispatchClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub engine: AggregationEngine,
    pub dispatch: DispatchClient,
    pub digest: DigestService,
}
