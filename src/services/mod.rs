// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregation;
pub mod digest;
pub mod dispatch;
pub mod leaderboard;
pub mod render;

pub use aggregation::{ActivityInput, AggregationEngine, IngestResult};
pub use digest::{DigestService, DispatchOutcome};
pub use dispatch::{DispatchClient, DispatchConfig, DispatchReceipt};
pub use leaderboard::build_leaderboard;
pub use render::{render_leaderboard, render_milestone, ChatPayload};
