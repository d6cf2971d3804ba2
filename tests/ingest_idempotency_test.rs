// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end ingestion tests against the Firestore emulator:
//! idempotency, conservation across windows, and same-user concurrency.

use chrono::{DateTime, Utc};
use salesboard::services::aggregation::ActivityInput;
use std::collections::HashMap;

mod common;
use common::test_engine;

const NUM_CONCURRENT_BATCHES: u64 = 10;

fn input(id: &str, activity_type: &str, ts: &str) -> ActivityInput {
    ActivityInput {
        id: Some(id.to_string()),
        activity_type: activity_type.to_string(),
        timestamp: Some(ts.parse().unwrap()),
        metadata: HashMap::new(),
    }
}

fn t(ts: &str) -> DateTime<Utc> {
    ts.parse().unwrap()
}

/// Fresh user id per run so reruns against a warm emulator stay isolated.
fn unique_user(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_ingest_then_reingest_is_idempotent() {
    require_emulator!();
    let engine = test_engine().await;
    let user = unique_user("idem");

    // call=10, appointment=20 under the built-in rules
    let first = engine
        .ingest(
            &user,
            "Kim",
            vec![
                input("a1", "call", "2026-08-07T10:00:00Z"),
                input("a2", "appointment", "2026-08-07T10:01:00Z"),
            ],
        )
        .await
        .expect("first ingest failed");

    assert_eq!(first.accepted, 2);
    assert_eq!(first.duplicates, 0);
    assert_eq!(first.new_total, 30);

    // Retried submission of a1 alone: reported, not double-counted
    let second = engine
        .ingest(&user, "Kim", vec![input("a1", "call", "2026-08-07T10:00:00Z")])
        .await
        .expect("second ingest failed");

    assert_eq!(second.accepted, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(second.new_total, 30);
}

#[tokio::test]
async fn test_unknown_type_rejected_item_scoped() {
    require_emulator!();
    let engine = test_engine().await;
    let user = unique_user("reject");

    let result = engine
        .ingest(
            &user,
            "Lee",
            vec![
                input("a1", "call", "2026-08-07T10:00:00Z"),
                input("a2", "interpretive-dance", "2026-08-07T10:01:00Z"),
            ],
        )
        .await
        .expect("ingest failed");

    assert_eq!(result.accepted, 1);
    assert_eq!(result.rejected.len(), 1);
    assert_eq!(result.rejected[0].id.as_deref(), Some("a2"));
    assert_eq!(result.new_total, 10);
}

#[tokio::test]
async fn test_window_conservation() {
    require_emulator!();
    let engine = test_engine().await;
    let user_a = unique_user("cons-a");
    let user_b = unique_user("cons-b");

    engine
        .ingest(
            &user_a,
            "Kim",
            vec![
                input("a1", "call", "2026-03-02T09:00:00Z"),
                input("a2", "contract", "2026-03-03T15:00:00Z"),
            ],
        )
        .await
        .expect("ingest a failed");
    engine
        .ingest(
            &user_b,
            "Lee",
            vec![
                input("b1", "demo", "2026-03-02T11:00:00Z"),
                input("b2", "email", "2026-03-04T08:00:00Z"),
            ],
        )
        .await
        .expect("ingest b failed");

    // One window covering the whole range
    let whole = engine
        .query_window(t("2026-03-02T00:00:00Z"), t("2026-03-05T00:00:00Z"))
        .await
        .expect("whole-window query failed");

    // Three disjoint daily windows covering the same range
    let mut daily_sum = 0i64;
    for day in 2..5 {
        let start = t(&format!("2026-03-{:02}T00:00:00Z", day));
        let end = t(&format!("2026-03-{:02}T00:00:00Z", day + 1));
        let summaries = engine
            .query_window(start, end)
            .await
            .expect("daily query failed");
        daily_sum += summaries
            .iter()
            .filter(|s| s.user_id == user_a || s.user_id == user_b)
            .map(|s| s.points)
            .sum::<i64>();
    }

    let whole_sum: i64 = whole
        .iter()
        .filter(|s| s.user_id == user_a || s.user_id == user_b)
        .map(|s| s.points)
        .sum();

    // 10 + 50 + 30 + 5 from the two users
    assert_eq!(whole_sum, 95);
    assert_eq!(daily_sum, whole_sum);
}

#[tokio::test]
async fn test_concurrent_same_user_ingestion_loses_nothing() {
    // Concurrent batches for one user are serialized by the per-user
    // lock; if totals were read outside the commit scope an increment
    // could be lost.
    require_emulator!();
    let engine = test_engine().await;
    let user = unique_user("race");

    let mut handles = vec![];
    for i in 0..NUM_CONCURRENT_BATCHES {
        let engine = engine.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            engine
                .ingest(
                    &user,
                    "Race",
                    vec![input(
                        &format!("r{}", i),
                        "call",
                        "2026-08-07T10:00:00Z",
                    )],
                )
                .await
        }));
    }

    for handle in handles {
        handle
            .await
            .expect("Task join failed")
            .expect("Ingestion failed");
    }

    let totals = engine
        .totals(&user)
        .await
        .expect("Failed to fetch totals")
        .expect("Totals document not found");

    assert_eq!(
        totals.total_activities, NUM_CONCURRENT_BATCHES as u32,
        "Activity count mismatch due to race condition"
    );
    assert_eq!(
        totals.total_points,
        NUM_CONCURRENT_BATCHES as i64 * 10,
        "Point total mismatch due to race condition"
    );
}
