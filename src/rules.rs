// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Point rules: the mapping from activity type to point value.
//!
//! Rules are resolved once at ingestion time and the resolved value is
//! stored on the activity record, so later rule changes never rewrite
//! history. The table is versioned for logging and audit.

use serde::Deserialize;
use std::collections::HashMap;
use std::env;

/// Built-in rule table version.
const BUILTIN_VERSION: u32 = 1;

/// Versioned mapping from activity type to point value.
#[derive(Debug, Clone)]
pub struct PointRules {
    version: u32,
    table: HashMap<String, i64>,
}

/// Shape of the `POINT_RULES` env override.
#[derive(Debug, Deserialize)]
struct RulesOverride {
    version: u32,
    rules: HashMap<String, i64>,
}

impl Default for PointRules {
    fn default() -> Self {
        let table = [
            ("call", 10),
            ("email", 5),
            ("appointment", 20),
            ("demo", 30),
            ("contract", 50),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            version: BUILTIN_VERSION,
            table,
        }
    }
}

impl PointRules {
    /// Load rules, honoring a `POINT_RULES` env override if present.
    ///
    /// The override is a JSON document:
    /// `{"version": 2, "rules": {"call": 10, "contract": 75}}`
    pub fn from_env() -> Result<Self, RulesError> {
        match env::var("POINT_RULES") {
            Ok(raw) => Self::from_json(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parse a rule table from its JSON representation.
    pub fn from_json(raw: &str) -> Result<Self, RulesError> {
        let parsed: RulesOverride =
            serde_json::from_str(raw).map_err(|e| RulesError::Invalid(e.to_string()))?;

        if parsed.rules.is_empty() {
            return Err(RulesError::Invalid("rule table is empty".to_string()));
        }
        for (activity_type, points) in &parsed.rules {
            if *points < 0 {
                return Err(RulesError::NegativePoints {
                    activity_type: activity_type.clone(),
                    points: *points,
                });
            }
        }

        Ok(Self {
            version: parsed.version,
            table: parsed.rules,
        })
    }

    /// Build rules from an explicit table (tests and embedding callers).
    pub fn from_table(version: u32, table: HashMap<String, i64>) -> Self {
        Self { version, table }
    }

    /// Resolve an activity type to its point value.
    pub fn resolve(&self, activity_type: &str) -> Option<i64> {
        self.table.get(activity_type).copied()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Rule loading errors
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Invalid POINT_RULES: {0}")]
    Invalid(String),

    #[error("Negative point value for '{activity_type}': {points}")]
    NegativePoints { activity_type: String, points: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_resolve() {
        let rules = PointRules::default();
        assert_eq!(rules.resolve("call"), Some(10));
        assert_eq!(rules.resolve("appointment"), Some(20));
        assert_eq!(rules.resolve("skydiving"), None);
        assert_eq!(rules.version(), 1);
    }

    #[test]
    fn test_override_parses() {
        let rules =
            PointRules::from_json(r#"{"version": 3, "rules": {"call": 15, "contract": 100}}"#)
                .expect("override should parse");
        assert_eq!(rules.version(), 3);
        assert_eq!(rules.resolve("call"), Some(15));
        // Types absent from the override are unknown
        assert_eq!(rules.resolve("email"), None);
    }

    #[test]
    fn test_negative_points_rejected() {
        let err = PointRules::from_json(r#"{"version": 2, "rules": {"call": -5}}"#)
            .expect_err("negative points must be rejected");
        assert!(matches!(err, RulesError::NegativePoints { .. }));
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = PointRules::from_json(r#"{"version": 2, "rules": {}}"#)
            .expect_err("empty table must be rejected");
        assert!(matches!(err, RulesError::Invalid(_)));
    }
}
