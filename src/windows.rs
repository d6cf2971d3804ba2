// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reporting windows: half-open UTC time ranges for leaderboard runs.
//!
//! All window math is UTC; weeks are ISO weeks (Monday start).

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Window kind for a leaderboard run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportWindow {
    Daily,
    Weekly,
    Monthly,
}

impl ReportWindow {
    /// Half-open `[start, end)` UTC bounds of the window containing `date`.
    pub fn bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let (start, end) = match self {
            ReportWindow::Daily => (date, date + Duration::days(1)),
            ReportWindow::Weekly => {
                let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
                (monday, monday + Duration::days(7))
            }
            ReportWindow::Monthly => {
                let first = date.with_day(1).unwrap_or(date);
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                }
                .unwrap_or(first + Duration::days(31));
                (first, next)
            }
        };
        (start_of_day_utc(start), start_of_day_utc(end))
    }

    /// Period identifier used in labels and dedup tokens,
    /// e.g. "2026-08-07", "2026-W32", "2026-08".
    pub fn period(&self, date: NaiveDate) -> String {
        match self {
            ReportWindow::Daily => date.format("%Y-%m-%d").to_string(),
            ReportWindow::Weekly => {
                let iso = date.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            }
            ReportWindow::Monthly => date.format("%Y-%m").to_string(),
        }
    }

    /// Human heading for rendered messages.
    pub fn heading(&self) -> &'static str {
        match self {
            ReportWindow::Daily => "Daily",
            ReportWindow::Weekly => "Weekly",
            ReportWindow::Monthly => "Monthly",
        }
    }

    /// Full display label, e.g. "Weekly Leaderboard · 2026-W32".
    pub fn label(&self, date: NaiveDate) -> String {
        format!("{} Leaderboard · {}", self.heading(), self.period(date))
    }

    /// Stable dedup token for one logical dispatch of this window.
    pub fn dedup_token(&self, date: NaiveDate) -> String {
        format!("{}:{}", self.heading().to_lowercase(), self.period(date))
    }
}

fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}
