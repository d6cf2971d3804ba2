// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification rendering: leaderboard snapshots to chat payloads.
//!
//! Rendering is a pure function separated from the network send so the
//! formatting is unit-testable without a live channel. Output is bounded
//! by the channel budget: entries that do not fit are dropped behind an
//! explicit "+N more" indicator instead of failing the render.

use crate::error::AppError;
use crate::models::{LeaderboardEntry, LeaderboardStats};
use serde::Serialize;

/// Character budget for one chat message. The webhook caps messages at
/// 4096 characters; the budget leaves headroom for channel decorations.
pub const MAX_MESSAGE_CHARS: usize = 3800;

/// Rendered message body for the chat webhook.
#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload {
    pub text: String,
}

/// Render a leaderboard snapshot into a bounded chat message.
///
/// Fails only on malformed input (negative points, broken rank order).
/// An empty leaderboard renders the "no activity" variant.
pub fn render_leaderboard(
    entries: &[LeaderboardEntry],
    stats: &LeaderboardStats,
    window_label: &str,
    limit: usize,
) -> Result<ChatPayload, AppError> {
    validate(entries)?;

    let header = format!("🏆 {}", window_label);
    let footer = format!(
        "{} active · {} pts total",
        stats.active_users, stats.total_points
    );

    if entries.is_empty() {
        return Ok(ChatPayload {
            text: format!("{}\nNo activity recorded this period.", header),
        });
    }

    let lines: Vec<String> = entries.iter().map(entry_line).collect();
    let line_chars: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
    let chrome = header.chars().count() + 1 + footer.chars().count();

    // Largest prefix of entries that fits the budget together with the
    // "+N more" indicator. The floor is header + indicator + footer even
    // when the budget is pathologically small.
    let total = entries.len();
    let mut shown = total;
    loop {
        let body: usize = line_chars[..shown].iter().map(|c| c + 1).sum();
        let more = if shown < total {
            more_line(total - shown).chars().count() + 1
        } else {
            0
        };
        if chrome + body + more <= limit || shown == 0 {
            break;
        }
        shown -= 1;
    }

    let mut text = header;
    for line in &lines[..shown] {
        text.push('\n');
        text.push_str(line);
    }
    if shown < total {
        text.push('\n');
        text.push_str(&more_line(total - shown));
    }
    text.push('\n');
    text.push_str(&footer);

    Ok(ChatPayload { text })
}

/// Render the milestone congratulation for a single large submission.
pub fn render_milestone(display_name: &str, batch_points: i64, new_total: i64) -> ChatPayload {
    ChatPayload {
        text: format!(
            "🎉 {} scored {} pts in a single submission! Running total: {} pts",
            display_name, batch_points, new_total
        ),
    }
}

fn validate(entries: &[LeaderboardEntry]) -> Result<(), AppError> {
    let mut prev_rank = 0;
    for entry in entries {
        if entry.points < 0 {
            return Err(AppError::Render(format!(
                "negative points for {}: {}",
                entry.user_id, entry.points
            )));
        }
        if entry.rank <= prev_rank {
            return Err(AppError::Render(format!(
                "rank order broken at {} (rank {} after {})",
                entry.user_id, entry.rank, prev_rank
            )));
        }
        prev_rank = entry.rank;
    }
    Ok(())
}

fn entry_line(entry: &LeaderboardEntry) -> String {
    let badge = match entry.rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        r => format!("{}.", r),
    };

    let breakdown = activity_breakdown(&entry.activity_counts);
    if breakdown.is_empty() {
        format!("{} {} · {} pts", badge, entry.display_name, entry.points)
    } else {
        format!(
            "{} {} · {} pts ({})",
            badge, entry.display_name, entry.points, breakdown
        )
    }
}

/// "2x call, 1x demo" with zero-count types omitted; types sorted for
/// stable output.
fn activity_breakdown(counts: &std::collections::HashMap<String, u32>) -> String {
    let mut typed: Vec<(&String, &u32)> = counts.iter().filter(|(_, c)| **c > 0).collect();
    typed.sort_by(|a, b| a.0.cmp(b.0));
    typed
        .into_iter()
        .map(|(activity_type, count)| format!("{}x {}", count, activity_type))
        .collect::<Vec<_>>()
        .join(", ")
}

fn more_line(hidden: usize) -> String {
    format!("… +{} more", hidden)
}
