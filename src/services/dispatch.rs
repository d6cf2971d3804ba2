// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chat webhook dispatch client.
//!
//! Handles:
//! - Delivery of rendered payloads to the channel webhook
//! - Transient/permanent failure classification (network, 5xx, 429 retry;
//!   other 4xx fail immediately)
//! - Bounded exponential backoff with jitter under an overall deadline
//!
//! Every attempt walks an observable state machine:
//! `Pending -> (Sent | Retrying | Failed)`. Exhausted retries surface to
//! the caller; nothing is silently swallowed.

use crate::error::AppError;
use crate::services::render::ChatPayload;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Header carrying the caller's dedup token for one logical notification.
/// The client itself does not deduplicate repeated sends.
pub const DEDUP_TOKEN_HEADER: &str = "x-salesboard-dedup-token";

/// Retry/timeout budget for webhook dispatch.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff (doubles each retry)
    pub base_delay_ms: u64,
    /// Timeout per attempt
    pub attempt_timeout_secs: u64,
    /// Deadline for the whole send, including backoff sleeps
    pub overall_deadline_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            attempt_timeout_secs: 10,
            overall_deadline_secs: 60,
        }
    }
}

impl DispatchConfig {
    fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    fn overall_deadline(&self) -> Duration {
        Duration::from_secs(self.overall_deadline_secs)
    }

    /// Backoff delay before retry N (0-based): exponential, capped at
    /// 64x base, with uniform jitter of up to half the base delay.
    fn retry_delay(&self, retry: u32) -> Duration {
        let exp_ms = self.base_delay_ms * (1 << retry.min(6));
        let jitter_ms = rand::rng().random_range(0..=self.base_delay_ms / 2);
        Duration::from_millis(exp_ms + jitter_ms)
    }
}

/// Per-send delivery state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchState {
    Pending,
    Retrying { attempt: u32 },
    Sent { message_id: String },
    Failed,
}

/// Successful delivery receipt.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    /// Message identifier returned by the channel
    pub message_id: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// Attempt-level failure classification.
enum AttemptError {
    Transient(String),
    Permanent(String),
}

/// Message identifier shape returned by the channel webhook.
#[derive(Debug, Deserialize)]
struct ChannelMessageResponse {
    #[serde(rename = "messageId", alias = "id")]
    message_id: Option<String>,
}

/// Chat webhook client.
#[derive(Clone)]
pub struct DispatchClient {
    http: reqwest::Client,
    webhook_url: String,
    config: DispatchConfig,
}

impl DispatchClient {
    pub fn new(webhook_url: String, config: DispatchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
            config,
        }
    }

    /// Deliver a payload to the channel webhook.
    ///
    /// Retries transient failures within the configured budget; permanent
    /// failures surface immediately. At-least-once: the caller's dedup
    /// token travels with every attempt so the channel (or an operator
    /// re-trigger) can recognize repeats of the same logical notification.
    pub async fn send(
        &self,
        payload: &ChatPayload,
        dedup_token: &str,
    ) -> Result<DispatchReceipt, AppError> {
        let deadline = tokio::time::Instant::now() + self.config.overall_deadline();
        let mut state = DispatchState::Pending;
        let mut attempts = 0u32;
        let last_error;

        loop {
            attempts += 1;
            tracing::debug!(dedup_token, attempts, state = ?state, "Dispatch attempt");

            match self.attempt(payload, dedup_token).await {
                Ok(message_id) => {
                    state = DispatchState::Sent {
                        message_id: message_id.clone(),
                    };
                    tracing::info!(dedup_token, attempts, state = ?state, "Dispatch succeeded");
                    return Ok(DispatchReceipt {
                        message_id,
                        attempts,
                    });
                }
                Err(AttemptError::Permanent(msg)) => {
                    state = DispatchState::Failed;
                    tracing::error!(dedup_token, attempts, state = ?state, error = %msg,
                        "Dispatch rejected by channel");
                    return Err(AppError::DispatchPermanent(msg));
                }
                Err(AttemptError::Transient(msg)) => {
                    if attempts > self.config.max_retries {
                        last_error = msg;
                        break;
                    }
                    let delay = self.config.retry_delay(attempts - 1);
                    if tokio::time::Instant::now() + delay >= deadline {
                        tracing::warn!(dedup_token, attempts, "Dispatch deadline reached");
                        last_error = msg;
                        break;
                    }
                    state = DispatchState::Retrying { attempt: attempts };
                    tracing::warn!(dedup_token, attempts, state = ?state,
                        delay_ms = delay.as_millis() as u64, error = %msg,
                        "Transient dispatch failure, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        state = DispatchState::Failed;
        tracing::error!(dedup_token, attempts, state = ?state, error = %last_error,
            "Dispatch failed, retries exhausted");
        Err(AppError::DispatchTransient(format!(
            "{} attempts: {}",
            attempts, last_error
        )))
    }

    /// One delivery attempt with its own timeout.
    async fn attempt(
        &self,
        payload: &ChatPayload,
        dedup_token: &str,
    ) -> Result<String, AttemptError> {
        let response = self
            .http
            .post(&self.webhook_url)
            .header(DEDUP_TOKEN_HEADER, dedup_token)
            .timeout(self.config.attempt_timeout())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                // Connect failures, timeouts and other transport errors
                // are all worth a retry
                AttemptError::Transient(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            // Channels without a JSON body get a deterministic local id
            let message_id = response
                .json::<ChannelMessageResponse>()
                .await
                .ok()
                .and_then(|r| r.message_id)
                .unwrap_or_else(|| format!("local:{}", dedup_token));
            return Ok(message_id);
        }

        let body = response.text().await.unwrap_or_default();

        // Rate limit and server errors are retryable
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(AttemptError::Transient(format!("HTTP {}", status)));
        }

        Err(AttemptError::Permanent(format!("HTTP {}: {}", status, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let config = DispatchConfig {
            base_delay_ms: 100,
            ..Default::default()
        };

        let d0 = config.retry_delay(0).as_millis() as u64;
        let d3 = config.retry_delay(3).as_millis() as u64;
        let d20 = config.retry_delay(20).as_millis() as u64;

        // Exponential component: 100, 800, then capped at 6400, each plus
        // up to 50ms of jitter
        assert!((100..=150).contains(&d0));
        assert!((800..=850).contains(&d3));
        assert!((6400..=6450).contains(&d20));
    }

    #[test]
    fn test_channel_response_id_aliases() {
        let with_message_id: ChannelMessageResponse =
            serde_json::from_str(r#"{"messageId": "m-1"}"#).unwrap();
        assert_eq!(with_message_id.message_id.as_deref(), Some("m-1"));

        let with_id: ChannelMessageResponse = serde_json::from_str(r#"{"id": "m-2"}"#).unwrap();
        assert_eq!(with_id.message_id.as_deref(), Some("m-2"));
    }
}
