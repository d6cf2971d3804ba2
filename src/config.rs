//! Application configuration loaded from environment variables.
//!
//! The chat webhook URL is a secret; in production it is injected as an
//! environment variable via a Cloud Run secret binding and cached in
//! memory for the life of the process.

use std::env;

use crate::services::dispatch::DispatchConfig;

/// Queue name expected on scheduler-invoked trigger requests.
pub const DISPATCH_QUEUE_NAME: &str = "leaderboard-dispatch";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Point total in a single submission that triggers a milestone message
    pub milestone_points: i64,
    /// Number of entries shown on dispatched leaderboards
    pub leaderboard_top_n: usize,
    /// Retry/timeout budget for webhook dispatch
    pub dispatch: DispatchConfig,

    // --- Secrets (injected as env vars in production) ---
    /// Incoming-webhook URL of the team chat channel
    pub chat_webhook_url: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            milestone_points: 100,
            leaderboard_top_n: 10,
            dispatch: DispatchConfig::default(),
            chat_webhook_url: "http://localhost:9999/webhook".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            milestone_points: parse_env_or("MILESTONE_POINTS", 100),
            leaderboard_top_n: parse_env_or("LEADERBOARD_TOP_N", 10),
            dispatch: DispatchConfig {
                max_retries: parse_env_or("DISPATCH_MAX_RETRIES", 3),
                base_delay_ms: parse_env_or("DISPATCH_BASE_DELAY_MS", 500),
                attempt_timeout_secs: parse_env_or("DISPATCH_ATTEMPT_TIMEOUT_SECS", 10),
                overall_deadline_secs: parse_env_or("DISPATCH_DEADLINE_SECS", 60),
            },
            chat_webhook_url: env::var("CHAT_WEBHOOK_URL")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CHAT_WEBHOOK_URL"))?,
        })
    }
}

/// Parse an env var, falling back to a default on absence or parse failure.
fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
