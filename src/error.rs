// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unknown activity type: {0}")]
    UnknownActivityType(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Dispatch failed (transient, retries exhausted): {0}")]
    DispatchTransient(String),

    #[error("Dispatch rejected by channel: {0}")]
    DispatchPermanent(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::UnknownActivityType(msg) => (
                StatusCode::BAD_REQUEST,
                "unknown_activity_type",
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Render(msg) => {
                tracing::error!(error = %msg, "Render error");
                (StatusCode::INTERNAL_SERVER_ERROR, "render_error", None)
            }
            AppError::DispatchTransient(msg) => {
                tracing::error!(error = %msg, "Dispatch failed after retries");
                (StatusCode::BAD_GATEWAY, "dispatch_transient", None)
            }
            AppError::DispatchPermanent(msg) => {
                tracing::error!(error = %msg, "Dispatch rejected by channel");
                (StatusCode::BAD_GATEWAY, "dispatch_permanent", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
