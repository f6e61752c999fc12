// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::api_client::ApiError;
use crate::services::profiles::ProfileError;
use crate::services::supabase_auth::AuthError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Supabase error: {0}")]
    Supabase(String),

    #[error("Project API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("Profile store error: {0}")]
    ProfileStore(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut upstream = None;
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Supabase(msg) => {
                tracing::warn!(error = %msg, "Supabase request failed");
                (StatusCode::BAD_GATEWAY, "supabase_error", Some(msg.clone()))
            }
            AppError::Api {
                status,
                message,
                data,
            } => {
                upstream = data.clone();
                if *status == 401 {
                    (StatusCode::UNAUTHORIZED, "unauthorized", Some(message.clone()))
                } else {
                    tracing::warn!(status, error = %message, "Project API request failed");
                    (StatusCode::BAD_GATEWAY, "api_error", Some(message.clone()))
                }
            }
            AppError::ProfileStore(msg) => {
                tracing::error!(error = %msg, "Profile store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "profile_store_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            upstream,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials(_) | AuthError::InvalidToken => AppError::InvalidToken,
            AuthError::Rejected { status, message } if status == 400 || status == 422 => {
                AppError::BadRequest(message)
            }
            other => AppError::Supabase(other.to_string()),
        }
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Unauthorized => AppError::InvalidToken,
            other => AppError::ProfileStore(other.to_string()),
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthenticated => AppError::Unauthorized,
            ApiError::Status { status, data } => {
                let message = data
                    .as_ref()
                    .and_then(|d| d.get("detail"))
                    .and_then(|d| d.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status));
                AppError::Api {
                    status,
                    message,
                    data,
                }
            }
            ApiError::Transport(msg) | ApiError::Decode(msg) => AppError::Api {
                status: 502,
                message: msg,
                data: None,
            },
        }
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
