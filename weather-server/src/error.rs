//! API error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use weather_core::{UpstreamError, chat};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    /// A required upstream credential is not configured.
    #[error("Server misconfigured: {0}")]
    Misconfigured(String),

    /// The chat provider answered with a failure status.
    #[error("AI provider error ({status}): {detail}")]
    ChatProvider { status: u16, detail: String },

    #[error("{message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    /// Generic server error without details.
    pub fn server_error() -> Self {
        Self::Internal {
            message: "Server error".to_string(),
            detail: None,
        }
    }

    /// Server error that carries the upstream failure for the caller.
    pub fn with_detail(message: &str, err: &UpstreamError) -> Self {
        Self::Internal {
            message: message.to_string(),
            detail: Some(err.to_string()),
        }
    }

    /// Chat provider failures surface their status; anything else is a server error.
    pub fn from_chat(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status {
                service,
                status,
                body,
            } if service == chat::SERVICE => Self::ChatProvider {
                status,
                detail: body,
            },
            _ => Self::server_error(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Upstream status, for provider errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error, upstream_status, detail) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None, None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None, None),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests, please try again later".to_string(),
                None,
                None,
            ),
            Self::Misconfigured(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "misconfigured",
                format!("Server misconfigured: {msg}"),
                None,
                None,
            ),
            Self::ChatProvider { status, detail } => (
                StatusCode::BAD_GATEWAY,
                "ai_provider_error",
                "AI provider error".to_string(),
                Some(status),
                Some(detail),
            ),
            Self::Internal { message, detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                None,
                detail,
            ),
        };

        let body = ErrorResponse {
            error,
            code: code.to_string(),
            status: upstream_status,
            detail,
        };

        (status, Json(body)).into_response()
    }
}
