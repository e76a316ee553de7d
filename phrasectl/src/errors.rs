use crate::transformer::ToolFailure;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

/// Message returned to clients for every transformer failure. Kept verbatim for
/// compatibility with existing front-ends.
pub const EXTERNAL_TOOL_FAILURE_MESSAGE: &str = "C++ program error";

#[derive(ThisError, Debug)]
pub enum Error {
    /// The transformer failed to launch, reported an error, timed out, or produced no output
    #[error("Transformer failed: {0}")]
    ExternalToolFailure(#[from] ToolFailure),

    /// Too many transformer invocations in flight
    #[error("{message}")]
    TooManyRequests { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::ExternalToolFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::ExternalToolFailure(_) => EXTERNAL_TOOL_FAILURE_MESSAGE.to_string(),
            Error::TooManyRequests { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::ExternalToolFailure(failure) => {
                tracing::error!(kind = failure.kind(), "Transformer error: {:#}", self);
            }
            Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::TooManyRequests { .. } => {
                tracing::warn!("Rejected by transform limiter: {}", self);
            }
        }

        // The browser front-end reads every error as `{"error": ...}`
        (self.status_code(), Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
