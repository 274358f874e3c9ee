//! Engine error types with HTTP status code mapping.
//!
//! [`EngineError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{CourseId, QuizId, UserId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "quiz not found: ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details. Carries the retry timestamp for
    /// cooldown rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | Not Found       | 404 Not Found              |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
/// | 4000–4999 | Domain          | 403 / 422 / 429            |
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Quiz with the given ID was not found in the catalog.
    #[error("quiz not found: {0}")]
    QuizNotFound(QuizId),

    /// Course with the given ID was not found in the catalog.
    #[error("course not found: {0}")]
    CourseNotFound(CourseId),

    /// The user is not enrolled in the course the operation targets.
    #[error("user {user_id} is not enrolled in course {course_id}")]
    NotEnrolled {
        /// The submitting user.
        user_id: UserId,
        /// The course that gated the operation.
        course_id: CourseId,
    },

    /// A quiz was re-submitted during the post-failure cooldown window.
    #[error("retry not allowed before {retry_at}")]
    CooldownActive {
        /// When the next attempt becomes allowed.
        retry_at: DateTime<Utc>,
    },

    /// A spend exceeded the available balance.
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance {
        /// Points the operation needed.
        required: i64,
        /// Points actually available.
        available: i64,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A badge catalog entry carried an unknown or malformed condition.
    #[error("invalid badge condition: {0}")]
    InvalidCondition(String),

    /// A profile balance diverged from the ledger sum. Must never occur.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidCondition(_) => 1002,
            Self::QuizNotFound(_) => 2001,
            Self::CourseNotFound(_) => 2002,
            Self::NotEnrolled { .. } => 4001,
            Self::InsufficientBalance { .. } => 4002,
            Self::CooldownActive { .. } => 4003,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::InvariantViolation(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCondition(_) => StatusCode::BAD_REQUEST,
            Self::QuizNotFound(_) | Self::CourseNotFound(_) => StatusCode::NOT_FOUND,
            Self::NotEnrolled { .. } => StatusCode::FORBIDDEN,
            Self::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) | Self::PersistenceError(_) | Self::InvariantViolation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            Self::CooldownActive { retry_at } => Some(retry_at.to_rfc3339()),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
