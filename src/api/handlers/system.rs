//! System endpoints: health check and the badge-condition catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Badge condition kind info.
#[derive(Debug, Serialize, ToSchema)]
struct ConditionInfo {
    kind: &'static str,
    description: &'static str,
    statistic: &'static str,
}

/// `GET /config/badge-conditions` — List supported badge condition kinds.
#[utoipa::path(
    get,
    path = "/config/badge-conditions",
    tag = "System",
    summary = "List badge condition kinds",
    description = "Returns metadata for every condition kind the badge engine can evaluate. Thresholds are compared inclusively.",
    responses(
        (status = 200, description = "Condition kind catalog", body = Vec<ConditionInfo>),
    )
)]
pub async fn badge_conditions_handler() -> impl IntoResponse {
    let kinds = vec![
        ConditionInfo {
            kind: "course_complete",
            description: "Courses completed",
            statistic: "count of completed courses",
        },
        ConditionInfo {
            kind: "quiz_pass",
            description: "Distinct quizzes passed",
            statistic: "distinct quizzes with a passing attempt",
        },
        ConditionInfo {
            kind: "quiz_perfect",
            description: "Perfect quiz attempts",
            statistic: "attempts scored at 100%",
        },
        ConditionInfo {
            kind: "login_streak",
            description: "Consecutive login days",
            statistic: "current login streak",
        },
        ConditionInfo {
            kind: "quiz_streak",
            description: "Consecutive quiz passes",
            statistic: "current quiz streak",
        },
        ConditionInfo {
            kind: "points_earned",
            description: "Point balance",
            statistic: "total point balance",
        },
    ];
    (StatusCode::OK, Json(kinds))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/badge-conditions", get(badge_conditions_handler))
}
