//! Leaderboard read handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{LeaderboardEntryDto, LeaderboardResponse, LimitParams};
use crate::app_state::AppState;
use crate::domain::CourseId;
use crate::error::EngineError;

/// `GET /leaderboard/global` — Top of the global leaderboard.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard/global",
    tag = "Leaderboards",
    summary = "Global leaderboard",
    description = "Returns the top entries of the global scope. Ranks are dense (1..N) and recomputed in full after every balance change.",
    params(LimitParams),
    responses(
        (status = 200, description = "Ranked entries", body = LeaderboardResponse),
    )
)]
pub async fn global_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, EngineError> {
    let entries = state
        .gamification
        .global_leaderboard(params.clamped())
        .await;
    Ok(Json(LeaderboardResponse {
        scope: "global".to_string(),
        course_id: None,
        entries: entries.iter().map(LeaderboardEntryDto::from).collect(),
    }))
}

/// `GET /leaderboard/course/{id}` — Top of a course leaderboard.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard/course/{id}",
    tag = "Leaderboards",
    summary = "Course leaderboard",
    params(
        ("id" = uuid::Uuid, Path, description = "Course UUID"),
        LimitParams,
    ),
    responses(
        (status = 200, description = "Ranked entries", body = LeaderboardResponse),
    )
)]
pub async fn course_leaderboard(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, EngineError> {
    let entries = state
        .gamification
        .course_leaderboard(CourseId::from_uuid(id), params.clamped())
        .await;
    Ok(Json(LeaderboardResponse {
        scope: "course".to_string(),
        course_id: Some(id),
        entries: entries.iter().map(LeaderboardEntryDto::from).collect(),
    }))
}

/// Leaderboard routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leaderboard/global", get(global_leaderboard))
        .route("/leaderboard/course/{id}", get(course_leaderboard))
}
