//! Quiz submission and attempt history handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{AttemptDto, ScoreResultResponse, SubmitQuizRequest};
use crate::app_state::AppState;
use crate::domain::{QuizId, UserId};
use crate::error::{EngineError, ErrorResponse};

/// `POST /quizzes/{id}/submit` — Score a quiz submission.
///
/// # Errors
///
/// Returns [`EngineError`] on unknown quiz, missing enrollment, or an
/// active cooldown.
#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{id}/submit",
    tag = "Quizzes",
    summary = "Submit a quiz attempt",
    description = "Scores the submitted answers, records the attempt, and drives streaks, points, badges, leaderboards, and course progress. A failed attempt starts a 30-minute cooldown.",
    params(
        ("id" = uuid::Uuid, Path, description = "Quiz UUID"),
    ),
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "Scored result", body = ScoreResultResponse),
        (status = 403, description = "Not enrolled in the quiz's course", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 429, description = "Cooldown active; details carry the retry time", body = ErrorResponse),
    )
)]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let result = state
        .quiz
        .submit(
            QuizId::from_uuid(id),
            UserId::from_uuid(req.user_id),
            &req.answers,
        )
        .await?;
    Ok(Json(ScoreResultResponse::from(result)))
}

/// `GET /quizzes/attempts/{user_id}` — Attempt history.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    get,
    path = "/api/v1/quizzes/attempts/{user_id}",
    tag = "Quizzes",
    summary = "List a user's quiz attempts",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Attempts, newest first", body = Vec<AttemptDto>),
    )
)]
pub async fn list_attempts(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let attempts = state.quiz.attempts_for(UserId::from_uuid(user_id)).await;
    let dtos: Vec<AttemptDto> = attempts.iter().map(AttemptDto::from).collect();
    Ok(Json(dtos))
}

/// Quiz routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quizzes/{id}/submit", post(submit_quiz))
        .route("/quizzes/attempts/{user_id}", get(list_attempts))
}
