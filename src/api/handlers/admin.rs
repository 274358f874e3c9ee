//! Administrative handlers: adjustments, audits, periodic resets.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AdjustRequest, AdjustResponse, AuditResponse, FreezeTokenRequest, FreezeTokenResponse,
};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{EngineError, ErrorResponse};

/// `POST /admin/points/adjust` — Apply a signed point adjustment.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    post,
    path = "/api/v1/admin/points/adjust",
    tag = "Admin",
    summary = "Adjust a user's points",
    description = "Appends a signed administrative ledger entry. Negative amounts are recorded as penalties.",
    request_body = AdjustRequest,
    responses(
        (status = 200, description = "Adjustment recorded", body = AdjustResponse),
    )
)]
pub async fn adjust_points(
    State(state): State<AppState>,
    Json(req): Json<AdjustRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let balance = state
        .gamification
        .admin_adjust(UserId::from_uuid(req.user_id), req.amount, &req.description)
        .await?;
    Ok(Json(AdjustResponse {
        user_id: req.user_id,
        balance,
    }))
}

/// `POST /admin/freeze-tokens` — Grant streak freeze tokens.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    post,
    path = "/api/v1/admin/freeze-tokens",
    tag = "Admin",
    summary = "Grant streak freeze tokens",
    request_body = FreezeTokenRequest,
    responses(
        (status = 200, description = "Tokens granted", body = FreezeTokenResponse),
    )
)]
pub async fn grant_freeze_tokens(
    State(state): State<AppState>,
    Json(req): Json<FreezeTokenRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let tokens = state
        .gamification
        .grant_freeze_tokens(UserId::from_uuid(req.user_id), req.count)
        .await;
    Ok(Json(FreezeTokenResponse {
        user_id: req.user_id,
        tokens,
    }))
}

/// `GET /admin/audit/{user_id}` — Verify the balance invariant.
///
/// # Errors
///
/// Returns [`EngineError::InvariantViolation`] when the cached balance has
/// diverged from the ledger sum.
#[utoipa::path(
    get,
    path = "/api/v1/admin/audit/{user_id}",
    tag = "Admin",
    summary = "Audit a user's balance",
    description = "Replays the ledger and compares the sum against the cached profile balance. Divergence is a 500 — it must never happen.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Balance is consistent", body = AuditResponse),
        (status = 500, description = "Invariant violation", body = ErrorResponse),
    )
)]
pub async fn audit_user(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let balance = state
        .gamification
        .audit(UserId::from_uuid(user_id))
        .await?;
    Ok(Json(AuditResponse {
        user_id,
        balance,
        consistent: true,
    }))
}

/// `POST /admin/leaderboard/periodic/reset` — Clear the periodic scope.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    post,
    path = "/api/v1/admin/leaderboard/periodic/reset",
    tag = "Admin",
    summary = "Reset the periodic leaderboard",
    responses(
        (status = 200, description = "Number of removed entries", body = serde_json::Value),
    )
)]
pub async fn reset_periodic(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, EngineError> {
    let removed = state.gamification.reset_periodic_leaderboard().await;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

/// Admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/points/adjust", post(adjust_points))
        .route("/admin/freeze-tokens", post(grant_freeze_tokens))
        .route("/admin/audit/{user_id}", get(audit_user))
        .route("/admin/leaderboard/periodic/reset", post(reset_periodic))
}
