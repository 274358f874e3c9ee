//! Profile, login, points, and badge handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    BadgeCheckResponse, BadgeDto, LoginRequest, LoginResponse, PaginationMeta, PaginationParams,
    PointsHistoryResponse, ProfileResponse, SpendRequest, SpendResponse, TransactionDto,
};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{EngineError, ErrorResponse};

/// `POST /gamification/login` — Record a daily login.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    post,
    path = "/api/v1/gamification/login",
    tag = "Gamification",
    summary = "Record a daily login",
    description = "Runs the daily-login streak transition. Same-day repeats are no-ops; every counted login awards the daily bonus and, every seventh consecutive day, a milestone bonus.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login processed", body = LoginResponse),
    )
)]
pub async fn record_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let user_id = UserId::from_uuid(req.user_id);
    let summary = state.gamification.handle_daily_login(user_id).await?;
    Ok(Json(LoginResponse::from_summary(req.user_id, &summary)))
}

/// `GET /gamification/profile/{user_id}` — Fetch a gamification profile.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    get,
    path = "/api/v1/gamification/profile/{user_id}",
    tag = "Gamification",
    summary = "Get a gamification profile",
    description = "Returns the user's balance, streaks, and freeze tokens. Profiles are created lazily, so unknown users return a zeroed profile.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let profile = state
        .gamification
        .profile_snapshot(UserId::from_uuid(user_id))
        .await;
    Ok(Json(ProfileResponse::from(profile)))
}

/// `GET /gamification/badges/{user_id}` — List earned badges.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    get,
    path = "/api/v1/gamification/badges/{user_id}",
    tag = "Gamification",
    summary = "List earned badges",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Earned badges, earliest first", body = Vec<BadgeDto>),
    )
)]
pub async fn list_badges(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let owned = state
        .gamification
        .badges_of(UserId::from_uuid(user_id))
        .await;
    let badges: Vec<BadgeDto> = owned
        .iter()
        .map(|(user_badge, badge)| BadgeDto::from_parts(user_badge, badge))
        .collect();
    Ok(Json(badges))
}

/// `POST /gamification/badges/{user_id}/check` — Re-run badge eligibility.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    post,
    path = "/api/v1/gamification/badges/{user_id}/check",
    tag = "Gamification",
    summary = "Re-run badge eligibility",
    description = "Evaluates every active badge against fresh statistics. Checking twice with no state change awards nothing the second time.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Newly awarded badges", body = BadgeCheckResponse),
    )
)]
pub async fn check_badges(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let newly = state
        .gamification
        .check_badge_eligibility(UserId::from_uuid(user_id))
        .await?;
    Ok(Json(BadgeCheckResponse {
        newly_awarded: newly.into_iter().map(|b| b.name).collect(),
    }))
}

/// `GET /gamification/points/{user_id}/history` — Paginated ledger history.
///
/// # Errors
///
/// Returns [`EngineError`] on engine failures.
#[utoipa::path(
    get,
    path = "/api/v1/gamification/points/{user_id}/history",
    tag = "Gamification",
    summary = "Points history",
    description = "Returns the user's ledger entries, newest first.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated transaction list", body = PointsHistoryResponse),
    )
)]
pub async fn points_history(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, EngineError> {
    let params = params.clamped();
    let history = state
        .gamification
        .points_history(UserId::from_uuid(user_id))
        .await;

    let total = u32::try_from(history.len()).unwrap_or(u32::MAX);
    let per_page = params.per_page;
    let page = params.page;
    let total_pages = if total == 0 {
        0
    } else {
        total.div_ceil(per_page)
    };

    let start = ((page - 1) * per_page) as usize;
    let data: Vec<TransactionDto> = history
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .map(TransactionDto::from)
        .collect();

    Ok(Json(PointsHistoryResponse {
        data,
        pagination: PaginationMeta {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

/// `POST /gamification/points/spend` — Spend points from the balance.
///
/// # Errors
///
/// Returns [`EngineError::InsufficientBalance`] when the balance cannot
/// cover the spend.
#[utoipa::path(
    post,
    path = "/api/v1/gamification/points/spend",
    tag = "Gamification",
    summary = "Spend points",
    description = "Appends a negative ledger entry and decrements the balance. Fails without side effects when the balance is insufficient.",
    request_body = SpendRequest,
    responses(
        (status = 200, description = "Spend recorded", body = SpendResponse),
        (status = 422, description = "Insufficient balance", body = ErrorResponse),
    )
)]
pub async fn spend_points(
    State(state): State<AppState>,
    Json(req): Json<SpendRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let user_id = UserId::from_uuid(req.user_id);
    let success = state
        .gamification
        .spend_points(user_id, req.points, &req.description)
        .await?;
    let balance = state.gamification.profile_snapshot(user_id).await.total_points;
    if !success {
        return Err(EngineError::InsufficientBalance {
            required: i64::from(req.points),
            available: balance,
        });
    }
    Ok(Json(SpendResponse {
        success: true,
        balance,
    }))
}

/// Gamification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/gamification/login", post(record_login))
        .route("/gamification/profile/{user_id}", get(get_profile))
        .route("/gamification/badges/{user_id}", get(list_badges))
        .route("/gamification/badges/{user_id}/check", post(check_badges))
        .route(
            "/gamification/points/{user_id}/history",
            get(points_history),
        )
        .route("/gamification/points/spend", post(spend_points))
}
