//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints are mounted under `/api/v1`, with system endpoints at the
//! root. With the `swagger-ui` feature enabled, interactive documentation
//! is served at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the gateway.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::gamification::record_login,
        handlers::gamification::get_profile,
        handlers::gamification::list_badges,
        handlers::gamification::check_badges,
        handlers::gamification::points_history,
        handlers::gamification::spend_points,
        handlers::quiz::submit_quiz,
        handlers::quiz::list_attempts,
        handlers::leaderboard::global_leaderboard,
        handlers::leaderboard::course_leaderboard,
        handlers::admin::adjust_points,
        handlers::admin::grant_freeze_tokens,
        handlers::admin::audit_user,
        handlers::admin::reset_periodic,
        handlers::system::health_handler,
        handlers::system::badge_conditions_handler,
    ),
    components(schemas(
        dto::ProfileResponse,
        dto::LoginRequest,
        dto::LoginResponse,
        dto::TransactionDto,
        dto::PointsHistoryResponse,
        dto::SpendRequest,
        dto::SpendResponse,
        dto::BadgeDto,
        dto::BadgeCheckResponse,
        dto::AdjustRequest,
        dto::AdjustResponse,
        dto::FreezeTokenRequest,
        dto::FreezeTokenResponse,
        dto::AuditResponse,
        dto::SubmitQuizRequest,
        dto::ScoreResultResponse,
        dto::QuestionResultDto,
        dto::AttemptDto,
        dto::LeaderboardEntryDto,
        dto::LeaderboardResponse,
    )),
    tags(
        (name = "Gamification", description = "Profiles, points, streaks, badges"),
        (name = "Quizzes", description = "Quiz submission and attempts"),
        (name = "Leaderboards", description = "Global and per-course rankings"),
        (name = "Admin", description = "Adjustments, audits, resets"),
        (name = "System", description = "Health and configuration"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
