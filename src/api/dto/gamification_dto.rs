//! Profile, points, badge, and admin DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common_dto::PaginationMeta;
use crate::domain::{Badge, GamificationProfile, PointsTransaction, UserBadge};
use crate::service::LoginSummary;

/// Response body for `GET /gamification/profile/{user_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    /// Profile owner.
    pub user_id: Uuid,
    /// Current point balance.
    pub total_points: i64,
    /// Current consecutive-day login streak.
    pub current_login_streak: u32,
    /// Longest login streak ever reached.
    pub longest_login_streak: u32,
    /// Date of the last counted login.
    pub last_login_date: Option<NaiveDate>,
    /// Courses completed in a row.
    pub current_course_streak: u32,
    /// Consecutive quiz passes.
    pub current_quiz_streak: u32,
    /// Remaining streak freeze tokens.
    pub streak_freeze_tokens: u32,
    /// Last profile mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<GamificationProfile> for ProfileResponse {
    fn from(profile: GamificationProfile) -> Self {
        Self {
            user_id: *profile.user_id.as_uuid(),
            total_points: profile.total_points,
            current_login_streak: profile.current_login_streak,
            longest_login_streak: profile.longest_login_streak,
            last_login_date: profile.last_login_date,
            current_course_streak: profile.current_course_streak,
            current_quiz_streak: profile.current_quiz_streak,
            streak_freeze_tokens: profile.streak_freeze_tokens,
            updated_at: profile.updated_at,
        }
    }
}

/// Request body for `POST /gamification/login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// The logging-in user.
    pub user_id: Uuid,
}

/// Response body for `POST /gamification/login`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// The logging-in user.
    pub user_id: Uuid,
    /// `true` when the login was a same-day no-op.
    pub already_logged_today: bool,
    /// Login streak after the call.
    pub streak: u32,
    /// Longest streak ever reached.
    pub longest_streak: u32,
    /// Whether a freeze token was consumed.
    pub froze: bool,
    /// Points credited by this call.
    pub points_awarded: i64,
}

impl LoginResponse {
    /// Builds the response from a service summary.
    #[must_use]
    pub fn from_summary(user_id: Uuid, summary: &LoginSummary) -> Self {
        Self {
            user_id,
            already_logged_today: summary.already_logged_today,
            streak: summary.streak,
            longest_streak: summary.longest_streak,
            froze: summary.froze,
            points_awarded: summary.points_awarded,
        }
    }
}

/// One ledger entry in a points history response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionDto {
    /// Transaction identifier.
    pub id: Uuid,
    /// Signed point amount.
    pub amount: i64,
    /// Entry classification (`earned`, `spent`, `bonus`, `penalty`).
    pub kind: String,
    /// Trigger source (`quiz_pass`, `daily_login`, ...).
    pub source: String,
    /// Identifier of the triggering entity, if any.
    pub source_ref: Option<Uuid>,
    /// Multiplier applied to the base amount.
    pub multiplier: f64,
    /// Human-readable description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<PointsTransaction> for TransactionDto {
    fn from(tx: PointsTransaction) -> Self {
        let kind = serde_json::to_value(tx.kind)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        Self {
            id: tx.id,
            amount: tx.amount,
            kind,
            source: tx.source.as_str().to_string(),
            source_ref: tx.source_ref,
            multiplier: tx.multiplier,
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

/// Paginated response body for `GET /gamification/points/{user_id}/history`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PointsHistoryResponse {
    /// Ledger entries, newest first.
    pub data: Vec<TransactionDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `POST /gamification/points/spend`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SpendRequest {
    /// The spending user.
    pub user_id: Uuid,
    /// Points to spend.
    pub points: u32,
    /// Purchase description for the ledger.
    pub description: String,
}

/// Response body for a successful spend.
#[derive(Debug, Serialize, ToSchema)]
pub struct SpendResponse {
    /// Whether the spend went through.
    pub success: bool,
    /// Balance after the spend.
    pub balance: i64,
}

/// One earned badge in a badge list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeDto {
    /// Badge identifier.
    pub badge_id: Uuid,
    /// Badge display name.
    pub name: String,
    /// Badge display description.
    pub description: String,
    /// Condition kind that awarded it.
    pub condition: String,
    /// When the user earned it.
    pub earned_at: DateTime<Utc>,
}

impl BadgeDto {
    /// Joins an ownership row with its catalog entry.
    #[must_use]
    pub fn from_parts(user_badge: &UserBadge, badge: &Badge) -> Self {
        Self {
            badge_id: *user_badge.badge_id.as_uuid(),
            name: badge.name.clone(),
            description: badge.description.clone(),
            condition: badge.condition.kind_str().to_string(),
            earned_at: user_badge.earned_at,
        }
    }
}

/// Response body for `POST /gamification/badges/{user_id}/check`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeCheckResponse {
    /// Names of newly awarded badges, in award order.
    pub newly_awarded: Vec<String>,
}

/// Request body for `POST /admin/points/adjust`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustRequest {
    /// The adjusted user.
    pub user_id: Uuid,
    /// Signed point amount; negative values are recorded as penalties.
    pub amount: i64,
    /// Ledger description.
    pub description: String,
}

/// Response body for `POST /admin/points/adjust`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdjustResponse {
    /// The adjusted user.
    pub user_id: Uuid,
    /// Balance after the adjustment.
    pub balance: i64,
}

/// Request body for `POST /admin/freeze-tokens`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FreezeTokenRequest {
    /// The receiving user.
    pub user_id: Uuid,
    /// Tokens to grant.
    pub count: u32,
}

/// Response body for `POST /admin/freeze-tokens`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FreezeTokenResponse {
    /// The receiving user.
    pub user_id: Uuid,
    /// Token count after the grant.
    pub tokens: u32,
}

/// Response body for `GET /admin/audit/{user_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditResponse {
    /// The audited user.
    pub user_id: Uuid,
    /// Balance confirmed against the ledger sum.
    pub balance: i64,
    /// Always `true` on a 200 response; divergence is a 500.
    pub consistent: bool,
}
