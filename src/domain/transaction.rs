//! Points transactions: immutable, signed ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Classification of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Points earned from a scored action (quiz pass, course, login).
    Earned,
    /// Points spent in the rewards store. Always a negative amount.
    Spent,
    /// Extra points from streak milestones and badge awards.
    Bonus,
    /// Administrative deduction. Always a negative amount.
    Penalty,
}

/// What triggered a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsSource {
    /// Completing every quiz of a course.
    CourseComplete,
    /// Passing a single quiz.
    QuizPass,
    /// Login streak milestone (every 7 consecutive days).
    LoginStreak,
    /// The fixed once-per-day login bonus.
    DailyLogin,
    /// Bonus granted on earning a badge.
    BadgeEarned,
    /// Spending points in the rewards store.
    Purchase,
    /// Manual adjustment by an administrator.
    AdminAdjustment,
}

impl PointsSource {
    /// Returns the source as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CourseComplete => "course_complete",
            Self::QuizPass => "quiz_pass",
            Self::LoginStreak => "login_streak",
            Self::DailyLogin => "daily_login",
            Self::BadgeEarned => "badge_earned",
            Self::Purchase => "purchase",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }
}

/// A single, immutable ledger entry.
///
/// The amount is signed: earnings and bonuses are positive, spends and
/// penalties are negative. A user's balance is by definition the sum of all
/// of their transaction amounts, so the ledger can always be replayed to
/// audit the cached balance on the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsTransaction {
    /// Transaction identifier (immutable after creation).
    pub id: uuid::Uuid,
    /// The user whose balance this entry affects.
    pub user_id: UserId,
    /// Signed point amount after the multiplier was applied.
    pub amount: i64,
    /// Entry classification.
    pub kind: TransactionKind,
    /// What triggered the entry.
    pub source: PointsSource,
    /// Identifier of the triggering entity (quiz, course, badge), if any.
    pub source_ref: Option<uuid::Uuid>,
    /// Multiplier that was applied to the base amount.
    pub multiplier: f64,
    /// Human-readable description for the points history view.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PointsTransaction {
    /// Creates a new transaction stamped with the current time.
    #[must_use]
    pub fn new(
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
        source: PointsSource,
        source_ref: Option<uuid::Uuid>,
        description: impl Into<String>,
        multiplier: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id,
            amount,
            kind,
            source,
            source_ref,
            multiplier,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}
