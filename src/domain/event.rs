//! Domain events reflecting gamification state mutations.
//!
//! Every state change emits a [`GamificationEvent`] through the
//! [`super::EventBus`]. Events are broadcast to WebSocket subscribers and
//! optionally appended to the PostgreSQL event log.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::leaderboard::LeaderboardScope;
use super::transaction::PointsSource;
use super::{BadgeId, CourseId, UserId};

/// Domain event emitted after every state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GamificationEvent {
    /// Points were credited to a user.
    PointsAwarded {
        /// The credited user.
        user_id: UserId,
        /// Signed amount credited (post-multiplier).
        amount: i64,
        /// Balance after the award.
        balance: i64,
        /// What triggered the award.
        source: PointsSource,
        /// Ledger description.
        description: String,
        /// Award timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Points were spent in the rewards store.
    PointsSpent {
        /// The spending user.
        user_id: UserId,
        /// Amount spent (positive).
        amount: i64,
        /// Balance after the spend.
        balance: i64,
        /// Ledger description.
        description: String,
        /// Spend timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A badge was earned.
    BadgeEarned {
        /// The earning user.
        user_id: UserId,
        /// The earned badge.
        badge_id: BadgeId,
        /// Badge display name.
        name: String,
        /// Award timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A daily login was counted.
    LoginRecorded {
        /// The logging-in user.
        user_id: UserId,
        /// Login streak after the transition.
        streak: u32,
        /// Whether a freeze token was consumed to preserve the streak.
        froze: bool,
        /// Login timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A quiz failure reset the quiz streak.
    QuizStreakBroken {
        /// The affected user.
        user_id: UserId,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A course reached 100% progress.
    CourseCompleted {
        /// The completing user.
        user_id: UserId,
        /// The completed course.
        course_id: CourseId,
        /// Issued certificate reference.
        certificate: Option<String>,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A leaderboard scope was re-ranked.
    LeaderboardRecomputed {
        /// The recomputed scope.
        scope: LeaderboardScope,
        /// Number of ranked entries.
        entries: usize,
        /// Recompute timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl GamificationEvent {
    /// Returns the user this event concerns, if it concerns a single user.
    ///
    /// Leaderboard recomputes are scope-wide and return `None`.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::PointsAwarded { user_id, .. }
            | Self::PointsSpent { user_id, .. }
            | Self::BadgeEarned { user_id, .. }
            | Self::LoginRecorded { user_id, .. }
            | Self::QuizStreakBroken { user_id, .. }
            | Self::CourseCompleted { user_id, .. } => Some(*user_id),
            Self::LeaderboardRecomputed { .. } => None,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::PointsAwarded { .. } => "points_awarded",
            Self::PointsSpent { .. } => "points_spent",
            Self::BadgeEarned { .. } => "badge_earned",
            Self::LoginRecorded { .. } => "login_recorded",
            Self::QuizStreakBroken { .. } => "quiz_streak_broken",
            Self::CourseCompleted { .. } => "course_completed",
            Self::LeaderboardRecomputed { .. } => "leaderboard_recomputed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn points_awarded_serializes() {
        let event = GamificationEvent::PointsAwarded {
            user_id: UserId::new(),
            amount: 150,
            balance: 650,
            source: PointsSource::QuizPass,
            description: "Quiz passed with 92.0% score".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event);
        assert!(json.is_ok());
        let json_str = json.unwrap_or_default();
        assert!(json_str.contains("points_awarded"));
        assert!(json_str.contains(r#""source":"quiz_pass""#));
    }

    #[test]
    fn user_id_accessor() {
        let id = UserId::new();
        let event = GamificationEvent::QuizStreakBroken {
            user_id: id,
            timestamp: Utc::now(),
        };
        assert_eq!(event.user_id(), Some(id));
        assert_eq!(event.event_type_str(), "quiz_streak_broken");
    }

    #[test]
    fn leaderboard_event_is_scope_wide() {
        let event = GamificationEvent::LeaderboardRecomputed {
            scope: LeaderboardScope::Global,
            entries: 12,
            timestamp: Utc::now(),
        };
        assert!(event.user_id().is_none());
        assert_eq!(event.event_type_str(), "leaderboard_recomputed");
    }
}
