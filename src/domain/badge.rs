//! Badge catalog, award conditions, and the per-user owned-badge store.
//!
//! Conditions are a closed enum: catalog files with an unknown condition
//! kind fail to load with a typed error instead of being silently skipped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{BadgeId, UserId};
use crate::error::EngineError;

/// Broad badge category, used only for display grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeType {
    /// Earned through course and quiz achievements.
    Learning,
    /// Earned through streaks.
    Streak,
    /// Subject-specific achievements.
    Subject,
}

/// Award condition: a statistic kind plus the threshold it must reach.
///
/// Eligibility is inclusive: a statistic exactly at the threshold qualifies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BadgeCondition {
    /// Number of courses the user has completed.
    CourseComplete {
        /// Required completed-course count.
        threshold: u32,
    },
    /// Number of distinct quizzes passed (at or above the pass threshold).
    QuizPass {
        /// Required distinct passed-quiz count.
        threshold: u32,
    },
    /// Number of attempts scored at 100%.
    QuizPerfect {
        /// Required perfect-attempt count.
        threshold: u32,
    },
    /// Current consecutive-day login streak.
    LoginStreak {
        /// Required streak length.
        threshold: u32,
    },
    /// Current consecutive quiz-pass streak.
    QuizStreak {
        /// Required streak length.
        threshold: u32,
    },
    /// Total point balance.
    PointsEarned {
        /// Required balance.
        threshold: i64,
    },
}

impl BadgeCondition {
    /// Returns the condition kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::CourseComplete { .. } => "course_complete",
            Self::QuizPass { .. } => "quiz_pass",
            Self::QuizPerfect { .. } => "quiz_perfect",
            Self::LoginStreak { .. } => "login_streak",
            Self::QuizStreak { .. } => "quiz_streak",
            Self::PointsEarned { .. } => "points_earned",
        }
    }
}

/// A badge catalog entry. Static, administrative, read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    /// Badge identifier.
    #[serde(default)]
    pub id: BadgeId,
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Display category.
    pub badge_type: BadgeType,
    /// Award condition.
    pub condition: BadgeCondition,
    /// Inactive badges are never evaluated.
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// The set of badges the engine evaluates.
#[derive(Debug, Default)]
pub struct BadgeCatalog {
    badges: RwLock<Vec<Badge>>,
}

impl BadgeCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the built-in starter catalog used when no catalog file is
    /// configured.
    #[must_use]
    pub fn with_defaults() -> Self {
        let badges = vec![
            badge("First Steps", BadgeType::Learning, BadgeCondition::CourseComplete { threshold: 1 }),
            badge("Course Collector", BadgeType::Learning, BadgeCondition::CourseComplete { threshold: 5 }),
            badge("Quiz Novice", BadgeType::Learning, BadgeCondition::QuizPass { threshold: 5 }),
            badge("Perfectionist", BadgeType::Learning, BadgeCondition::QuizPerfect { threshold: 3 }),
            badge("Week Warrior", BadgeType::Streak, BadgeCondition::LoginStreak { threshold: 7 }),
            badge("Unstoppable", BadgeType::Streak, BadgeCondition::QuizStreak { threshold: 10 }),
            badge("Point Hoarder", BadgeType::Learning, BadgeCondition::PointsEarned { threshold: 1000 }),
        ];
        Self {
            badges: RwLock::new(badges),
        }
    }

    /// Parses a catalog from a JSON array of badges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidCondition`] when the document is
    /// malformed or names an unknown condition kind.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let badges: Vec<Badge> = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidCondition(e.to_string()))?;
        Ok(Self {
            badges: RwLock::new(badges),
        })
    }

    /// Returns all active badges.
    pub async fn active(&self) -> Vec<Badge> {
        let badges = self.badges.read().await;
        badges.iter().filter(|b| b.active).cloned().collect()
    }

    /// Looks up a badge by id.
    pub async fn get(&self, id: BadgeId) -> Option<Badge> {
        let badges = self.badges.read().await;
        badges.iter().find(|b| b.id == id).cloned()
    }

    /// Returns the number of catalog entries, active or not.
    pub async fn len(&self) -> usize {
        self.badges.read().await.len()
    }

    /// Returns `true` if the catalog has no entries.
    pub async fn is_empty(&self) -> bool {
        self.badges.read().await.is_empty()
    }
}

fn badge(name: &str, badge_type: BadgeType, condition: BadgeCondition) -> Badge {
    Badge {
        id: BadgeId::new(),
        name: name.to_string(),
        description: String::new(),
        badge_type,
        condition,
        active: true,
    }
}

/// A badge owned by a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserBadge {
    /// Owning user.
    pub user_id: UserId,
    /// The badge that was earned.
    pub badge_id: BadgeId,
    /// When it was earned.
    pub earned_at: DateTime<Utc>,
}

/// Store of (user, badge) awards with the at-most-once invariant.
#[derive(Debug, Default)]
pub struct UserBadgeStore {
    owned: RwLock<HashMap<UserId, HashMap<BadgeId, UserBadge>>>,
}

impl UserBadgeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Awards a badge if the user does not already own it.
    ///
    /// Returns the created [`UserBadge`], or `None` when the pair already
    /// exists — awarding is idempotent and this is the re-entrancy guard of
    /// the badge engine.
    pub async fn try_award(&self, user_id: UserId, badge_id: BadgeId) -> Option<UserBadge> {
        let mut owned = self.owned.write().await;
        let user_badges = owned.entry(user_id).or_default();
        if user_badges.contains_key(&badge_id) {
            return None;
        }
        let user_badge = UserBadge {
            user_id,
            badge_id,
            earned_at: Utc::now(),
        };
        user_badges.insert(badge_id, user_badge.clone());
        Some(user_badge)
    }

    /// Returns `true` if the user owns the badge.
    pub async fn owns(&self, user_id: UserId, badge_id: BadgeId) -> bool {
        let owned = self.owned.read().await;
        owned
            .get(&user_id)
            .is_some_and(|badges| badges.contains_key(&badge_id))
    }

    /// Returns all badges owned by a user, earliest first.
    pub async fn badges_of(&self, user_id: UserId) -> Vec<UserBadge> {
        let owned = self.owned.read().await;
        let mut badges: Vec<_> = owned
            .get(&user_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        badges.sort_by_key(|b| b.earned_at);
        badges
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_catalog_is_all_active() {
        let catalog = BadgeCatalog::with_defaults();
        assert!(!catalog.is_empty().await);
        assert_eq!(catalog.active().await.len(), catalog.len().await);
    }

    #[tokio::test]
    async fn inactive_badges_are_filtered() {
        let json = r#"[
            {"name": "On", "badge_type": "learning",
             "condition": {"kind": "quiz_pass", "threshold": 1}},
            {"name": "Off", "badge_type": "learning", "active": false,
             "condition": {"kind": "quiz_pass", "threshold": 2}}
        ]"#;
        let catalog = BadgeCatalog::from_json(json);
        let Ok(catalog) = catalog else {
            panic!("catalog should parse");
        };
        assert_eq!(catalog.len().await, 2);
        let active = catalog.active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active.first().map(|b| b.name.as_str()), Some("On"));
    }

    #[test]
    fn unknown_condition_kind_is_an_error() {
        let json = r#"[
            {"name": "Mystery", "badge_type": "learning",
             "condition": {"kind": "moon_phase", "threshold": 3}}
        ]"#;
        let result = BadgeCatalog::from_json(json);
        assert!(matches!(result, Err(EngineError::InvalidCondition(_))));
    }

    #[test]
    fn condition_kind_str() {
        let c = BadgeCondition::LoginStreak { threshold: 7 };
        assert_eq!(c.kind_str(), "login_streak");
    }

    #[tokio::test]
    async fn try_award_is_idempotent() {
        let store = UserBadgeStore::new();
        let user = UserId::new();
        let badge = BadgeId::new();

        assert!(store.try_award(user, badge).await.is_some());
        assert!(store.try_award(user, badge).await.is_none());
        assert!(store.owns(user, badge).await);
        assert_eq!(store.badges_of(user).await.len(), 1);
    }

    #[tokio::test]
    async fn badges_of_unknown_user_is_empty() {
        let store = UserBadgeStore::new();
        assert!(store.badges_of(UserId::new()).await.is_empty());
    }

    #[tokio::test]
    async fn different_users_own_independently() {
        let store = UserBadgeStore::new();
        let badge = BadgeId::new();
        let a = UserId::new();
        let b = UserId::new();

        assert!(store.try_award(a, badge).await.is_some());
        assert!(!store.owns(b, badge).await);
        assert!(store.try_award(b, badge).await.is_some());
    }
}
