//! Per-user gamification profile and the concurrent profile registry.
//!
//! [`GamificationProfile`] holds the mutable aggregate state for one user:
//! cached point balance, streak counters, and freeze tokens.
//! [`ProfileRegistry`] stores profiles in a `HashMap` where each entry is
//! individually protected by a [`tokio::sync::RwLock`], so operations on
//! different users run concurrently while read-modify-writes on the same
//! user are serialized.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::UserId;

/// Outcome of applying a daily-login transition to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginTransition {
    /// The user already logged in today; nothing changed.
    AlreadyLoggedToday,
    /// Consecutive day: the streak advanced by one.
    Advanced {
        /// The streak length after the transition.
        streak: u32,
    },
    /// One day was missed but a freeze token covered it.
    Frozen {
        /// The streak length after the transition.
        streak: u32,
    },
    /// The streak broke (or this is the first login) and restarted at one.
    Reset,
}

impl LoginTransition {
    /// Returns `true` unless the login was a same-day no-op.
    #[must_use]
    pub const fn is_new_day(&self) -> bool {
        !matches!(self, Self::AlreadyLoggedToday)
    }
}

/// Mutable per-user aggregate: balance, streaks, freeze tokens.
///
/// Created lazily on first touch. Mutated exclusively through the service
/// layer while the owning registry entry's write lock is held; the cached
/// `total_points` must always equal the ledger sum for the user.
#[derive(Debug, Clone, Serialize)]
pub struct GamificationProfile {
    /// Owning user.
    pub user_id: UserId,
    /// Cached point balance. Equals the ledger sum at all times.
    pub total_points: i64,
    /// Current consecutive-day login streak.
    pub current_login_streak: u32,
    /// Longest login streak ever reached.
    pub longest_login_streak: u32,
    /// Calendar date of the last counted login, if any.
    pub last_login_date: Option<NaiveDate>,
    /// Courses completed in a row. No reset condition is defined for this
    /// counter; it is monotonically non-decreasing.
    pub current_course_streak: u32,
    /// Consecutive quiz passes. Resets to zero on any failure.
    pub current_quiz_streak: u32,
    /// Remaining freeze tokens; each forgives exactly one missed day.
    pub streak_freeze_tokens: u32,
    /// Profile creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl GamificationProfile {
    /// Creates a zeroed profile for a user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            total_points: 0,
            current_login_streak: 0,
            longest_login_streak: 0,
            last_login_date: None,
            current_course_streak: 0,
            current_quiz_streak: 0,
            streak_freeze_tokens: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes the `updated_at` stamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Applies the daily-login state machine for `today`.
    ///
    /// - Same calendar day as the last login: no-op.
    /// - Exactly one day after the last login: streak advances.
    /// - Exactly two days after, with a freeze token available: the token is
    ///   consumed and the streak advances across the missed day.
    /// - Anything else (including the first ever login): streak resets to 1.
    ///
    /// `longest_login_streak` and `last_login_date` are maintained on every
    /// non-no-op transition.
    pub fn apply_daily_login(&mut self, today: NaiveDate) -> LoginTransition {
        let transition = match self.last_login_date {
            Some(last) if last == today => return LoginTransition::AlreadyLoggedToday,
            Some(last) => {
                let gap = today.signed_duration_since(last).num_days();
                if gap == 1 {
                    self.current_login_streak += 1;
                    LoginTransition::Advanced {
                        streak: self.current_login_streak,
                    }
                } else if gap == 2 && self.streak_freeze_tokens > 0 {
                    self.streak_freeze_tokens -= 1;
                    self.current_login_streak += 1;
                    LoginTransition::Frozen {
                        streak: self.current_login_streak,
                    }
                } else {
                    self.current_login_streak = 1;
                    LoginTransition::Reset
                }
            }
            None => {
                self.current_login_streak = 1;
                LoginTransition::Reset
            }
        };

        self.longest_login_streak = self.longest_login_streak.max(self.current_login_streak);
        self.last_login_date = Some(today);
        self.touch();
        transition
    }
}

/// Concurrent store of all gamification profiles.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and per-entry
/// `Arc<RwLock<GamificationProfile>>` for fine-grained per-user locking.
///
/// # Concurrency
///
/// - Multiple tasks may read the same profile concurrently.
/// - Writes to different users' profiles are concurrent.
/// - Writes to the same profile are serialized; holding the entry's write
///   lock across a read-modify-write is what prevents lost balance and
///   streak updates.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: RwLock<HashMap<UserId, Arc<RwLock<GamificationProfile>>>>,
}

impl ProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the profile entry for a user, creating a zeroed one on first
    /// touch.
    pub async fn get_or_create(&self, user_id: UserId) -> Arc<RwLock<GamificationProfile>> {
        {
            let map = self.profiles.read().await;
            if let Some(entry) = map.get(&user_id) {
                return Arc::clone(entry);
            }
        }
        let mut map = self.profiles.write().await;
        Arc::clone(
            map.entry(user_id)
                .or_insert_with(|| Arc::new(RwLock::new(GamificationProfile::new(user_id)))),
        )
    }

    /// Returns the profile entry for a user if it already exists.
    pub async fn get(&self, user_id: UserId) -> Option<Arc<RwLock<GamificationProfile>>> {
        let map = self.profiles.read().await;
        map.get(&user_id).cloned()
    }

    /// Returns a point-in-time clone of every profile.
    ///
    /// Used by the snapshot persistence task; slight staleness is fine.
    pub async fn snapshot_all(&self) -> Vec<GamificationProfile> {
        let entries: Vec<_> = {
            let map = self.profiles.read().await;
            map.values().cloned().collect()
        };
        let mut profiles = Vec::with_capacity(entries.len());
        for entry in entries {
            profiles.push(entry.read().await.clone());
        }
        profiles
    }

    /// Returns the number of profiles in the registry.
    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    /// Returns `true` if no profile has been created yet.
    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
            panic!("valid date");
        };
        date
    }

    #[test]
    fn first_login_resets_to_one() {
        let mut profile = GamificationProfile::new(UserId::new());
        let t = profile.apply_daily_login(date(2024, 3, 1));
        assert_eq!(t, LoginTransition::Reset);
        assert_eq!(profile.current_login_streak, 1);
        assert_eq!(profile.longest_login_streak, 1);
        assert_eq!(profile.last_login_date, Some(date(2024, 3, 1)));
    }

    #[test]
    fn consecutive_days_advance_streak() {
        let mut profile = GamificationProfile::new(UserId::new());
        profile.apply_daily_login(date(2024, 3, 1));
        let t = profile.apply_daily_login(date(2024, 3, 2));
        assert_eq!(t, LoginTransition::Advanced { streak: 2 });
        assert_eq!(profile.current_login_streak, 2);
    }

    #[test]
    fn same_day_is_noop() {
        let mut profile = GamificationProfile::new(UserId::new());
        profile.apply_daily_login(date(2024, 3, 1));
        let t = profile.apply_daily_login(date(2024, 3, 1));
        assert_eq!(t, LoginTransition::AlreadyLoggedToday);
        assert!(!t.is_new_day());
        assert_eq!(profile.current_login_streak, 1);
    }

    #[test]
    fn missed_day_without_token_resets() {
        let mut profile = GamificationProfile::new(UserId::new());
        profile.apply_daily_login(date(2024, 3, 1));
        profile.apply_daily_login(date(2024, 3, 2));
        // Skip March 3rd entirely.
        let t = profile.apply_daily_login(date(2024, 3, 4));
        assert_eq!(t, LoginTransition::Reset);
        assert_eq!(profile.current_login_streak, 1);
        assert_eq!(profile.longest_login_streak, 2);
    }

    #[test]
    fn missed_day_with_token_preserves_streak() {
        let mut profile = GamificationProfile::new(UserId::new());
        profile.streak_freeze_tokens = 1;
        profile.apply_daily_login(date(2024, 3, 1));
        profile.apply_daily_login(date(2024, 3, 2));
        let t = profile.apply_daily_login(date(2024, 3, 4));
        assert_eq!(t, LoginTransition::Frozen { streak: 3 });
        assert_eq!(profile.current_login_streak, 3);
        assert_eq!(profile.streak_freeze_tokens, 0);
    }

    #[test]
    fn token_does_not_cover_two_missed_days() {
        let mut profile = GamificationProfile::new(UserId::new());
        profile.streak_freeze_tokens = 1;
        profile.apply_daily_login(date(2024, 3, 1));
        let t = profile.apply_daily_login(date(2024, 3, 4));
        assert_eq!(t, LoginTransition::Reset);
        assert_eq!(profile.current_login_streak, 1);
        assert_eq!(profile.streak_freeze_tokens, 1);
    }

    #[tokio::test]
    async fn registry_creates_lazily() {
        let registry = ProfileRegistry::new();
        assert!(registry.is_empty().await);

        let user = UserId::new();
        assert!(registry.get(user).await.is_none());

        let entry = registry.get_or_create(user).await;
        assert_eq!(entry.read().await.user_id, user);
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(user).await.is_some());
    }

    #[tokio::test]
    async fn get_or_create_returns_same_entry() {
        let registry = ProfileRegistry::new();
        let user = UserId::new();

        let first = registry.get_or_create(user).await;
        first.write().await.total_points = 42;

        let second = registry.get_or_create(user).await;
        assert_eq!(second.read().await.total_points, 42);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn snapshot_all_clones_profiles() {
        let registry = ProfileRegistry::new();
        let a = registry.get_or_create(UserId::new()).await;
        a.write().await.total_points = 10;
        let _ = registry.get_or_create(UserId::new()).await;

        let snapshots = registry.snapshot_all().await;
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().any(|p| p.total_points == 10));
    }
}
