//! Gamification service: the award pipeline and everything it drives.
//!
//! Every point-earning trigger funnels through here. The pipeline order is
//! fixed: record the ledger entry, update the affected streak, re-evaluate
//! badge eligibility to a fixed point, then recompute the affected
//! leaderboards. Badge and leaderboard updates are contractual side effects
//! of every award, but their failures are isolated: they are logged and
//! never roll back the ledger entry that triggered them.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::domain::profile::LoginTransition;
use crate::domain::{
    AttemptStore, Badge, BadgeCatalog, BadgeCondition, CourseCatalog, CourseId, EventBus,
    GamificationEvent, GamificationProfile, LeaderboardEntry, LeaderboardScope, LeaderboardTable,
    PointsLedger, PointsSource, PointsTransaction, ProfileRegistry, ProgressStore, QuizId,
    TransactionKind, UserBadge, UserBadgeStore, UserId,
};
use crate::error::EngineError;

/// Fixed bonus for each daily login.
pub const DAILY_LOGIN_POINTS: u32 = 10;

/// Base points for passing a quiz, before the quality multiplier.
pub const QUIZ_PASS_POINTS: u32 = 100;

/// Base points for completing a course.
pub const COURSE_COMPLETE_POINTS: u32 = 500;

/// Bonus granted when a badge is earned.
pub const BADGE_BONUS_POINTS: u32 = 50;

/// Login streak length between milestone bonuses.
pub const LOGIN_MILESTONE_INTERVAL: u32 = 7;

/// Quiz streak length between streak bonuses.
pub const QUIZ_STREAK_INTERVAL: u32 = 5;

/// Unit used to scale streak milestone bonuses.
pub const STREAK_BONUS_UNIT: u32 = 50;

/// Outcome summary of a daily-login call.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSummary {
    /// `true` when the login was a same-day no-op.
    pub already_logged_today: bool,
    /// Login streak after the call.
    pub streak: u32,
    /// Longest login streak ever reached.
    pub longest_streak: u32,
    /// Whether a freeze token was consumed.
    pub froze: bool,
    /// Points credited by this call (daily bonus plus any milestone).
    pub points_awarded: i64,
}

/// Snapshot of the statistics badge conditions are evaluated against.
#[derive(Debug, Clone, Copy)]
struct BadgeStats {
    completed_courses: usize,
    distinct_quizzes_passed: usize,
    perfect_attempts: usize,
    login_streak: u32,
    quiz_streak: u32,
    total_points: i64,
}

impl BadgeStats {
    /// Inclusive threshold comparison for every condition kind.
    fn satisfies(&self, condition: &BadgeCondition) -> bool {
        match *condition {
            BadgeCondition::CourseComplete { threshold } => {
                self.completed_courses >= threshold as usize
            }
            BadgeCondition::QuizPass { threshold } => {
                self.distinct_quizzes_passed >= threshold as usize
            }
            BadgeCondition::QuizPerfect { threshold } => {
                self.perfect_attempts >= threshold as usize
            }
            BadgeCondition::LoginStreak { threshold } => self.login_streak >= threshold,
            BadgeCondition::QuizStreak { threshold } => self.quiz_streak >= threshold,
            BadgeCondition::PointsEarned { threshold } => self.total_points >= threshold,
        }
    }
}

/// Maps a quiz percentage to its point multiplier.
#[must_use]
pub fn quality_multiplier(percentage: f64) -> f64 {
    if percentage >= 100.0 {
        2.0
    } else if percentage >= 90.0 {
        1.5
    } else if percentage >= 80.0 {
        1.25
    } else {
        1.0
    }
}

/// Orchestration layer for the points ledger, streaks, badges, and
/// leaderboards.
///
/// Owns all engine state. Every mutation method follows the pattern:
/// acquire the user's profile lock → mutate → publish events → run the
/// badge/leaderboard side effects.
#[derive(Debug)]
pub struct GamificationService {
    ledger: PointsLedger,
    profiles: ProfileRegistry,
    badges: BadgeCatalog,
    user_badges: UserBadgeStore,
    attempts: AttemptStore,
    progress: ProgressStore,
    leaderboards: LeaderboardTable,
    catalog: Arc<dyn CourseCatalog>,
    event_bus: EventBus,
}

impl GamificationService {
    /// Creates a new service over the given catalog and badge set.
    #[must_use]
    pub fn new(catalog: Arc<dyn CourseCatalog>, badges: BadgeCatalog, event_bus: EventBus) -> Self {
        Self {
            ledger: PointsLedger::new(),
            profiles: ProfileRegistry::new(),
            badges,
            user_badges: UserBadgeStore::new(),
            attempts: AttemptStore::new(),
            progress: ProgressStore::new(),
            leaderboards: LeaderboardTable::new(),
            catalog,
            event_bus,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns the attempt store shared with the quiz pipeline.
    #[must_use]
    pub fn attempts(&self) -> &AttemptStore {
        &self.attempts
    }

    /// Returns the course-progress store shared with the quiz pipeline.
    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Returns the course catalog boundary.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn CourseCatalog> {
        &self.catalog
    }

    /// Returns the profile registry (snapshot/persistence use).
    #[must_use]
    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    // ── Ledger operations ───────────────────────────────────────────────

    /// Awards points and runs the full side-effect pipeline.
    ///
    /// `final_points = round(base_points × multiplier)`. Appends the ledger
    /// entry and increments the balance atomically under the user's profile
    /// lock, then re-evaluates badges and recomputes leaderboards. Side
    /// effect failures are logged and do not fail the award.
    ///
    /// Returns the credited amount.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; the `Result` is part of the
    /// public contract so persistence-backed stores can slot in.
    pub async fn award_points(
        &self,
        user_id: UserId,
        base_points: u32,
        source: PointsSource,
        source_ref: Option<uuid::Uuid>,
        description: &str,
        multiplier: f64,
    ) -> Result<i64, EngineError> {
        let final_points = scaled_points(base_points, multiplier);
        self.apply_transaction(
            user_id,
            final_points,
            TransactionKind::Earned,
            source,
            source_ref,
            description,
            multiplier,
        )
        .await;
        self.run_award_side_effects(user_id).await;
        Ok(final_points)
    }

    /// Spends points from the user's balance.
    ///
    /// Returns `Ok(false)` without any side effect when the balance is
    /// insufficient; otherwise appends a negative `Spent` entry, decrements
    /// the balance, and refreshes the user's leaderboard entries.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; see [`Self::award_points`].
    pub async fn spend_points(
        &self,
        user_id: UserId,
        points: u32,
        description: &str,
    ) -> Result<bool, EngineError> {
        let cost = i64::from(points);
        let entry = self.profiles.get_or_create(user_id).await;
        let mut profile = entry.write().await;
        if profile.total_points < cost {
            return Ok(false);
        }
        let tx = PointsTransaction::new(
            user_id,
            -cost,
            TransactionKind::Spent,
            PointsSource::Purchase,
            None,
            description,
            1.0,
        );
        self.ledger.append(tx).await;
        profile.total_points -= cost;
        profile.touch();
        let balance = profile.total_points;
        drop(profile);

        self.event_bus.publish(GamificationEvent::PointsSpent {
            user_id,
            amount: cost,
            balance,
            description: description.to_string(),
            timestamp: Utc::now(),
        });

        // The balance moved, so ranks follow; badges are never revoked.
        if let Err(e) = self.refresh_leaderboards(user_id).await {
            tracing::warn!(%user_id, error = %e, "leaderboard refresh failed after spend");
        }
        Ok(true)
    }

    /// Applies a signed administrative adjustment and runs the side-effect
    /// pipeline. Negative amounts are recorded as penalties.
    ///
    /// Returns the balance after the adjustment.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; see [`Self::award_points`].
    pub async fn admin_adjust(
        &self,
        user_id: UserId,
        amount: i64,
        description: &str,
    ) -> Result<i64, EngineError> {
        let kind = if amount >= 0 {
            TransactionKind::Earned
        } else {
            TransactionKind::Penalty
        };
        let balance = self
            .apply_transaction(
                user_id,
                amount,
                kind,
                PointsSource::AdminAdjustment,
                None,
                description,
                1.0,
            )
            .await;
        self.run_award_side_effects(user_id).await;
        Ok(balance)
    }

    /// Verifies that the cached profile balance equals the ledger sum.
    ///
    /// Returns the balance on success.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvariantViolation`] on divergence. This must
    /// never happen; it is surfaced loudly rather than silently corrected.
    pub async fn audit(&self, user_id: UserId) -> Result<i64, EngineError> {
        let ledger_sum = self.ledger.balance_of(user_id).await;
        let profile_balance = match self.profiles.get(user_id).await {
            Some(entry) => entry.read().await.total_points,
            None => 0,
        };
        if ledger_sum != profile_balance {
            tracing::error!(
                %user_id,
                ledger_sum,
                profile_balance,
                "profile balance diverged from ledger"
            );
            return Err(EngineError::InvariantViolation(format!(
                "user {user_id}: profile balance {profile_balance} != ledger sum {ledger_sum}"
            )));
        }
        Ok(profile_balance)
    }

    // ── Streak triggers ─────────────────────────────────────────────────

    /// Processes a daily login for today.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; see [`Self::award_points`].
    pub async fn handle_daily_login(&self, user_id: UserId) -> Result<LoginSummary, EngineError> {
        self.handle_daily_login_on(user_id, Utc::now().date_naive())
            .await
    }

    /// Processes a daily login for an explicit calendar date.
    ///
    /// Same-day repeats are no-ops. Every counted login awards the fixed
    /// daily bonus, and every seventh consecutive day a milestone bonus of
    /// `STREAK_BONUS_UNIT × (streak / 7)`.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; see [`Self::award_points`].
    pub async fn handle_daily_login_on(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> Result<LoginSummary, EngineError> {
        let entry = self.profiles.get_or_create(user_id).await;
        let mut profile = entry.write().await;
        let transition = profile.apply_daily_login(today);
        let streak = profile.current_login_streak;
        let longest_streak = profile.longest_login_streak;
        drop(profile);

        if !transition.is_new_day() {
            return Ok(LoginSummary {
                already_logged_today: true,
                streak,
                longest_streak,
                froze: false,
                points_awarded: 0,
            });
        }
        let froze = matches!(transition, LoginTransition::Frozen { .. });

        let mut points_awarded = i64::from(DAILY_LOGIN_POINTS);
        self.apply_transaction(
            user_id,
            points_awarded,
            TransactionKind::Earned,
            PointsSource::DailyLogin,
            None,
            "Daily login bonus",
            1.0,
        )
        .await;

        if streak % LOGIN_MILESTONE_INTERVAL == 0 {
            let bonus = i64::from(STREAK_BONUS_UNIT * (streak / LOGIN_MILESTONE_INTERVAL));
            self.apply_transaction(
                user_id,
                bonus,
                TransactionKind::Bonus,
                PointsSource::LoginStreak,
                None,
                &format!("Login streak bonus ({streak} days)"),
                1.0,
            )
            .await;
            points_awarded += bonus;
        }

        self.event_bus.publish(GamificationEvent::LoginRecorded {
            user_id,
            streak,
            froze,
            timestamp: Utc::now(),
        });

        self.run_award_side_effects(user_id).await;

        Ok(LoginSummary {
            already_logged_today: false,
            streak,
            longest_streak,
            froze,
            points_awarded,
        })
    }

    /// Processes a scored quiz outcome.
    ///
    /// A failure resets the quiz streak unconditionally — there is no
    /// freeze mechanism for quiz streaks. A pass awards the base points
    /// scaled by score quality, advances the streak, and every fifth
    /// consecutive pass adds `STREAK_BONUS_UNIT × (streak / 5)`.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; see [`Self::award_points`].
    pub async fn handle_quiz_result(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
        percentage: f64,
        passed: bool,
    ) -> Result<(), EngineError> {
        let entry = self.profiles.get_or_create(user_id).await;

        if !passed {
            let mut profile = entry.write().await;
            profile.current_quiz_streak = 0;
            profile.touch();
            drop(profile);
            self.event_bus.publish(GamificationEvent::QuizStreakBroken {
                user_id,
                timestamp: Utc::now(),
            });
            tracing::debug!(%user_id, %quiz_id, "quiz failed, streak reset");
            return Ok(());
        }

        let multiplier = quality_multiplier(percentage);
        self.apply_transaction(
            user_id,
            scaled_points(QUIZ_PASS_POINTS, multiplier),
            TransactionKind::Earned,
            PointsSource::QuizPass,
            Some(*quiz_id.as_uuid()),
            &format!("Quiz passed with {percentage:.1}% score"),
            multiplier,
        )
        .await;

        let streak = {
            let mut profile = entry.write().await;
            profile.current_quiz_streak += 1;
            profile.touch();
            profile.current_quiz_streak
        };

        if streak % QUIZ_STREAK_INTERVAL == 0 {
            let bonus = i64::from(STREAK_BONUS_UNIT * (streak / QUIZ_STREAK_INTERVAL));
            self.apply_transaction(
                user_id,
                bonus,
                TransactionKind::Bonus,
                PointsSource::QuizPass,
                Some(*quiz_id.as_uuid()),
                &format!("Quiz streak bonus ({streak} in a row)"),
                1.0,
            )
            .await;
        }

        self.run_award_side_effects(user_id).await;
        Ok(())
    }

    /// Processes a course completion: flat reward plus the course streak.
    ///
    /// Returns the credited amount.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; see [`Self::award_points`].
    pub async fn handle_course_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        certificate: Option<String>,
    ) -> Result<i64, EngineError> {
        let name = self
            .catalog
            .course_name(course_id)
            .unwrap_or_else(|| course_id.to_string());
        self.apply_transaction(
            user_id,
            i64::from(COURSE_COMPLETE_POINTS),
            TransactionKind::Earned,
            PointsSource::CourseComplete,
            Some(*course_id.as_uuid()),
            &format!("Course completed: {name}"),
            1.0,
        )
        .await;

        let entry = self.profiles.get_or_create(user_id).await;
        {
            let mut profile = entry.write().await;
            profile.current_course_streak += 1;
            profile.touch();
        }

        self.event_bus.publish(GamificationEvent::CourseCompleted {
            user_id,
            course_id,
            certificate,
            timestamp: Utc::now(),
        });
        tracing::info!(%user_id, %course_id, "course completed");

        self.run_award_side_effects(user_id).await;
        Ok(i64::from(COURSE_COMPLETE_POINTS))
    }

    /// Grants streak freeze tokens to a user (admin tooling).
    pub async fn grant_freeze_tokens(&self, user_id: UserId, count: u32) -> u32 {
        let entry = self.profiles.get_or_create(user_id).await;
        let mut profile = entry.write().await;
        profile.streak_freeze_tokens += count;
        profile.touch();
        profile.streak_freeze_tokens
    }

    // ── Badge engine ────────────────────────────────────────────────────

    /// Re-evaluates badge eligibility for a user until no new badge is
    /// awarded, returning everything newly earned.
    ///
    /// Each newly earned badge grants a point bonus, which can itself make
    /// further badges eligible; the owned-badge idempotency guard bounds
    /// the loop.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; see [`Self::award_points`].
    pub async fn check_badge_eligibility(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Badge>, EngineError> {
        let newly = self.badge_fixed_point(user_id).await?;
        if !newly.is_empty() {
            self.refresh_leaderboards(user_id).await?;
        }
        Ok(newly)
    }

    /// Returns the user's earned badges joined with their catalog entries.
    pub async fn badges_of(&self, user_id: UserId) -> Vec<(UserBadge, Badge)> {
        let owned = self.user_badges.badges_of(user_id).await;
        let mut joined = Vec::with_capacity(owned.len());
        for user_badge in owned {
            if let Some(badge) = self.badges.get(user_badge.badge_id).await {
                joined.push((user_badge, badge));
            }
        }
        joined
    }

    async fn badge_fixed_point(&self, user_id: UserId) -> Result<Vec<Badge>, EngineError> {
        let mut awarded = Vec::new();
        // Terminates: the owned set grows on every pass that continues, and
        // the catalog is finite.
        loop {
            let newly = self.badge_sweep(user_id).await?;
            if newly.is_empty() {
                break;
            }
            awarded.extend(newly);
        }
        Ok(awarded)
    }

    /// One eligibility pass over the active catalog against a stats
    /// snapshot taken at entry.
    async fn badge_sweep(&self, user_id: UserId) -> Result<Vec<Badge>, EngineError> {
        let stats = self.badge_stats(user_id).await;
        let mut newly = Vec::new();
        for badge in self.badges.active().await {
            if !stats.satisfies(&badge.condition) {
                continue;
            }
            if self.user_badges.try_award(user_id, badge.id).await.is_none() {
                continue;
            }
            self.apply_transaction(
                user_id,
                i64::from(BADGE_BONUS_POINTS),
                TransactionKind::Bonus,
                PointsSource::BadgeEarned,
                Some(*badge.id.as_uuid()),
                &format!("Badge earned: {}", badge.name),
                1.0,
            )
            .await;
            self.event_bus.publish(GamificationEvent::BadgeEarned {
                user_id,
                badge_id: badge.id,
                name: badge.name.clone(),
                timestamp: Utc::now(),
            });
            tracing::info!(%user_id, badge = %badge.name, "badge awarded");
            newly.push(badge);
        }
        Ok(newly)
    }

    async fn badge_stats(&self, user_id: UserId) -> BadgeStats {
        let (login_streak, quiz_streak, total_points) = match self.profiles.get(user_id).await {
            Some(entry) => {
                let profile = entry.read().await;
                (
                    profile.current_login_streak,
                    profile.current_quiz_streak,
                    profile.total_points,
                )
            }
            None => (0, 0, 0),
        };
        BadgeStats {
            completed_courses: self.progress.completed_count(user_id).await,
            distinct_quizzes_passed: self.attempts.distinct_passed(user_id).await,
            perfect_attempts: self.attempts.perfect_count(user_id).await,
            login_streak,
            quiz_streak,
            total_points,
        }
    }

    // ── Leaderboards ────────────────────────────────────────────────────

    /// Recomputes every scope the user participates in: global, periodic,
    /// and each enrolled course.
    ///
    /// # Errors
    ///
    /// Currently infallible at the store level; see [`Self::award_points`].
    pub async fn refresh_leaderboards(&self, user_id: UserId) -> Result<(), EngineError> {
        let entry = self.profiles.get_or_create(user_id).await;
        let balance = entry.read().await.total_points;

        let mut scopes = vec![LeaderboardScope::Global, LeaderboardScope::Periodic];
        for course_id in self.catalog.enrolled_courses(user_id) {
            scopes.push(LeaderboardScope::Course { course_id });
        }

        for scope in scopes {
            self.leaderboards.upsert(scope, user_id, balance).await;
            let entries = self.leaderboards.recompute(scope).await;
            if matches!(scope, LeaderboardScope::Global) {
                self.event_bus
                    .publish(GamificationEvent::LeaderboardRecomputed {
                        scope,
                        entries,
                        timestamp: Utc::now(),
                    });
            }
        }
        Ok(())
    }

    /// Returns the top of the global leaderboard.
    pub async fn global_leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboards.top(LeaderboardScope::Global, limit).await
    }

    /// Returns the top of a course leaderboard.
    pub async fn course_leaderboard(
        &self,
        course_id: CourseId,
        limit: usize,
    ) -> Vec<LeaderboardEntry> {
        self.leaderboards
            .top(LeaderboardScope::Course { course_id }, limit)
            .await
    }

    /// Clears the periodic leaderboard, returning the removed entry count.
    pub async fn reset_periodic_leaderboard(&self) -> usize {
        self.leaderboards.reset(LeaderboardScope::Periodic).await
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Returns a point-in-time clone of the user's profile, creating it on
    /// first touch.
    pub async fn profile_snapshot(&self, user_id: UserId) -> GamificationProfile {
        let entry = self.profiles.get_or_create(user_id).await;
        let profile = entry.read().await;
        profile.clone()
    }

    /// Returns the user's points history, newest first.
    pub async fn points_history(&self, user_id: UserId) -> Vec<PointsTransaction> {
        self.ledger.history(user_id).await
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Appends a ledger entry and updates the cached balance under the
    /// user's profile write lock. Returns the new balance.
    ///
    /// This is the serialization point required for the balance invariant:
    /// the append and the increment happen while the per-user lock is held.
    async fn apply_transaction(
        &self,
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
        source: PointsSource,
        source_ref: Option<uuid::Uuid>,
        description: &str,
        multiplier: f64,
    ) -> i64 {
        let entry = self.profiles.get_or_create(user_id).await;
        let mut profile = entry.write().await;
        let tx = PointsTransaction::new(
            user_id, amount, kind, source, source_ref, description, multiplier,
        );
        self.ledger.append(tx).await;
        profile.total_points += amount;
        profile.touch();
        let balance = profile.total_points;
        drop(profile);

        if kind != TransactionKind::Spent {
            self.event_bus.publish(GamificationEvent::PointsAwarded {
                user_id,
                amount,
                balance,
                source,
                description: description.to_string(),
                timestamp: Utc::now(),
            });
        }
        tracing::debug!(%user_id, amount, balance, source = source.as_str(), "ledger entry");
        balance
    }

    /// Badge fixed point then leaderboard recompute, with failures logged
    /// and swallowed: the ledger entry that triggered them is authoritative
    /// and must not be rolled back.
    async fn run_award_side_effects(&self, user_id: UserId) {
        if let Err(e) = self.badge_fixed_point(user_id).await {
            tracing::warn!(%user_id, error = %e, "badge evaluation failed after award");
        }
        if let Err(e) = self.refresh_leaderboards(user_id).await {
            tracing::warn!(%user_id, error = %e, "leaderboard refresh failed after award");
        }
    }
}

/// Applies a multiplier to base points, rounding half-up like the ledger
/// contract requires.
#[allow(clippy::cast_possible_truncation)]
fn scaled_points(base_points: u32, multiplier: f64) -> i64 {
    (f64::from(base_points) * multiplier).round() as i64
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{InMemoryCatalog, Quiz, QuizQuestion};

    fn empty_service() -> GamificationService {
        GamificationService::new(
            Arc::new(InMemoryCatalog::new()),
            BadgeCatalog::new(),
            EventBus::new(100),
        )
    }

    fn service_with_badges(json: &str) -> GamificationService {
        let Ok(badges) = BadgeCatalog::from_json(json) else {
            panic!("badge catalog should parse");
        };
        GamificationService::new(Arc::new(InMemoryCatalog::new()), badges, EventBus::new(100))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
            panic!("valid date");
        };
        date
    }

    #[test]
    fn multiplier_tiers() {
        assert!((quality_multiplier(100.0) - 2.0).abs() < f64::EPSILON);
        assert!((quality_multiplier(92.5) - 1.5).abs() < f64::EPSILON);
        assert!((quality_multiplier(80.0) - 1.25).abs() < f64::EPSILON);
        assert!((quality_multiplier(79.9) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scaled_points_rounds() {
        assert_eq!(scaled_points(25, 1.5), 38);
        assert_eq!(scaled_points(100, 1.25), 125);
        assert_eq!(scaled_points(100, 1.0), 100);
    }

    #[tokio::test]
    async fn award_updates_balance_and_ledger() {
        let service = empty_service();
        let user = UserId::new();

        let credited = service
            .award_points(user, 100, PointsSource::QuizPass, None, "test award", 1.5)
            .await;
        assert_eq!(credited.ok(), Some(150));

        let profile = service.profile_snapshot(user).await;
        assert_eq!(profile.total_points, 150);
        assert_eq!(service.audit(user).await.ok(), Some(150));

        let history = service.points_history(user).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().map(|t| t.amount), Some(150));
    }

    #[tokio::test]
    async fn spend_fails_without_balance() {
        let service = empty_service();
        let user = UserId::new();

        assert_eq!(service.spend_points(user, 10, "sticker").await.ok(), Some(false));
        assert!(service.points_history(user).await.is_empty());

        let _ = service
            .award_points(user, 100, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;
        assert_eq!(service.spend_points(user, 60, "sticker").await.ok(), Some(true));

        let profile = service.profile_snapshot(user).await;
        assert_eq!(profile.total_points, 40);
        assert_eq!(service.audit(user).await.ok(), Some(40));
    }

    #[tokio::test]
    async fn admin_penalty_is_negative_and_audited() {
        let service = empty_service();
        let user = UserId::new();
        let _ = service
            .award_points(user, 100, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;

        let balance = service.admin_adjust(user, -30, "late submission").await;
        assert_eq!(balance.ok(), Some(70));

        let history = service.points_history(user).await;
        let penalty = history.iter().find(|t| t.amount == -30);
        let Some(penalty) = penalty else {
            panic!("expected penalty entry");
        };
        assert_eq!(penalty.kind, TransactionKind::Penalty);
        assert_eq!(penalty.source, PointsSource::AdminAdjustment);
        assert_eq!(service.audit(user).await.ok(), Some(70));
    }

    #[tokio::test]
    async fn first_login_awards_daily_bonus() {
        let service = empty_service();
        let user = UserId::new();

        let summary = service.handle_daily_login_on(user, date(2024, 5, 1)).await;
        let Ok(summary) = summary else {
            panic!("login failed");
        };
        assert!(!summary.already_logged_today);
        assert_eq!(summary.streak, 1);
        assert_eq!(summary.points_awarded, i64::from(DAILY_LOGIN_POINTS));

        let repeat = service.handle_daily_login_on(user, date(2024, 5, 1)).await;
        let Ok(repeat) = repeat else {
            panic!("login failed");
        };
        assert!(repeat.already_logged_today);
        assert_eq!(repeat.points_awarded, 0);
        assert_eq!(service.audit(user).await.ok(), Some(10));
    }

    #[tokio::test]
    async fn seventh_login_adds_milestone_bonus() {
        let service = empty_service();
        let user = UserId::new();

        for day in 1..=7 {
            let result = service.handle_daily_login_on(user, date(2024, 5, day)).await;
            assert!(result.is_ok());
        }

        let profile = service.profile_snapshot(user).await;
        assert_eq!(profile.current_login_streak, 7);
        // 7 daily bonuses plus one 50-point milestone.
        assert_eq!(profile.total_points, 7 * 10 + 50);
        assert_eq!(service.audit(user).await.ok(), Some(120));
    }

    #[tokio::test]
    async fn freeze_token_bridges_one_missed_day() {
        let service = empty_service();
        let user = UserId::new();
        assert_eq!(service.grant_freeze_tokens(user, 1).await, 1);

        let _ = service.handle_daily_login_on(user, date(2024, 5, 1)).await;
        let _ = service.handle_daily_login_on(user, date(2024, 5, 2)).await;
        let summary = service.handle_daily_login_on(user, date(2024, 5, 4)).await;
        let Ok(summary) = summary else {
            panic!("login failed");
        };
        assert!(summary.froze);
        assert_eq!(summary.streak, 3);

        let profile = service.profile_snapshot(user).await;
        assert_eq!(profile.streak_freeze_tokens, 0);
    }

    #[tokio::test]
    async fn quiz_streak_advances_and_breaks() {
        let service = empty_service();
        let user = UserId::new();
        let quiz = QuizId::new();

        for _ in 0..3 {
            let result = service.handle_quiz_result(user, quiz, 80.0, true).await;
            assert!(result.is_ok());
        }
        assert_eq!(service.profile_snapshot(user).await.current_quiz_streak, 3);

        let result = service.handle_quiz_result(user, quiz, 40.0, false).await;
        assert!(result.is_ok());
        assert_eq!(service.profile_snapshot(user).await.current_quiz_streak, 0);
    }

    #[tokio::test]
    async fn quiz_streak_bonus_only_on_fifth_pass() {
        let service = empty_service();
        let user = UserId::new();
        let quiz = QuizId::new();

        for _ in 0..6 {
            let result = service.handle_quiz_result(user, quiz, 75.0, true).await;
            assert!(result.is_ok());
        }

        let history = service.points_history(user).await;
        let bonuses: Vec<_> = history
            .iter()
            .filter(|t| t.kind == TransactionKind::Bonus)
            .collect();
        assert_eq!(bonuses.len(), 1);
        assert_eq!(bonuses.first().map(|t| t.amount), Some(50));
        // 6 passes at 75% (1.0×) plus one streak bonus.
        assert_eq!(service.audit(user).await.ok(), Some(650));
    }

    #[tokio::test]
    async fn course_completion_awards_and_advances_streak() {
        let service = empty_service();
        let user = UserId::new();

        let credited = service
            .handle_course_completion(user, CourseId::new(), None)
            .await;
        assert_eq!(credited.ok(), Some(500));

        let profile = service.profile_snapshot(user).await;
        assert_eq!(profile.current_course_streak, 1);
        assert_eq!(profile.total_points, 500);
    }

    #[tokio::test]
    async fn badge_threshold_is_inclusive_and_idempotent() {
        let service = service_with_badges(
            r#"[{"name": "Rich", "badge_type": "learning",
                 "condition": {"kind": "points_earned", "threshold": 100}}]"#,
        );
        let user = UserId::new();

        let _ = service
            .award_points(user, 50, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;
        assert!(service.badges_of(user).await.is_empty());

        // Crosses exactly to the threshold.
        let _ = service
            .award_points(user, 50, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;
        assert_eq!(service.badges_of(user).await.len(), 1);

        let again = service.check_badge_eligibility(user).await;
        assert_eq!(again.ok().map(|b| b.len()), Some(0));
        assert_eq!(service.badges_of(user).await.len(), 1);
        // 100 earned + 50 badge bonus, consistent with the ledger.
        assert_eq!(service.audit(user).await.ok(), Some(150));
    }

    #[tokio::test]
    async fn badge_bonus_cascade_terminates() {
        // The 50-point bonus from the first badge pushes the balance to the
        // second badge's threshold; the fixed point must award both.
        let service = service_with_badges(
            r#"[{"name": "Starter", "badge_type": "learning",
                 "condition": {"kind": "points_earned", "threshold": 100}},
                {"name": "Momentum", "badge_type": "learning",
                 "condition": {"kind": "points_earned", "threshold": 140}}]"#,
        );
        let user = UserId::new();

        let _ = service
            .award_points(user, 100, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;

        assert_eq!(service.badges_of(user).await.len(), 2);
        assert_eq!(service.audit(user).await.ok(), Some(200));
    }

    #[tokio::test]
    async fn leaderboard_ranks_follow_awards() {
        let service = empty_service();
        let alice = UserId::new();
        let bob = UserId::new();

        let _ = service
            .award_points(alice, 300, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;
        let _ = service
            .award_points(bob, 100, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;

        let top = service.global_leaderboard(10).await;
        assert_eq!(top.len(), 2);
        assert_eq!(top.first().map(|e| (e.user_id, e.rank)), Some((alice, 1)));
        assert_eq!(top.get(1).map(|e| (e.user_id, e.rank)), Some((bob, 2)));
    }

    #[tokio::test]
    async fn course_scope_tracks_enrollment() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let course = CourseId::new();
        catalog.add_course(course, "Rust 101");
        let user = UserId::new();
        catalog.enroll(user, course);

        let service =
            GamificationService::new(Arc::clone(&catalog) as Arc<dyn CourseCatalog>, BadgeCatalog::new(), EventBus::new(100));
        let _ = service
            .award_points(user, 10, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;

        let board = service.course_leaderboard(course, 10).await;
        assert_eq!(board.len(), 1);

        // A user not enrolled anywhere only appears in global/periodic.
        let stranger = UserId::new();
        let _ = service
            .award_points(stranger, 10, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;
        assert_eq!(service.course_leaderboard(course, 10).await.len(), 1);
    }

    #[tokio::test]
    async fn audit_detects_divergence() {
        let service = empty_service();
        let user = UserId::new();
        let _ = service
            .award_points(user, 100, PointsSource::DailyLogin, None, "seed", 1.0)
            .await;

        // Corrupt the cached balance behind the service's back.
        let entry = service.profiles().get_or_create(user).await;
        entry.write().await.total_points = 999;

        let result = service.audit(user).await;
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn quiz_result_sample_quiz_unused_catalog() {
        // handle_quiz_result does not need the quiz in the catalog; the
        // reference id is carried opaquely into the ledger.
        let service = empty_service();
        let user = UserId::new();
        let quiz = Quiz {
            id: QuizId::new(),
            course_id: CourseId::new(),
            title: "t".to_string(),
            description: String::new(),
            questions: vec![QuizQuestion {
                text: "q".to_string(),
                options: vec!["a".into()],
                correct_answers: Vec::new(),
                correct_answer: 0,
                points: 10,
            }],
        };
        let result = service.handle_quiz_result(user, quiz.id, 100.0, true).await;
        assert!(result.is_ok());
        // Perfect score earns the 2× multiplier.
        assert_eq!(service.audit(user).await.ok(), Some(200));
    }

    #[tokio::test]
    async fn fresh_user_earns_nothing_from_default_catalog() {
        let service = GamificationService::new(
            Arc::new(InMemoryCatalog::new()),
            BadgeCatalog::with_defaults(),
            EventBus::new(100),
        );
        let user = UserId::new();
        // Far below every default threshold: nothing is awarded.
        let newly = service.check_badge_eligibility(user).await;
        assert_eq!(newly.ok().map(|b| b.len()), Some(0));
    }
}
