//! Domain layer: core types, per-user state, and the event system.
//!
//! This module contains the engine's data model: typed identifiers, the
//! append-only points ledger, gamification profiles behind per-user locks,
//! the badge catalog and owned-badge store, leaderboard ranking, quiz
//! attempts, course progress, the read-only course catalog boundary, and
//! the event bus for broadcasting state changes.

pub mod badge;
pub mod catalog;
pub mod event;
pub mod event_bus;
pub mod ids;
pub mod leaderboard;
pub mod ledger;
pub mod profile;
pub mod progress;
pub mod quiz;
pub mod transaction;

pub use badge::{Badge, BadgeCatalog, BadgeCondition, UserBadge, UserBadgeStore};
pub use catalog::{CourseCatalog, InMemoryCatalog};
pub use event::GamificationEvent;
pub use event_bus::EventBus;
pub use ids::{AttemptId, BadgeId, CourseId, QuizId, UserId};
pub use leaderboard::{LeaderboardEntry, LeaderboardScope, LeaderboardTable};
pub use ledger::PointsLedger;
pub use profile::{GamificationProfile, LoginTransition, ProfileRegistry};
pub use progress::{CourseProgress, ProgressStore};
pub use quiz::{AttemptStore, Quiz, QuizAttempt, QuizQuestion};
pub use transaction::{PointsSource, PointsTransaction, TransactionKind};
