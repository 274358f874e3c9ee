//! Service layer: business logic orchestration.
//!
//! [`GamificationService`] owns the engine state and the award pipeline;
//! [`QuizService`] drives quiz scoring, cooldown, and course progress on
//! top of it. Both emit events through the [`crate::domain::EventBus`].

pub mod gamification;
pub mod quiz;

pub use gamification::{GamificationService, LoginSummary};
pub use quiz::{QuizService, ScoreResult};
