//! Data Transfer Objects for REST request/response serialization.
//!
//! Identifier fields are plain [`uuid::Uuid`]s at this boundary; the typed
//! id newtypes live in the domain layer.

pub mod common_dto;
pub mod gamification_dto;
pub mod leaderboard_dto;
pub mod quiz_dto;

pub use common_dto::*;
pub use gamification_dto::*;
pub use leaderboard_dto::*;
pub use quiz_dto::*;
