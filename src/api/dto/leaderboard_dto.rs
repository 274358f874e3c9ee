//! Leaderboard DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::LeaderboardEntry;

/// One ranked row in a leaderboard response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntryDto {
    /// Dense rank, 1-based.
    pub rank: u32,
    /// The ranked user.
    pub user_id: Uuid,
    /// Points snapshot the rank is based on.
    pub points: i64,
    /// When the snapshot was last refreshed.
    pub updated_at: DateTime<Utc>,
}

impl From<&LeaderboardEntry> for LeaderboardEntryDto {
    fn from(entry: &LeaderboardEntry) -> Self {
        Self {
            rank: entry.rank,
            user_id: *entry.user_id.as_uuid(),
            points: entry.points,
            updated_at: entry.updated_at,
        }
    }
}

/// Response body for leaderboard endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Scope label (`global` or `course`).
    pub scope: String,
    /// Course identifier for course scopes.
    pub course_id: Option<Uuid>,
    /// Ranked entries, best first.
    pub entries: Vec<LeaderboardEntryDto>,
}
