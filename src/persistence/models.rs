//! Database models for events and profile snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored event row from the `events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Auto-increment row ID.
    pub id: i64,
    /// User the event concerns; `NULL` for scope-wide events.
    pub user_id: Option<Uuid>,
    /// Event type discriminator (e.g. `"points_awarded"`).
    pub event_type: String,
    /// JSONB payload with event-specific data.
    pub payload: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A profile snapshot row from the `profile_snapshots` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// Auto-increment row ID.
    pub id: i64,
    /// User that was snapshotted.
    pub user_id: Uuid,
    /// Full profile state as JSONB.
    pub state_json: serde_json::Value,
    /// Snapshot timestamp.
    pub snapshot_at: DateTime<Utc>,
}
