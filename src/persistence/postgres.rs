//! PostgreSQL implementation of the persistence layer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::models::{ProfileSnapshot, StoredEvent};
use crate::domain::GamificationEvent;
use crate::error::EngineError;
use crate::service::GamificationService;

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an event to the event log.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn save_event(
        &self,
        user_id: Option<Uuid>,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, EngineError> {
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO events (user_id, event_type, payload) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(row)
    }

    /// Saves a profile snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn save_snapshot(
        &self,
        user_id: Uuid,
        state_json: &serde_json::Value,
    ) -> Result<i64, EngineError> {
        let row = sqlx::query_scalar::<_, i64>(
            "INSERT INTO profile_snapshots (user_id, state_json) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(state_json)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(row)
    }

    /// Loads the latest snapshot for each user using `DISTINCT ON`.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn load_latest_snapshots(&self) -> Result<Vec<ProfileSnapshot>, EngineError> {
        let rows = sqlx::query_as::<_, (i64, Uuid, serde_json::Value, DateTime<Utc>)>(
            "SELECT DISTINCT ON (user_id) id, user_id, state_json, snapshot_at \
             FROM profile_snapshots ORDER BY user_id, snapshot_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, state_json, snapshot_at)| ProfileSnapshot {
                id,
                user_id,
                state_json,
                snapshot_at,
            })
            .collect())
    }

    /// Loads events after the given timestamp, optionally filtered by user.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn load_events_after(
        &self,
        after: DateTime<Utc>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<StoredEvent>, EngineError> {
        let rows = if let Some(uid) = user_id {
            sqlx::query_as::<_, (i64, Option<Uuid>, String, serde_json::Value, DateTime<Utc>)>(
                "SELECT id, user_id, event_type, payload, created_at FROM events \
                 WHERE created_at > $1 AND user_id = $2 ORDER BY created_at ASC",
            )
            .bind(after)
            .bind(uid)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, (i64, Option<Uuid>, String, serde_json::Value, DateTime<Utc>)>(
                "SELECT id, user_id, event_type, payload, created_at FROM events \
                 WHERE created_at > $1 ORDER BY created_at ASC",
            )
            .bind(after)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, user_id, event_type, payload, created_at)| StoredEvent {
                    id,
                    user_id,
                    event_type,
                    payload,
                    created_at,
                },
            )
            .collect())
    }

    /// Deletes snapshots older than the given number of days.
    ///
    /// # Errors
    ///
    /// Returns a [`EngineError::PersistenceError`] on database failure.
    pub async fn delete_old_snapshots(&self, before_days: u64) -> Result<u64, EngineError> {
        let cutoff =
            Utc::now() - chrono::Duration::days(i64::try_from(before_days).unwrap_or(i64::MAX));

        let result = sqlx::query("DELETE FROM profile_snapshots WHERE snapshot_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| EngineError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

/// Drains the event bus into the `events` table until the bus closes.
///
/// Spawned as a background task at startup. Database errors are logged and
/// the loop continues: the triggering operation already succeeded and must
/// not be affected by a persistence outage.
pub async fn run_event_log(
    persistence: PostgresPersistence,
    mut rx: broadcast::Receiver<GamificationEvent>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let payload = serde_json::to_value(&event).unwrap_or_default();
                let user_id = event.user_id().map(|u| *u.as_uuid());
                if let Err(e) = persistence
                    .save_event(user_id, event.event_type_str(), &payload)
                    .await
                {
                    tracing::warn!(error = %e, "failed to persist event");
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "event log fell behind the bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Periodically snapshots every profile into `profile_snapshots`.
///
/// Spawned as a background task at startup; runs until the process exits.
pub async fn run_snapshot_loop(
    persistence: PostgresPersistence,
    gamification: std::sync::Arc<GamificationService>,
    interval_secs: u64,
) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        for profile in gamification.profiles().snapshot_all().await {
            let state = serde_json::to_value(&profile).unwrap_or_default();
            if let Err(e) = persistence
                .save_snapshot(*profile.user_id.as_uuid(), &state)
                .await
            {
                tracing::warn!(user_id = %profile.user_id, error = %e, "failed to persist snapshot");
            }
        }
    }
}
