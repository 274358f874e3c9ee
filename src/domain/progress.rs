//! Per-course completion progress derived from quiz results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::{CourseId, UserId};

/// One user's progress through one course.
#[derive(Debug, Clone, Serialize)]
pub struct CourseProgress {
    /// The learner.
    pub user_id: UserId,
    /// The course.
    pub course_id: CourseId,
    /// Completion percentage, 0–100.
    pub percent: u32,
    /// Whether the course has been completed. Never unset.
    pub completed: bool,
    /// Certificate reference, issued once on completion.
    pub certificate: Option<String>,
    /// Last time the quiz pipeline touched this record.
    pub last_activity: DateTime<Utc>,
}

impl CourseProgress {
    /// Creates a fresh zero-percent record.
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            user_id,
            course_id,
            percent: 0,
            completed: false,
            certificate: None,
            last_activity: Utc::now(),
        }
    }
}

/// Upsert store of per-(user, course) progress records.
#[derive(Debug, Default)]
pub struct ProgressStore {
    rows: RwLock<HashMap<(UserId, CourseId), CourseProgress>>,
}

impl ProgressStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the progress record for a (user, course) pair, if any.
    pub async fn get(&self, user_id: UserId, course_id: CourseId) -> Option<CourseProgress> {
        let rows = self.rows.read().await;
        rows.get(&(user_id, course_id)).cloned()
    }

    /// Creates or replaces a progress record.
    pub async fn upsert(&self, progress: CourseProgress) {
        let mut rows = self.rows.write().await;
        rows.insert((progress.user_id, progress.course_id), progress);
    }

    /// Counts the courses a user has completed.
    pub async fn completed_count(&self, user_id: UserId) -> usize {
        let rows = self.rows.read().await;
        rows.values()
            .filter(|p| p.user_id == user_id && p.completed)
            .count()
    }

    /// Returns all progress records for a user.
    pub async fn for_user(&self, user_id: UserId) -> Vec<CourseProgress> {
        let rows = self.rows.read().await;
        rows.values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_existing() {
        let store = ProgressStore::new();
        let user = UserId::new();
        let course = CourseId::new();

        let mut progress = CourseProgress::new(user, course);
        progress.percent = 50;
        store.upsert(progress.clone()).await;

        progress.percent = 100;
        progress.completed = true;
        store.upsert(progress).await;

        let fetched = store.get(user, course).await;
        assert_eq!(fetched.as_ref().map(|p| p.percent), Some(100));
        assert_eq!(fetched.map(|p| p.completed), Some(true));
    }

    #[tokio::test]
    async fn completed_count_only_counts_owner() {
        let store = ProgressStore::new();
        let user = UserId::new();

        let mut done = CourseProgress::new(user, CourseId::new());
        done.completed = true;
        store.upsert(done).await;
        store.upsert(CourseProgress::new(user, CourseId::new())).await;

        let mut other = CourseProgress::new(UserId::new(), CourseId::new());
        other.completed = true;
        store.upsert(other).await;

        assert_eq!(store.completed_count(user).await, 1);
        assert_eq!(store.for_user(user).await.len(), 2);
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = ProgressStore::new();
        assert!(store.get(UserId::new(), CourseId::new()).await.is_none());
    }
}
