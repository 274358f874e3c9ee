//! Leaderboard scopes, entries, and the full-recompute ranking table.
//!
//! Ranking is deliberately a full sort-and-rewrite per scope: correctness
//! over efficiency. The table sits behind its own type so the strategy can
//! later be swapped for an incremental structure without touching callers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::{CourseId, UserId};

/// Which competition a leaderboard entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum LeaderboardScope {
    /// All users, all time.
    Global,
    /// Users enrolled in one course.
    Course {
        /// The course the board ranks.
        course_id: CourseId,
    },
    /// The resettable periodic competition (reset by an administrator; there
    /// is no background scheduler).
    Periodic,
}

impl LeaderboardScope {
    /// Returns a short label for logging.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Course { .. } => "course",
            Self::Periodic => "periodic",
        }
    }
}

/// One user's row within a scope.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    /// The ranked user.
    pub user_id: UserId,
    /// Points snapshot taken at the last upsert.
    pub points: i64,
    /// Dense rank, 1-based. Zero until the first recompute.
    pub rank: u32,
    /// When this user first entered the scope. Tie-break key: at equal
    /// points, the earlier entrant ranks higher.
    pub first_entered_at: DateTime<Utc>,
    /// Last upsert timestamp.
    pub updated_at: DateTime<Utc>,
}

/// All leaderboard entries, keyed by scope.
///
/// `upsert` records a points snapshot; `recompute` rewrites the whole scope
/// with dense ranks 1..N. Recompute reads a point-in-time snapshot and may
/// lag concurrent balance updates — the ledger stays the source of truth.
#[derive(Debug, Default)]
pub struct LeaderboardTable {
    scopes: RwLock<HashMap<LeaderboardScope, HashMap<UserId, LeaderboardEntry>>>,
}

impl LeaderboardTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites the user's entry in a scope with a fresh
    /// points snapshot. Rank is untouched until the next [`Self::recompute`].
    pub async fn upsert(&self, scope: LeaderboardScope, user_id: UserId, points: i64) {
        let now = Utc::now();
        let mut scopes = self.scopes.write().await;
        let entries = scopes.entry(scope).or_default();
        entries
            .entry(user_id)
            .and_modify(|e| {
                e.points = points;
                e.updated_at = now;
            })
            .or_insert(LeaderboardEntry {
                user_id,
                points,
                rank: 0,
                first_entered_at: now,
                updated_at: now,
            });
    }

    /// Rewrites every rank in the scope: sort by points descending, assign
    /// dense ranks 1..N. Ties order by earlier `first_entered_at`, then by
    /// user id, so the result is fully deterministic.
    ///
    /// Returns the number of ranked entries.
    pub async fn recompute(&self, scope: LeaderboardScope) -> usize {
        let mut scopes = self.scopes.write().await;
        let Some(entries) = scopes.get_mut(&scope) else {
            return 0;
        };

        let mut ordered: Vec<UserId> = entries.keys().copied().collect();
        ordered.sort_by(|a, b| {
            let ea = entries.get(a);
            let eb = entries.get(b);
            match (ea, eb) {
                (Some(ea), Some(eb)) => eb
                    .points
                    .cmp(&ea.points)
                    .then(ea.first_entered_at.cmp(&eb.first_entered_at))
                    .then(ea.user_id.cmp(&eb.user_id)),
                _ => std::cmp::Ordering::Equal,
            }
        });

        for (index, user_id) in ordered.iter().enumerate() {
            if let Some(entry) = entries.get_mut(user_id) {
                entry.rank = u32::try_from(index + 1).unwrap_or(u32::MAX);
            }
        }
        ordered.len()
    }

    /// Returns the top `limit` entries of a scope, ordered by rank.
    pub async fn top(&self, scope: LeaderboardScope, limit: usize) -> Vec<LeaderboardEntry> {
        let scopes = self.scopes.read().await;
        let mut entries: Vec<_> = scopes
            .get(&scope)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by_key(|e| e.rank);
        entries.truncate(limit);
        entries
    }

    /// Removes every entry in a scope (periodic reset).
    ///
    /// Returns the number of removed entries.
    pub async fn reset(&self, scope: LeaderboardScope) -> usize {
        let mut scopes = self.scopes.write().await;
        scopes.remove(&scope).map(|m| m.len()).unwrap_or(0)
    }

    /// Returns the number of entries in a scope.
    pub async fn len(&self, scope: LeaderboardScope) -> usize {
        let scopes = self.scopes.read().await;
        scopes.get(&scope).map(HashMap::len).unwrap_or(0)
    }

    /// Returns `true` if the scope has no entries.
    pub async fn is_empty(&self, scope: LeaderboardScope) -> bool {
        self.len(scope).await == 0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    async fn ranked_table(points: &[i64]) -> (LeaderboardTable, Vec<UserId>) {
        let table = LeaderboardTable::new();
        let mut users = Vec::new();
        for p in points {
            let user = UserId::new();
            table.upsert(LeaderboardScope::Global, user, *p).await;
            users.push(user);
        }
        table.recompute(LeaderboardScope::Global).await;
        (table, users)
    }

    #[tokio::test]
    async fn ranks_are_a_dense_permutation() {
        let (table, _) = ranked_table(&[300, 100, 200, 100, 50]).await;
        let top = table.top(LeaderboardScope::Global, 100).await;

        let mut ranks: Vec<u32> = top.iter().map(|e| e.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn points_non_increasing_by_rank() {
        let (table, _) = ranked_table(&[10, 500, 250, 250, 99]).await;
        let top = table.top(LeaderboardScope::Global, 100).await;
        for pair in top.windows(2) {
            let (Some(a), Some(b)) = (pair.first(), pair.get(1)) else {
                panic!("window of two");
            };
            assert!(a.points >= b.points);
        }
    }

    #[tokio::test]
    async fn ties_break_by_first_entered() {
        let table = LeaderboardTable::new();
        let early = UserId::new();
        let late = UserId::new();
        table.upsert(LeaderboardScope::Global, early, 100).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        table.upsert(LeaderboardScope::Global, late, 100).await;
        table.recompute(LeaderboardScope::Global).await;

        let top = table.top(LeaderboardScope::Global, 2).await;
        assert_eq!(top.first().map(|e| e.user_id), Some(early));
        assert_eq!(top.get(1).map(|e| e.user_id), Some(late));
    }

    #[tokio::test]
    async fn upsert_overwrites_points_keeps_first_entered() {
        let table = LeaderboardTable::new();
        let user = UserId::new();
        table.upsert(LeaderboardScope::Global, user, 10).await;
        let before = table.top(LeaderboardScope::Global, 1).await;
        table.upsert(LeaderboardScope::Global, user, 90).await;
        let after = table.top(LeaderboardScope::Global, 1).await;

        assert_eq!(after.first().map(|e| e.points), Some(90));
        assert_eq!(
            before.first().map(|e| e.first_entered_at),
            after.first().map(|e| e.first_entered_at)
        );
        assert_eq!(table.len(LeaderboardScope::Global).await, 1);
    }

    #[tokio::test]
    async fn scopes_are_independent() {
        let table = LeaderboardTable::new();
        let user = UserId::new();
        let course = LeaderboardScope::Course {
            course_id: CourseId::new(),
        };
        table.upsert(LeaderboardScope::Global, user, 10).await;
        table.upsert(course, user, 10).await;

        assert_eq!(table.len(LeaderboardScope::Global).await, 1);
        assert_eq!(table.len(course).await, 1);
        assert!(table.is_empty(LeaderboardScope::Periodic).await);
    }

    #[tokio::test]
    async fn reset_clears_scope() {
        let table = LeaderboardTable::new();
        table
            .upsert(LeaderboardScope::Periodic, UserId::new(), 10)
            .await;
        assert_eq!(table.reset(LeaderboardScope::Periodic).await, 1);
        assert!(table.is_empty(LeaderboardScope::Periodic).await);
    }

    #[tokio::test]
    async fn recompute_empty_scope_is_zero() {
        let table = LeaderboardTable::new();
        assert_eq!(table.recompute(LeaderboardScope::Global).await, 0);
    }
}
