//! Append-only points ledger.
//!
//! [`PointsLedger`] is the source of truth for point balances. Entries are
//! appended, never mutated or deleted; the cached balance on a
//! [`super::GamificationProfile`] must always equal the sum of the user's
//! entries here.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::UserId;
use super::transaction::PointsTransaction;

/// In-memory append-only transaction log, bucketed per user.
///
/// Appending is a pure insert and safe to run concurrently for any mix of
/// users. Serializing the read-modify-write of the *aggregate* balance is
/// the profile registry's job, not the ledger's.
#[derive(Debug, Default)]
pub struct PointsLedger {
    entries: RwLock<HashMap<UserId, Vec<PointsTransaction>>>,
}

impl PointsLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transaction to the user's log.
    pub async fn append(&self, tx: PointsTransaction) {
        let mut map = self.entries.write().await;
        map.entry(tx.user_id).or_default().push(tx);
    }

    /// Returns the sum of all transaction amounts for a user.
    ///
    /// This is the authoritative balance; profiles cache it.
    pub async fn balance_of(&self, user_id: UserId) -> i64 {
        let map = self.entries.read().await;
        map.get(&user_id)
            .map(|txs| txs.iter().map(|t| t.amount).sum())
            .unwrap_or(0)
    }

    /// Returns the user's transactions, newest first.
    pub async fn history(&self, user_id: UserId) -> Vec<PointsTransaction> {
        let map = self.entries.read().await;
        let mut txs = map.get(&user_id).cloned().unwrap_or_default();
        txs.reverse();
        txs
    }

    /// Returns the number of entries recorded for a user.
    pub async fn count(&self, user_id: UserId) -> usize {
        let map = self.entries.read().await;
        map.get(&user_id).map(Vec::len).unwrap_or(0)
    }
}
