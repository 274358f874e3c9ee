//! Per-connection subscription manager.
//!
//! Tracks which user ids a WebSocket client is subscribed to and provides
//! server-side event filtering.

use std::collections::HashSet;

use crate::domain::UserId;

/// Manages the set of user subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed user IDs. If `subscribe_all` is true, this set is ignored.
    user_ids: HashSet<UserId>,
    /// Whether the client subscribes to all users (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds user IDs to the subscription set. `"*"` enables the wildcard.
    pub fn subscribe(&mut self, ids: &[UserId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        for id in ids {
            self.user_ids.insert(*id);
        }
    }

    /// Removes user IDs from the subscription set.
    pub fn unsubscribe(&mut self, ids: &[UserId]) {
        for id in ids {
            self.user_ids.remove(id);
        }
    }

    /// Returns `true` if an event for the given user matches the filter.
    ///
    /// Scope-wide events (`None`) are delivered to wildcard subscribers
    /// only.
    #[must_use]
    pub fn matches(&self, user_id: Option<UserId>) -> bool {
        match user_id {
            Some(id) => self.subscribe_all || self.user_ids.contains(&id),
            None => self.subscribe_all,
        }
    }

    /// Returns the number of explicitly subscribed user IDs.
    #[must_use]
    pub fn count(&self) -> usize {
        self.user_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
