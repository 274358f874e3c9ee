//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams gamification events (awards,
//! badges, streaks, leaderboard updates) filtered by subscribed user ids.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
