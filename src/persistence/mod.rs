//! Persistence layer: PostgreSQL event log and profile snapshots.
//!
//! The in-memory stores are authoritative for request handling; this layer
//! is the durable audit trail. It subscribes to the event bus and appends
//! every [`crate::domain::GamificationEvent`] to the `events` table, and
//! periodically snapshots all profiles. A persistence outage is logged and
//! never blocks or fails the operation that triggered the event.

pub mod models;
pub mod postgres;

pub use postgres::PostgresPersistence;
