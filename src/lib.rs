//! # merit-gateway
//!
//! REST API and WebSocket gateway for an e-learning gamification and
//! progress-scoring engine.
//!
//! The engine is the interesting part of an otherwise conventional
//! e-learning backend: an append-only points ledger, login/course/quiz
//! streak state machines, a badge-eligibility rule evaluator, dense-rank
//! leaderboards, and quiz scoring with a post-failure cooldown. Courses,
//! enrollment, and identity are consumed read-only through the
//! [`domain::CourseCatalog`] boundary.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── GamificationService, QuizService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Ledger, Profiles, Badges, Attempts,
//!     │   Progress, Leaderboards (domain/)
//!     │
//!     └── PostgreSQL event log + snapshots (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
