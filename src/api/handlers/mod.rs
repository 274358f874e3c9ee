//! REST endpoint handlers organized by resource.

pub mod admin;
pub mod gamification;
pub mod leaderboard;
pub mod quiz;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(gamification::routes())
        .merge(quiz::routes())
        .merge(leaderboard::routes())
        .merge(admin::routes())
}
