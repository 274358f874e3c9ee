//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{GamificationService, QuizService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Gamification engine: ledger, streaks, badges, leaderboards.
    pub gamification: Arc<GamificationService>,
    /// Quiz submission pipeline.
    pub quiz: QuizService,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires the application state from an engine instance.
    #[must_use]
    pub fn new(gamification: Arc<GamificationService>) -> Self {
        let event_bus = gamification.event_bus().clone();
        let quiz = QuizService::new(Arc::clone(&gamification));
        Self {
            gamification,
            quiz,
            event_bus,
        }
    }
}
