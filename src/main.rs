//! merit-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use merit_gateway::api;
use merit_gateway::app_state::AppState;
use merit_gateway::config::EngineConfig;
use merit_gateway::domain::{BadgeCatalog, CourseCatalog, EventBus, InMemoryCatalog};
use merit_gateway::persistence::PostgresPersistence;
use merit_gateway::persistence::postgres::{run_event_log, run_snapshot_loop};
use merit_gateway::service::GamificationService;
use merit_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = EngineConfig::from_env().map_err(|e| anyhow::anyhow!("config: {e}"))?;
    tracing::info!(addr = %config.listen_addr, "starting merit-gateway");

    // Badge catalog: file when configured, built-in starter set otherwise
    let badges = match &config.badge_catalog_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            BadgeCatalog::from_json(&raw)?
        }
        None => BadgeCatalog::with_defaults(),
    };

    // Course catalog boundary: seeded in-memory stand-in for the catalog
    // services this gateway consumes
    let catalog: Arc<dyn CourseCatalog> = match &config.course_seed_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Arc::new(InMemoryCatalog::from_json(&raw)?)
        }
        None => Arc::new(InMemoryCatalog::new()),
    };

    // Build the engine
    let event_bus = EventBus::new(config.event_bus_capacity);
    let gamification = Arc::new(GamificationService::new(
        catalog,
        badges,
        event_bus.clone(),
    ));

    // Durable event log + profile snapshots
    if config.persistence_enabled {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => match sqlx::migrate!("./migrations").run(&pool).await {
                Ok(()) => {
                    let persistence = PostgresPersistence::new(pool);
                    tokio::spawn(run_event_log(persistence.clone(), event_bus.subscribe()));
                    tokio::spawn(run_snapshot_loop(
                        persistence,
                        Arc::clone(&gamification),
                        config.snapshot_interval_secs,
                    ));
                    tracing::info!("persistence enabled");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "migrations failed; continuing without persistence");
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "database unreachable; continuing without persistence");
            }
        }
    }

    // Build application state and router
    let app_state = AppState::new(gamification);
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
