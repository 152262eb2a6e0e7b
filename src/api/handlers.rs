//! API Handlers
//!
//! HTTP request handlers for each lookup server endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::config::Config;
use crate::error::{LookupError, Result};
use crate::event::Event;
use crate::lookup::{CachedLookupEngine, CommandRunner, Runner};
use crate::models::{HealthResponse, LookupRequest, StatsResponse};

/// Application state shared across all handlers.
///
/// The engine is internally synchronized, so it is shared behind a plain Arc.
#[derive(Clone)]
pub struct AppState {
    /// Lookup engine
    pub engine: Arc<CachedLookupEngine>,
}

impl AppState {
    /// Creates a new AppState around the given engine.
    pub fn new(engine: CachedLookupEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Lookups are served by the configured external command.
    pub fn from_config(config: &Config) -> Result<Self> {
        let runner: Arc<dyn Runner> = Arc::new(
            CommandRunner::new(config.command.clone(), config.command_args.clone())
                .with_key_fields(config.command_key.clone()),
        );
        let engine = CachedLookupEngine::new(config.lookup.clone(), runner)?;
        Ok(Self::new(engine))
    }
}

/// Handler for POST /lookup
///
/// Runs the submitted event through the engine and returns it, enriched
/// when the lookup succeeded and unmodified otherwise.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<Event>> {
    let event = req.into_event()?;

    // Runners block (and may spawn processes), keep them off the async workers
    let engine = Arc::clone(&state.engine);
    let enriched = tokio::task::spawn_blocking(move || engine.run(event))
        .await
        .map_err(|e| LookupError::Internal(format!("lookup task failed: {}", e)))?;

    Ok(Json(enriched))
}

/// Handler for GET /stats
///
/// Returns current engine and cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.engine.stats()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
