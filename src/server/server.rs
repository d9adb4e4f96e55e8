use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::info;

use axum::{middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::services::ServeDir;

use super::sound_routes::make_sound_routes;
use super::state::*;
use super::tempo_routes::make_tempo_routes;
use super::variation_routes::make_variation_routes;
use super::{log_requests, ServerConfig};
use crate::derivation::DerivationEngine;
use crate::synthesis::EngineAvailability;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub sounds: usize,
    pub lineages: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(axum::extract::State(state): axum::extract::State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        sounds: state.library.count(),
        lineages: state.lineages.count_lineages(),
    };
    Json(stats)
}

async fn health() -> impl IntoResponse {
    "ok"
}

/// Build the application router for the given state.
pub fn make_router(state: ServerState) -> Router {
    let mut router = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .merge(make_sound_routes())
        .merge(make_variation_routes())
        .merge(make_tempo_routes());

    if let Some(frontend_dir) = &state.config.frontend_dir_path {
        router = router.fallback_service(ServeDir::new(frontend_dir));
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

/// Run the studio server until ctrl-c.
pub async fn run_server(
    config: ServerConfig,
    library: SharedLibrary,
    lineages: SharedLineageStore,
    synthesis: SharedSynthesis,
    engines: EngineAvailability,
) -> Result<()> {
    let derivation = Arc::new(DerivationEngine::new(
        library.clone(),
        lineages.clone(),
        synthesis.clone(),
    ));

    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        library,
        lineages,
        synthesis,
        derivation,
        engines,
        hash: env!("GIT_HASH").to_string(),
    };

    let router = make_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Studio server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
