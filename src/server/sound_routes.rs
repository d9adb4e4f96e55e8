//! Sound library HTTP routes.
//!
//! Provides endpoints for:
//! - Direct generation (prompt + parameters -> new library record)
//! - Library browsing and metadata patches
//! - Engine recommendation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::library::{GenerationStatus, SoundGeneration, SoundParameters, SoundPatch};
use crate::server::metrics;
use crate::server::state::{ServerState, SharedLibrary};
use crate::synthesis::{recommend_engine, Engine, EngineAvailability, SelectionContext};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSoundBody {
    pub prompt: String,
    pub parameters: SoundParameters,
    /// Explicit engine choice; when absent the selection heuristic decides.
    #[serde(default)]
    pub engine: Option<Engine>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct RecommendBody {
    pub prompt: String,
    #[serde(default)]
    pub duration_seconds: f32,
    #[serde(default)]
    pub has_reference_audio: bool,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub engine: Engine,
}

#[derive(Debug, Serialize)]
pub struct CreateSoundResponse {
    pub sound: SoundGeneration,
    pub engine: Engine,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/sounds - Generate a new sound from scratch
async fn create_sound(State(state): State<ServerState>, Json(body): Json<CreateSoundBody>) -> Response {
    if body.prompt.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "prompt must not be empty").into_response();
    }
    if body.parameters.length_seconds <= 0.0 {
        return (StatusCode::BAD_REQUEST, "length_seconds must be positive").into_response();
    }

    let engine = body.engine.unwrap_or_else(|| {
        recommend_engine(
            &body.prompt,
            &SelectionContext {
                duration_seconds: body.parameters.length_seconds,
                has_reference_audio: false,
            },
            &state.engines,
        )
    });

    let clip = match state
        .synthesis
        .generate(engine, &body.prompt, &body.parameters)
        .await
    {
        Ok(clip) => {
            metrics::SYNTHESIS_REQUESTS_TOTAL
                .with_label_values(&[engine.as_str(), "ok"])
                .inc();
            clip
        }
        Err(err) => {
            metrics::SYNTHESIS_REQUESTS_TOTAL
                .with_label_values(&[engine.as_str(), "error"])
                .inc();
            warn!("Direct generation on engine {} failed: {:#}", engine, err);
            return (StatusCode::BAD_GATEWAY, "Synthesis failed").into_response();
        }
    };

    let record = SoundGeneration {
        id: uuid::Uuid::new_v4().to_string(),
        prompt: body.prompt,
        created_at: chrono::Utc::now().timestamp(),
        parameters: body.parameters,
        audio_url: Some(clip.audio_url),
        status: GenerationStatus::Ready,
        provenance_id: clip.provenance_id,
        variant_of: None,
        name: None,
        collection: None,
    };
    match state.library.save(record) {
        Ok(sound) => {
            metrics::LIBRARY_SOUNDS_TOTAL.set(state.library.count() as f64);
            Json(CreateSoundResponse { sound, engine }).into_response()
        }
        Err(err) => {
            warn!("Failed to save generated sound: {:#}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save sound").into_response()
        }
    }
}

/// GET /api/sounds - Most recent sounds
async fn list_sounds(
    State(library): State<SharedLibrary>,
    Query(query): Query<ListQuery>,
) -> Response {
    match library.list_recent(query.limit) {
        Ok(sounds) => Json(sounds).into_response(),
        Err(err) => {
            warn!("Failed to list sounds: {:#}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list sounds").into_response()
        }
    }
}

/// GET /api/sounds/{id}
async fn get_sound(State(library): State<SharedLibrary>, Path(id): Path<String>) -> Response {
    match library.get(&id) {
        Ok(Some(sound)) => Json(sound).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

/// PATCH /api/sounds/{id} - Library-side metadata patch
async fn patch_sound(
    State(library): State<SharedLibrary>,
    Path(id): Path<String>,
    Json(body): Json<SoundPatch>,
) -> Response {
    match library.get(&id) {
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    }
    match library.update(&id, &body) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            warn!("Failed to patch sound {}: {:#}", id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to patch sound").into_response()
        }
    }
}

/// POST /api/engines/recommend - Run the engine-selection heuristic
async fn recommend(
    State(engines): State<EngineAvailability>,
    Json(body): Json<RecommendBody>,
) -> Response {
    let engine = recommend_engine(
        &body.prompt,
        &SelectionContext {
            duration_seconds: body.duration_seconds,
            has_reference_audio: body.has_reference_audio,
        },
        &engines,
    );
    Json(RecommendResponse { engine }).into_response()
}

pub fn make_sound_routes() -> Router<ServerState> {
    Router::new()
        .route("/api/sounds", post(create_sound).get(list_sounds))
        .route("/api/sounds/{id}", get(get_sound).patch(patch_sound))
        .route("/api/engines/recommend", post(recommend))
}
