//! Tempo-correction HTTP route.
//!
//! Accepts encoded audio bytes, returns the same material stretched to the
//! requested BPM. Stateless; independent of the derivation core.

use axum::{
    body::Bytes,
    extract::Query,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use tracing::warn;

use crate::server::metrics;
use crate::server::state::ServerState;
use crate::tempo::{correct_tempo, TempoError};

#[derive(Debug, Deserialize)]
pub struct TempoQuery {
    pub target_bpm: f64,
    #[serde(default)]
    pub source_bpm: Option<f64>,
}

/// POST /api/tempo/correct?target_bpm=140&source_bpm=120
async fn correct(Query(query): Query<TempoQuery>, body: Bytes) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty audio body").into_response();
    }
    match correct_tempo(&body, query.target_bpm, query.source_bpm).await {
        Ok(audio) => {
            metrics::TEMPO_CORRECTIONS_TOTAL.inc();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "audio/mpeg")],
                audio,
            )
                .into_response()
        }
        Err(TempoError::InvalidBpm(bpm)) => {
            (StatusCode::BAD_REQUEST, format!("invalid BPM: {}", bpm)).into_response()
        }
        Err(TempoError::InvalidRatio(ratio)) => (
            StatusCode::BAD_REQUEST,
            format!("stretch ratio {} is out of range", ratio),
        )
            .into_response(),
        Err(err) => {
            warn!("Tempo correction failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Tempo correction failed").into_response()
        }
    }
}

pub fn make_tempo_routes() -> Router<ServerState> {
    Router::new().route("/api/tempo/correct", post(correct))
}
