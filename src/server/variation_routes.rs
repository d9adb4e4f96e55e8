//! Derivation HTTP routes.
//!
//! Provides endpoints for:
//! - Batch variation requests against a parent sound
//! - Lineage introspection (provenance display)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::derivation::{
    DerivationError, DerivationRequest, ParameterShifts, VariationStrategy,
};
use crate::library::SoundGeneration;
use crate::lineage::{Lineage, LineageNode, VariationType};
use crate::server::metrics;
use crate::server::state::{ServerState, SharedLineageStore};
use crate::synthesis::{recommend_engine, Engine, SelectionContext};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct VariationRequestBody {
    pub variation_type: VariationType,
    #[serde(default = "default_count")]
    pub count: usize,
    /// Explicit engine choice; when absent the selection heuristic runs on
    /// the parent's prompt.
    #[serde(default)]
    pub engine: Option<Engine>,

    // Strategy-specific fields
    #[serde(default)]
    pub parameter_shifts: Option<ParameterShifts>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub evolution_strength: Option<f32>,
    #[serde(default)]
    pub mutation_rate: Option<f32>,
    #[serde(default)]
    pub preserve_core: Option<bool>,
    #[serde(default)]
    pub combine_with_sound_id: Option<String>,
}

fn default_count() -> usize {
    1
}

#[derive(Debug, Serialize)]
pub struct VariationResponse {
    pub sounds: Vec<SoundGeneration>,
    pub lineage_id: String,
    pub generation: u32,
    pub requested: usize,
    pub produced: usize,
}

#[derive(Debug, Serialize)]
pub struct LineageView {
    pub lineage: Lineage,
    pub node: LineageNode,
    /// Ancestor sound ids, nearest-first.
    pub ancestors: Vec<String>,
    /// All transitive descendants, breadth-first.
    pub descendants: Vec<String>,
}

/// Map the request body's flat strategy fields to a strategy value.
fn strategy_from_body(body: &VariationRequestBody) -> Result<VariationStrategy, String> {
    match body.variation_type {
        VariationType::Root => Err("cannot derive a 'root' variation".to_string()),
        VariationType::ParameterShift => Ok(VariationStrategy::ParameterShift(
            body.parameter_shifts
                .ok_or("parameter_shift requires parameter_shifts")?,
        )),
        VariationType::StyleTransfer => Ok(VariationStrategy::StyleTransfer {
            style: body
                .style
                .clone()
                .ok_or("style_transfer requires style")?,
        }),
        VariationType::Evolve => Ok(VariationStrategy::Evolve {
            evolution_strength: body
                .evolution_strength
                .ok_or("evolve requires evolution_strength")?,
        }),
        VariationType::Mutate => Ok(VariationStrategy::Mutate {
            mutation_rate: body.mutation_rate.ok_or("mutate requires mutation_rate")?,
            preserve_core: body.preserve_core.unwrap_or(false),
        }),
        VariationType::Combine => Ok(VariationStrategy::Combine {
            with_sound_id: body
                .combine_with_sound_id
                .clone()
                .ok_or("combine requires combine_with_sound_id")?,
        }),
    }
}

fn derivation_error_response(err: DerivationError) -> Response {
    match err {
        DerivationError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        DerivationError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
        DerivationError::BatchExhausted { requested } => (
            StatusCode::BAD_GATEWAY,
            format!("all {} requested variations failed", requested),
        )
            .into_response(),
        DerivationError::Inconsistency(msg) => {
            warn!("Lineage store inconsistency: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
        }
        DerivationError::Internal(err) => {
            warn!("Derivation infrastructure error: {:#}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/sounds/{id}/variations
async fn derive_variations(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(body): Json<VariationRequestBody>,
) -> Response {
    let strategy = match strategy_from_body(&body) {
        Ok(strategy) => strategy,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };

    // The heuristic runs here, not in the orchestrator: it needs the
    // parent's prompt, and an explicit engine in the request wins.
    let engine = match body.engine {
        Some(engine) => engine,
        None => match state.library.get(&id) {
            Ok(Some(parent)) => recommend_engine(
                &parent.prompt,
                &SelectionContext {
                    duration_seconds: parent.parameters.length_seconds,
                    has_reference_audio: false,
                },
                &state.engines,
            ),
            Ok(None) => {
                return (StatusCode::NOT_FOUND, format!("sound {} not found", id)).into_response()
            }
            Err(err) => {
                return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
            }
        },
    };

    let request = DerivationRequest {
        parent_sound_id: id,
        strategy,
        count: body.count,
        engine,
    };
    match state.derivation.derive_variations(request).await {
        Ok(outcome) => {
            let produced = outcome.sounds.len();
            metrics::VARIATIONS_PRODUCED_TOTAL.inc_by(produced as f64);
            metrics::VARIATIONS_FAILED_TOTAL.inc_by((outcome.requested - produced) as f64);
            metrics::LIBRARY_SOUNDS_TOTAL.set(state.library.count() as f64);
            metrics::LINEAGES_TOTAL.set(state.lineages.count_lineages() as f64);
            metrics::LINEAGE_NODES_TOTAL.set(state.lineages.count_nodes() as f64);
            Json(VariationResponse {
                sounds: outcome.sounds,
                lineage_id: outcome.lineage_id,
                generation: outcome.generation,
                requested: outcome.requested,
                produced,
            })
            .into_response()
        }
        Err(err) => {
            if let DerivationError::BatchExhausted { requested } = &err {
                metrics::VARIATIONS_FAILED_TOTAL.inc_by(*requested as f64);
            }
            derivation_error_response(err)
        }
    }
}

/// GET /api/sounds/{id}/lineage - Provenance view for one sound
async fn get_lineage_view(State(state): State<ServerState>, Path(id): Path<String>) -> Response {
    let node = match state.lineages.get_node_for_sound(&id) {
        Ok(Some(node)) => node,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                format!("sound {} has no lineage node", id),
            )
                .into_response()
        }
        Err(err) => return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    };
    let lineage = match state.lineages.get_lineage(&node.lineage_id) {
        Ok(Some(lineage)) => lineage,
        Ok(None) => {
            warn!(
                "Node for sound {} references missing lineage {}",
                id, node.lineage_id
            );
            return (StatusCode::INTERNAL_SERVER_ERROR, "broken lineage reference").into_response();
        }
        Err(err) => return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    };
    let ancestors = match state.derivation.ancestors(&id) {
        Ok(ancestors) => ancestors,
        Err(err) => return derivation_error_response(err),
    };
    let descendants = match state.derivation.descendants(&id) {
        Ok(descendants) => descendants,
        Err(err) => return derivation_error_response(err),
    };
    Json(LineageView {
        lineage,
        node,
        ancestors,
        descendants,
    })
    .into_response()
}

/// GET /api/lineages
async fn list_lineages(State(lineages): State<SharedLineageStore>) -> Response {
    match lineages.get_all_lineages() {
        Ok(all) => Json(all).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response(),
    }
}

pub fn make_variation_routes() -> Router<ServerState> {
    Router::new()
        .route("/api/sounds/{id}/variations", post(derive_variations))
        .route("/api/sounds/{id}/lineage", get(get_lineage_view))
        .route("/api/lineages", get(list_lineages))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_body() -> VariationRequestBody {
        VariationRequestBody {
            variation_type: VariationType::Evolve,
            count: 3,
            engine: None,
            parameter_shifts: None,
            style: None,
            evolution_strength: Some(0.3),
            mutation_rate: None,
            preserve_core: None,
            combine_with_sound_id: None,
        }
    }

    #[test]
    fn test_strategy_from_body_maps_fields() {
        let strategy = strategy_from_body(&base_body()).unwrap();
        assert!(matches!(
            strategy,
            VariationStrategy::Evolve {
                evolution_strength
            } if evolution_strength == 0.3
        ));
    }

    #[test]
    fn test_strategy_from_body_missing_field_errors() {
        let body = VariationRequestBody {
            variation_type: VariationType::Combine,
            combine_with_sound_id: None,
            ..base_body()
        };
        assert!(strategy_from_body(&body).is_err());
    }

    #[test]
    fn test_strategy_from_body_rejects_root() {
        let body = VariationRequestBody {
            variation_type: VariationType::Root,
            ..base_body()
        };
        assert!(strategy_from_body(&body).is_err());
    }
}
