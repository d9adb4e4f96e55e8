//! The synthesis collaborator: engine model, selection heuristic, and the
//! HTTP client for the external generation service.

mod client;
mod engine;
mod models;
mod selection;

pub use client::HttpSynthesisClient;
pub use engine::{Engine, EngineAvailability};
pub use models::{SynthesisRequest, SynthesizedClip};
pub use selection::{recommend_engine, SelectionContext};

use anyhow::Result;
use async_trait::async_trait;

use crate::library::SoundParameters;

/// The single capability the core consumes from any synthesis provider.
///
/// Failures are per-item to the derivation orchestrator: transient or
/// permanent, a failed call means "this variation failed" and nothing more.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    async fn generate(
        &self,
        engine: Engine,
        prompt: &str,
        parameters: &SoundParameters,
    ) -> Result<SynthesizedClip>;
}
