use axum::extract::FromRef;

use crate::derivation::DerivationEngine;
use crate::library::SoundLibrary;
use crate::lineage::LineageStore;
use crate::synthesis::{EngineAvailability, SynthesisBackend};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type SharedLibrary = Arc<dyn SoundLibrary>;
pub type SharedLineageStore = Arc<dyn LineageStore>;
pub type SharedSynthesis = Arc<dyn SynthesisBackend>;
pub type SharedDerivationEngine = Arc<DerivationEngine>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub library: SharedLibrary,
    pub lineages: SharedLineageStore,
    pub synthesis: SharedSynthesis,
    pub derivation: SharedDerivationEngine,
    pub engines: EngineAvailability,
    pub hash: String,
}

impl FromRef<ServerState> for SharedLibrary {
    fn from_ref(input: &ServerState) -> Self {
        input.library.clone()
    }
}

impl FromRef<ServerState> for SharedLineageStore {
    fn from_ref(input: &ServerState) -> Self {
        input.lineages.clone()
    }
}

impl FromRef<ServerState> for SharedSynthesis {
    fn from_ref(input: &ServerState) -> Self {
        input.synthesis.clone()
    }
}

impl FromRef<ServerState> for SharedDerivationEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.derivation.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for EngineAvailability {
    fn from_ref(input: &ServerState) -> Self {
        input.engines.clone()
    }
}
