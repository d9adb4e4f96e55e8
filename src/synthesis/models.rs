//! Wire models for the external synthesis service.

use serde::{Deserialize, Serialize};

use super::engine::Engine;
use crate::library::SoundParameters;

/// Request body sent to the synthesis service.
#[derive(Debug, Serialize)]
pub struct SynthesisRequest<'a> {
    pub engine: Engine,
    pub prompt: &'a str,
    pub parameters: &'a SoundParameters,
}

/// A successfully synthesized clip.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesizedClip {
    pub audio_url: String,
    #[serde(default)]
    pub provenance_id: Option<String>,
}
