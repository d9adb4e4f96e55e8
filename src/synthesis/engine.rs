//! The fixed set of synthesis engines and their availability.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One of the synthesis engines the studio can route a generation to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    /// Voice and speech material.
    Vocals,
    /// Tight percussion loops up to ~22 seconds.
    DrumLoopShort,
    /// Percussion loops in the 22-30 second range.
    DrumLoopStandard,
    /// Percussion material past 30 seconds.
    DrumLoopExtended,
    /// Re-synthesis from supplied reference audio.
    Resample,
    /// Short one-shot effects.
    SfxBurst,
    /// Longer cinematic effects.
    SfxCinematic,
    /// Ambient beds and textures.
    AmbientTexture,
    /// Long-form material past 30 seconds.
    LongForm,
    /// General-purpose instrumental generation.
    Instrumental,
}

impl Engine {
    pub const ALL: &'static [Engine] = &[
        Engine::Vocals,
        Engine::DrumLoopShort,
        Engine::DrumLoopStandard,
        Engine::DrumLoopExtended,
        Engine::Resample,
        Engine::SfxBurst,
        Engine::SfxCinematic,
        Engine::AmbientTexture,
        Engine::LongForm,
        Engine::Instrumental,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Vocals => "vocals",
            Engine::DrumLoopShort => "drum-loop-short",
            Engine::DrumLoopStandard => "drum-loop-standard",
            Engine::DrumLoopExtended => "drum-loop-extended",
            Engine::Resample => "resample",
            Engine::SfxBurst => "sfx-burst",
            Engine::SfxCinematic => "sfx-cinematic",
            Engine::AmbientTexture => "ambient-texture",
            Engine::LongForm => "long-form",
            Engine::Instrumental => "instrumental",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Engine::ALL.iter().copied().find(|e| e.as_str() == s)
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which engines are currently usable. Built from configuration at startup;
/// the selection heuristic consults it when walking fallback chains.
#[derive(Debug, Clone, Default)]
pub struct EngineAvailability {
    disabled: HashSet<Engine>,
}

impl EngineAvailability {
    /// Every engine available.
    pub fn all_available() -> Self {
        Self::default()
    }

    pub fn with_disabled<I: IntoIterator<Item = Engine>>(disabled: I) -> Self {
        Self {
            disabled: disabled.into_iter().collect(),
        }
    }

    pub fn is_available(&self, engine: Engine) -> bool {
        !self.disabled.contains(&engine)
    }
}
