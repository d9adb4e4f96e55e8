//! Data models for the sound library.
//!
//! Defines the semantic parameter vector shared by all sounds and the
//! generation records stored in the library.

use serde::{Deserialize, Serialize};

/// Upper bound of the 0-100 parameter scales.
pub const SCALE_MAX: u8 = 100;

/// Accepted BPM range for generated material.
pub const BPM_MIN: u16 = 20;
pub const BPM_MAX: u16 = 300;

/// Semantic category of a generated sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundType {
    Fx,
    Ambience,
    Ui,
    Foley,
    Melody,
    Bass,
    Percussion,
}

impl SoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundType::Fx => "fx",
            SoundType::Ambience => "ambience",
            SoundType::Ui => "ui",
            SoundType::Foley => "foley",
            SoundType::Melody => "melody",
            SoundType::Bass => "bass",
            SoundType::Percussion => "percussion",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fx" => Some(SoundType::Fx),
            "ambience" => Some(SoundType::Ambience),
            "ui" => Some(SoundType::Ui),
            "foley" => Some(SoundType::Foley),
            "melody" => Some(SoundType::Melody),
            "bass" => Some(SoundType::Bass),
            "percussion" => Some(SoundType::Percussion),
            _ => None,
        }
    }
}

/// Status of a sound generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Ready,   // terminal
    Error,   // terminal
}

impl GenerationStatus {
    /// Returns true if this is a terminal state (Ready or Error).
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Ready | GenerationStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Ready => "ready",
            GenerationStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(GenerationStatus::Pending),
            "ready" => Some(GenerationStatus::Ready),
            "error" => Some(GenerationStatus::Error),
            _ => None,
        }
    }
}

/// The semantic parameter vector driving a generation.
///
/// Value type: never mutated in place once a sound is produced. Derivation
/// strategies build fresh vectors from a parent's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundParameters {
    pub sound_type: SoundType,
    /// 0-100
    pub intensity: u8,
    /// 0-100
    pub texture: u8,
    /// 0-100
    pub noisiness: u8,
    /// -1.0 (dark) to 1.0 (bright)
    pub brightness: f32,
    /// Ordered, duplicate-free
    #[serde(default)]
    pub mood_tags: Vec<String>,
    pub length_seconds: f32,
    #[serde(default)]
    pub bpm: Option<u16>,
    #[serde(default)]
    pub key: Option<String>,
    /// Reproducibility token handed to the synthesis provider.
    #[serde(default)]
    pub seed: Option<i64>,
}

/// Clamp an arithmetic result back into the 0-100 scale.
pub fn clamp_scale(value: i32) -> u8 {
    value.clamp(0, SCALE_MAX as i32) as u8
}

/// Clamp brightness back into [-1.0, 1.0].
pub fn clamp_brightness(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

/// Clamp an arithmetic result back into the accepted BPM range.
pub fn clamp_bpm(value: i32) -> u16 {
    value.clamp(BPM_MIN as i32, BPM_MAX as i32) as u16
}

/// Append a tag unless it is already present, preserving order.
pub fn push_tag(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

/// A generated sound record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundGeneration {
    /// Unique identifier (UUID), assigned at creation.
    pub id: String,
    /// The full prompt sent to the synthesis provider.
    pub prompt: String,
    /// Unix timestamp (seconds).
    pub created_at: i64,
    pub parameters: SoundParameters,
    /// Set once synthesis succeeds.
    pub audio_url: Option<String>,
    pub status: GenerationStatus,
    /// Opaque attestation handle from the synthesis provider.
    pub provenance_id: Option<String>,
    /// The sound this one was derived from (relation, not ownership).
    pub variant_of: Option<String>,
    /// Library-side display name, patchable after generation.
    pub name: Option<String>,
    /// Library-side grouping, patchable after generation.
    pub collection: Option<String>,
}

impl SoundGeneration {
    /// Human-readable handle for prompts and logs: the library name if set,
    /// otherwise a truncated prompt.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        const MAX: usize = 32;
        if self.prompt.chars().count() <= MAX {
            self.prompt.clone()
        } else {
            self.prompt.chars().take(MAX).collect()
        }
    }
}

/// Library-side metadata patch, the only mutation allowed once a sound
/// reaches a terminal status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoundPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
}
