//! The sound library: persistent storage of generated sound records.
//!
//! The rest of the system only sees the `SoundLibrary` trait; the SQLite
//! implementation backs the running server, the in-memory one backs tests
//! and ephemeral setups.

mod memory;
pub mod models;
mod schema;
mod sqlite_library;

pub use memory::MemorySoundLibrary;
pub use models::{
    clamp_bpm, clamp_brightness, clamp_scale, push_tag, GenerationStatus, SoundGeneration,
    SoundParameters, SoundPatch, SoundType,
};
pub use sqlite_library::SqliteSoundLibrary;

use anyhow::Result;

/// Trait for sound library storage backends.
pub trait SoundLibrary: Send + Sync {
    /// Get a sound by ID.
    fn get(&self, id: &str) -> Result<Option<SoundGeneration>>;

    /// Insert or replace a sound record, keyed by its ID.
    fn save(&self, record: SoundGeneration) -> Result<SoundGeneration>;

    /// Apply a library-side metadata patch. Errors if the sound is absent.
    fn update(&self, id: &str, patch: &SoundPatch) -> Result<()>;

    /// Most recently created sounds, newest first.
    fn list_recent(&self, limit: usize) -> Result<Vec<SoundGeneration>>;

    /// Number of sounds in the library (for metrics).
    fn count(&self) -> usize;
}
