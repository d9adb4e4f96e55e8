//! Waveforge Studio Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod derivation;
pub mod library;
pub mod lineage;
pub mod server;
pub mod synthesis;
pub mod tempo;

// Re-export commonly used types for convenience
pub use derivation::{DerivationEngine, DerivationError, DerivationRequest, VariationStrategy};
pub use library::{MemorySoundLibrary, SoundLibrary, SqliteSoundLibrary};
pub use lineage::{LineageStore, MemoryLineageStore, SqliteLineageStore};
pub use server::{run_server, RequestsLoggingLevel};
pub use synthesis::{HttpSynthesisClient, SynthesisBackend};
