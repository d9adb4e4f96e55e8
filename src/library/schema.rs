//! Schema definition for the sound library tables.

/// Schema definition for library tables.
pub struct LibrarySchema {
    pub version: usize,
    pub up: &'static str,
}

pub const LIBRARY_VERSIONED_SCHEMAS: &[LibrarySchema] = &[LibrarySchema {
    version: 1,
    up: r#"
            CREATE TABLE IF NOT EXISTS sounds (
                id TEXT PRIMARY KEY,
                prompt TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                sound_type TEXT NOT NULL,
                intensity INTEGER NOT NULL,
                texture INTEGER NOT NULL,
                noisiness INTEGER NOT NULL,
                brightness REAL NOT NULL,
                mood_tags TEXT NOT NULL,
                length_seconds REAL NOT NULL,
                bpm INTEGER,
                key TEXT,
                seed INTEGER,
                audio_url TEXT,
                status TEXT NOT NULL,
                provenance_id TEXT,
                variant_of TEXT,
                name TEXT,
                collection TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sounds_created_at ON sounds(created_at);
            CREATE INDEX IF NOT EXISTS idx_sounds_variant_of ON sounds(variant_of);
        "#,
}];
