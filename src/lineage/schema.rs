//! Schema definition for the lineage graph tables.

/// Schema definition for lineage tables.
pub struct LineageSchema {
    pub version: usize,
    pub up: &'static str,
}

pub const LINEAGE_VERSIONED_SCHEMAS: &[LineageSchema] = &[LineageSchema {
    version: 1,
    up: r#"
            CREATE TABLE IF NOT EXISTS lineages (
                id TEXT PRIMARY KEY,
                root_sound_id TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lineage_nodes (
                sound_id TEXT PRIMARY KEY,
                lineage_id TEXT NOT NULL,
                parent_id TEXT,
                generation INTEGER NOT NULL,
                variation_type TEXT NOT NULL,
                combined_with TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_lineage_nodes_lineage ON lineage_nodes(lineage_id);
            CREATE INDEX IF NOT EXISTS idx_lineage_nodes_parent ON lineage_nodes(parent_id);
        "#,
}];
