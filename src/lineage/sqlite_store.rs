//! SQLite-backed lineage graph store.

use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Type, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::models::{Lineage, LineageNode, VariationType};
use super::schema::LINEAGE_VERSIONED_SCHEMAS;
use super::store::{root_node, LineageStore};
use crate::library::SoundGeneration;

/// Lineage graph persisted in a SQLite database.
#[derive(Clone)]
pub struct SqliteLineageStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLineageStore {
    /// Open (or create) the lineage database at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open lineage database at {:?}", path))?;
        Self::from_connection(conn)
    }

    /// Build a store on an existing connection. Initializes the schema if
    /// the tables don't exist.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        let schema = LINEAGE_VERSIONED_SCHEMAS.first().unwrap();
        conn.execute_batch(schema.up)
            .context("Failed to initialize lineage schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn insert_node(conn: &Connection, node: &LineageNode) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO lineage_nodes \
             (sound_id, lineage_id, parent_id, generation, variation_type, combined_with) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                node.sound_id,
                node.lineage_id,
                node.parent_id,
                node.generation as i64,
                node.variation_type.as_str(),
                node.combined_with,
            ],
        )
        .context("Failed to save lineage node")?;
        Ok(())
    }
}

fn row_to_lineage(row: &Row) -> rusqlite::Result<Lineage> {
    Ok(Lineage {
        id: row.get(0)?,
        root_sound_id: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn row_to_node(row: &Row) -> rusqlite::Result<LineageNode> {
    let variation_type_str: String = row.get(4)?;
    let variation_type = VariationType::from_str(&variation_type_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(4, "variation_type".to_string(), Type::Text)
    })?;
    Ok(LineageNode {
        sound_id: row.get(0)?,
        lineage_id: row.get(1)?,
        parent_id: row.get(2)?,
        generation: row.get::<_, i64>(3)? as u32,
        variation_type,
        combined_with: row.get(5)?,
    })
}

impl LineageStore for SqliteLineageStore {
    fn create_lineage(&self, root: &SoundGeneration) -> Result<Lineage> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM lineages WHERE root_sound_id = ?1",
                params![root.id],
                |_| Ok(true),
            )
            .unwrap_or(false);
        if exists {
            bail!("Sound {} is already the root of a lineage", root.id);
        }

        let lineage = Lineage {
            id: uuid::Uuid::new_v4().to_string(),
            root_sound_id: root.id.clone(),
            created_at: chrono::Utc::now().timestamp(),
        };
        conn.execute(
            "INSERT INTO lineages (id, root_sound_id, created_at) VALUES (?1, ?2, ?3)",
            params![lineage.id, lineage.root_sound_id, lineage.created_at],
        )
        .context("Failed to create lineage")?;
        Self::insert_node(&conn, &root_node(&lineage.id, &root.id))?;
        Ok(lineage)
    }

    fn save_node(&self, node: &LineageNode) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_node(&conn, node)
    }

    fn get_lineage(&self, id: &str) -> Result<Option<Lineage>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT id, root_sound_id, created_at FROM lineages WHERE id = ?1",
            params![id],
            row_to_lineage,
        ) {
            Ok(lineage) => Ok(Some(lineage)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_lineage_by_root(&self, sound_id: &str) -> Result<Option<Lineage>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT id, root_sound_id, created_at FROM lineages WHERE root_sound_id = ?1",
            params![sound_id],
            row_to_lineage,
        ) {
            Ok(lineage) => Ok(Some(lineage)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_node_for_sound(&self, sound_id: &str) -> Result<Option<LineageNode>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT sound_id, lineage_id, parent_id, generation, variation_type, combined_with \
             FROM lineage_nodes WHERE sound_id = ?1",
            params![sound_id],
            row_to_node,
        ) {
            Ok(node) => Ok(Some(node)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_nodes_for_lineage(&self, lineage_id: &str) -> Result<Vec<LineageNode>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT sound_id, lineage_id, parent_id, generation, variation_type, combined_with \
             FROM lineage_nodes WHERE lineage_id = ?1 ORDER BY rowid ASC",
        )?;
        let nodes = stmt
            .query_map(params![lineage_id], row_to_node)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(nodes)
    }

    fn get_all_lineages(&self) -> Result<Vec<Lineage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, root_sound_id, created_at FROM lineages ORDER BY rowid ASC")?;
        let lineages = stmt
            .query_map([], row_to_lineage)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lineages)
    }

    fn count_lineages(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM lineages", [], |row| {
            row.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }

    fn count_nodes(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM lineage_nodes", [], |row| {
            row.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{GenerationStatus, SoundParameters, SoundType};

    fn make_store() -> SqliteLineageStore {
        SqliteLineageStore::from_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn make_sound(id: &str) -> SoundGeneration {
        SoundGeneration {
            id: id.to_string(),
            prompt: "metallic impact".to_string(),
            created_at: 0,
            parameters: SoundParameters {
                sound_type: SoundType::Fx,
                intensity: 90,
                texture: 40,
                noisiness: 60,
                brightness: 0.2,
                mood_tags: vec![],
                length_seconds: 2.0,
                bpm: None,
                key: None,
                seed: None,
            },
            audio_url: None,
            status: GenerationStatus::Ready,
            provenance_id: None,
            variant_of: None,
            name: None,
            collection: None,
        }
    }

    #[test]
    fn test_create_lineage_and_lookups() {
        let store = make_store();
        let lineage = store.create_lineage(&make_sound("s1")).unwrap();

        assert_eq!(
            store.get_lineage(&lineage.id).unwrap().unwrap().root_sound_id,
            "s1"
        );
        assert_eq!(
            store.get_lineage_by_root("s1").unwrap().unwrap().id,
            lineage.id
        );
        let node = store.get_node_for_sound("s1").unwrap().unwrap();
        assert_eq!(node.generation, 0);
        assert_eq!(node.variation_type, VariationType::Root);
        assert_eq!(store.count_lineages(), 1);
        assert_eq!(store.count_nodes(), 1);
    }

    #[test]
    fn test_create_lineage_twice_errors() {
        let store = make_store();
        store.create_lineage(&make_sound("s1")).unwrap();
        assert!(store.create_lineage(&make_sound("s1")).is_err());
    }

    #[test]
    fn test_nodes_in_insertion_order_with_combined_with() {
        let store = make_store();
        let lineage = store.create_lineage(&make_sound("root")).unwrap();

        store
            .save_node(&LineageNode {
                sound_id: "blend".to_string(),
                lineage_id: lineage.id.clone(),
                parent_id: Some("root".to_string()),
                generation: 1,
                variation_type: VariationType::Combine,
                combined_with: Some("other".to_string()),
            })
            .unwrap();

        let nodes = store.get_nodes_for_lineage(&lineage.id).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].sound_id, "root");
        assert_eq!(nodes[1].sound_id, "blend");
        assert_eq!(nodes[1].combined_with.as_deref(), Some("other"));
    }

    #[test]
    fn test_missing_lookups_return_none() {
        let store = make_store();
        assert!(store.get_lineage("nope").unwrap().is_none());
        assert!(store.get_lineage_by_root("nope").unwrap().is_none());
        assert!(store.get_node_for_sound("nope").unwrap().is_none());
        assert!(store.get_all_lineages().unwrap().is_empty());
    }
}
