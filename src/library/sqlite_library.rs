//! SQLite-backed sound library.

use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Type, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::models::{GenerationStatus, SoundGeneration, SoundParameters, SoundPatch, SoundType};
use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use super::SoundLibrary;

/// Sound library persisted in a SQLite database.
#[derive(Clone)]
pub struct SqliteSoundLibrary {
    conn: Arc<Mutex<Connection>>,
}

const SOUND_COLUMNS: &str = "id, prompt, created_at, sound_type, intensity, texture, noisiness, \
                             brightness, mood_tags, length_seconds, bpm, key, seed, audio_url, \
                             status, provenance_id, variant_of, name, collection";

impl SqliteSoundLibrary {
    /// Open (or create) the library database at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open library database at {:?}", path))?;
        Self::from_connection(conn)
    }

    /// Build a library on an existing connection. Initializes the schema if
    /// the tables don't exist.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        let schema = LIBRARY_VERSIONED_SCHEMAS.first().unwrap();
        conn.execute_batch(schema.up)
            .context("Failed to initialize library schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn row_to_sound(row: &Row) -> rusqlite::Result<SoundGeneration> {
    let sound_type_str: String = row.get(3)?;
    let sound_type = SoundType::from_str(&sound_type_str)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(3, "sound_type".to_string(), Type::Text))?;

    let mood_tags_json: String = row.get(8)?;
    let mood_tags: Vec<String> = serde_json::from_str(&mood_tags_json)
        .map_err(|_| rusqlite::Error::InvalidColumnType(8, "mood_tags".to_string(), Type::Text))?;

    let status_str: String = row.get(14)?;
    let status = GenerationStatus::from_str(&status_str)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(14, "status".to_string(), Type::Text))?;

    Ok(SoundGeneration {
        id: row.get(0)?,
        prompt: row.get(1)?,
        created_at: row.get(2)?,
        parameters: SoundParameters {
            sound_type,
            intensity: row.get::<_, i64>(4)? as u8,
            texture: row.get::<_, i64>(5)? as u8,
            noisiness: row.get::<_, i64>(6)? as u8,
            brightness: row.get::<_, f64>(7)? as f32,
            mood_tags,
            length_seconds: row.get::<_, f64>(9)? as f32,
            bpm: row.get::<_, Option<i64>>(10)?.map(|b| b as u16),
            key: row.get(11)?,
            seed: row.get(12)?,
        },
        audio_url: row.get(13)?,
        status,
        provenance_id: row.get(15)?,
        variant_of: row.get(16)?,
        name: row.get(17)?,
        collection: row.get(18)?,
    })
}

impl SoundLibrary for SqliteSoundLibrary {
    fn get(&self, id: &str) -> Result<Option<SoundGeneration>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            &format!("SELECT {} FROM sounds WHERE id = ?1", SOUND_COLUMNS),
            params![id],
            row_to_sound,
        ) {
            Ok(sound) => Ok(Some(sound)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: SoundGeneration) -> Result<SoundGeneration> {
        let conn = self.conn.lock().unwrap();
        let mood_tags = serde_json::to_string(&record.parameters.mood_tags)?;
        conn.execute(
            "INSERT OR REPLACE INTO sounds (id, prompt, created_at, sound_type, intensity, \
             texture, noisiness, brightness, mood_tags, length_seconds, bpm, key, seed, \
             audio_url, status, provenance_id, variant_of, name, collection) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                record.id,
                record.prompt,
                record.created_at,
                record.parameters.sound_type.as_str(),
                record.parameters.intensity as i64,
                record.parameters.texture as i64,
                record.parameters.noisiness as i64,
                record.parameters.brightness as f64,
                mood_tags,
                record.parameters.length_seconds as f64,
                record.parameters.bpm.map(|b| b as i64),
                record.parameters.key,
                record.parameters.seed,
                record.audio_url,
                record.status.as_str(),
                record.provenance_id,
                record.variant_of,
                record.name,
                record.collection,
            ],
        )
        .context("Failed to save sound")?;
        Ok(record)
    }

    fn update(&self, id: &str, patch: &SoundPatch) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE sounds SET name = COALESCE(?2, name), collection = COALESCE(?3, collection) \
             WHERE id = ?1",
            params![id, patch.name, patch.collection],
        )?;
        if updated == 0 {
            bail!("Sound not found in library: {}", id);
        }
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<SoundGeneration>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sounds ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            SOUND_COLUMNS
        ))?;
        let sounds = stmt
            .query_map(params![limit as i64], row_to_sound)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sounds)
    }

    fn count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM sounds", [], |row| {
            row.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::models::SoundType;

    fn make_store() -> SqliteSoundLibrary {
        SqliteSoundLibrary::from_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn make_sound(id: &str, created_at: i64) -> SoundGeneration {
        SoundGeneration {
            id: id.to_string(),
            prompt: "deep sub bass wobble".to_string(),
            created_at,
            parameters: SoundParameters {
                sound_type: SoundType::Bass,
                intensity: 80,
                texture: 35,
                noisiness: 10,
                brightness: -0.4,
                mood_tags: vec!["dark".to_string(), "heavy".to_string()],
                length_seconds: 8.0,
                bpm: Some(140),
                key: Some("F minor".to_string()),
                seed: Some(42),
            },
            audio_url: Some("https://cdn.example/sounds/a.mp3".to_string()),
            status: GenerationStatus::Ready,
            provenance_id: Some("prov-1".to_string()),
            variant_of: None,
            name: None,
            collection: None,
        }
    }

    #[test]
    fn test_save_and_get_round_trip() {
        let store = make_store();
        let sound = make_sound("s1", 100);
        store.save(sound.clone()).unwrap();

        let loaded = store.get("s1").unwrap().unwrap();
        assert_eq!(loaded.id, sound.id);
        assert_eq!(loaded.prompt, sound.prompt);
        assert_eq!(loaded.parameters, sound.parameters);
        assert_eq!(loaded.status, GenerationStatus::Ready);
        assert_eq!(loaded.audio_url, sound.audio_url);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = make_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_update_patches_metadata_only() {
        let store = make_store();
        store.save(make_sound("s1", 100)).unwrap();

        let patch = SoundPatch {
            name: Some("Wobble".to_string()),
            collection: None,
        };
        store.update("s1", &patch).unwrap();

        let loaded = store.get("s1").unwrap().unwrap();
        assert_eq!(loaded.name.as_deref(), Some("Wobble"));
        assert!(loaded.collection.is_none());
        // Everything else untouched
        assert_eq!(loaded.parameters.intensity, 80);
        assert_eq!(loaded.status, GenerationStatus::Ready);
    }

    #[test]
    fn test_update_missing_errors() {
        let store = make_store();
        let result = store.update("nope", &SoundPatch::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_list_recent_newest_first() {
        let store = make_store();
        store.save(make_sound("old", 100)).unwrap();
        store.save(make_sound("mid", 200)).unwrap();
        store.save(make_sound("new", 300)).unwrap();

        let sounds = store.list_recent(2).unwrap();
        let ids: Vec<&str> = sounds.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);
        assert_eq!(store.count(), 3);
    }
}
