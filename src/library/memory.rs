//! In-memory sound library for tests and ephemeral setups.

use anyhow::{bail, Result};
use std::sync::Mutex;

use super::models::{SoundGeneration, SoundPatch};
use super::SoundLibrary;

/// Sound library held entirely in memory. Insertion order is preserved so
/// listing behaves like the SQLite store.
#[derive(Default)]
pub struct MemorySoundLibrary {
    sounds: Mutex<Vec<SoundGeneration>>,
}

impl MemorySoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SoundLibrary for MemorySoundLibrary {
    fn get(&self, id: &str) -> Result<Option<SoundGeneration>> {
        let sounds = self.sounds.lock().unwrap();
        Ok(sounds.iter().find(|s| s.id == id).cloned())
    }

    fn save(&self, record: SoundGeneration) -> Result<SoundGeneration> {
        let mut sounds = self.sounds.lock().unwrap();
        if let Some(existing) = sounds.iter_mut().find(|s| s.id == record.id) {
            *existing = record.clone();
        } else {
            sounds.push(record.clone());
        }
        Ok(record)
    }

    fn update(&self, id: &str, patch: &SoundPatch) -> Result<()> {
        let mut sounds = self.sounds.lock().unwrap();
        let Some(sound) = sounds.iter_mut().find(|s| s.id == id) else {
            bail!("Sound not found in library: {}", id);
        };
        if let Some(name) = &patch.name {
            sound.name = Some(name.clone());
        }
        if let Some(collection) = &patch.collection {
            sound.collection = Some(collection.clone());
        }
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<SoundGeneration>> {
        let sounds = self.sounds.lock().unwrap();
        let mut all: Vec<SoundGeneration> = sounds.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit);
        Ok(all)
    }

    fn count(&self) -> usize {
        self.sounds.lock().unwrap().len()
    }
}
