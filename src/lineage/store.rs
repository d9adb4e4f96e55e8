//! LineageStore trait and the in-memory implementation.
//!
//! The store is a dumb persistence layer: it does not validate the tree
//! invariants (generation numbering, single parent, matching lineage ids).
//! Invariant enforcement is the derivation orchestrator's responsibility.

use anyhow::{bail, Result};
use std::sync::Mutex;

use super::models::{Lineage, LineageNode, VariationType};
use crate::library::SoundGeneration;

/// Trait for lineage graph storage backends.
///
/// Semantics are last-write-wins per key. Concurrent `save_node` calls for
/// different sound ids never conflict; callers must not race
/// `create_lineage` for the same root sound.
pub trait LineageStore: Send + Sync {
    /// Allocate a new lineage rooted at the given sound and insert its
    /// implicit root node (generation 0).
    ///
    /// Errors if the sound is already the root of an existing lineage;
    /// callers wanting idempotency must check `get_lineage_by_root` first.
    fn create_lineage(&self, root: &SoundGeneration) -> Result<Lineage>;

    /// Append or overwrite a node, keyed by `sound_id`.
    fn save_node(&self, node: &LineageNode) -> Result<()>;

    fn get_lineage(&self, id: &str) -> Result<Option<Lineage>>;

    fn get_lineage_by_root(&self, sound_id: &str) -> Result<Option<Lineage>>;

    fn get_node_for_sound(&self, sound_id: &str) -> Result<Option<LineageNode>>;

    /// All nodes of a lineage in insertion order (not generation-sorted;
    /// callers sort if they need to).
    fn get_nodes_for_lineage(&self, lineage_id: &str) -> Result<Vec<LineageNode>>;

    fn get_all_lineages(&self) -> Result<Vec<Lineage>>;

    /// Counts for metrics.
    fn count_lineages(&self) -> usize;
    fn count_nodes(&self) -> usize;
}

/// Build the implicit root node for a new lineage.
pub(crate) fn root_node(lineage_id: &str, root_sound_id: &str) -> LineageNode {
    LineageNode {
        sound_id: root_sound_id.to_string(),
        lineage_id: lineage_id.to_string(),
        parent_id: None,
        generation: 0,
        variation_type: VariationType::Root,
        combined_with: None,
    }
}

/// Lineage graph held entirely in memory, insertion order preserved.
#[derive(Default)]
pub struct MemoryLineageStore {
    lineages: Mutex<Vec<Lineage>>,
    nodes: Mutex<Vec<LineageNode>>,
}

impl MemoryLineageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineageStore for MemoryLineageStore {
    fn create_lineage(&self, root: &SoundGeneration) -> Result<Lineage> {
        let mut lineages = self.lineages.lock().unwrap();
        if lineages.iter().any(|l| l.root_sound_id == root.id) {
            bail!("Sound {} is already the root of a lineage", root.id);
        }
        let lineage = Lineage {
            id: uuid::Uuid::new_v4().to_string(),
            root_sound_id: root.id.clone(),
            created_at: chrono::Utc::now().timestamp(),
        };
        lineages.push(lineage.clone());
        self.nodes
            .lock()
            .unwrap()
            .push(root_node(&lineage.id, &root.id));
        Ok(lineage)
    }

    fn save_node(&self, node: &LineageNode) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(existing) = nodes.iter_mut().find(|n| n.sound_id == node.sound_id) {
            *existing = node.clone();
        } else {
            nodes.push(node.clone());
        }
        Ok(())
    }

    fn get_lineage(&self, id: &str) -> Result<Option<Lineage>> {
        let lineages = self.lineages.lock().unwrap();
        Ok(lineages.iter().find(|l| l.id == id).cloned())
    }

    fn get_lineage_by_root(&self, sound_id: &str) -> Result<Option<Lineage>> {
        let lineages = self.lineages.lock().unwrap();
        Ok(lineages.iter().find(|l| l.root_sound_id == sound_id).cloned())
    }

    fn get_node_for_sound(&self, sound_id: &str) -> Result<Option<LineageNode>> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes.iter().find(|n| n.sound_id == sound_id).cloned())
    }

    fn get_nodes_for_lineage(&self, lineage_id: &str) -> Result<Vec<LineageNode>> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes
            .iter()
            .filter(|n| n.lineage_id == lineage_id)
            .cloned()
            .collect())
    }

    fn get_all_lineages(&self) -> Result<Vec<Lineage>> {
        Ok(self.lineages.lock().unwrap().clone())
    }

    fn count_lineages(&self) -> usize {
        self.lineages.lock().unwrap().len()
    }

    fn count_nodes(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{GenerationStatus, SoundParameters, SoundType};

    fn make_sound(id: &str) -> SoundGeneration {
        SoundGeneration {
            id: id.to_string(),
            prompt: "rumbling thunder".to_string(),
            created_at: 0,
            parameters: SoundParameters {
                sound_type: SoundType::Ambience,
                intensity: 60,
                texture: 70,
                noisiness: 80,
                brightness: -0.6,
                mood_tags: vec![],
                length_seconds: 12.0,
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
    fn test_create_lineage_inserts_root_node() {
        let store = MemoryLineageStore::new();
        let lineage = store.create_lineage(&make_sound("s1")).unwrap();

        assert_eq!(lineage.root_sound_id, "s1");
        let node = store.get_node_for_sound("s1").unwrap().unwrap();
        assert_eq!(node.lineage_id, lineage.id);
        assert_eq!(node.generation, 0);
        assert!(node.parent_id.is_none());
        assert_eq!(node.variation_type, VariationType::Root);
    }

    #[test]
    fn test_create_lineage_twice_errors() {
        let store = MemoryLineageStore::new();
        store.create_lineage(&make_sound("s1")).unwrap();
        assert!(store.create_lineage(&make_sound("s1")).is_err());
    }

    #[test]
    fn test_nodes_returned_in_insertion_order() {
        let store = MemoryLineageStore::new();
        let lineage = store.create_lineage(&make_sound("root")).unwrap();

        for id in ["b", "a", "c"] {
            store
                .save_node(&LineageNode {
                    sound_id: id.to_string(),
                    lineage_id: lineage.id.clone(),
                    parent_id: Some("root".to_string()),
                    generation: 1,
                    variation_type: VariationType::Evolve,
                    combined_with: None,
                })
                .unwrap();
        }

        let ids: Vec<String> = store
            .get_nodes_for_lineage(&lineage.id)
            .unwrap()
            .into_iter()
            .map(|n| n.sound_id)
            .collect();
        assert_eq!(ids, vec!["root", "b", "a", "c"]);
    }

    #[test]
    fn test_save_node_overwrites_by_sound_id() {
        let store = MemoryLineageStore::new();
        let lineage = store.create_lineage(&make_sound("root")).unwrap();

        let mut node = LineageNode {
            sound_id: "child".to_string(),
            lineage_id: lineage.id.clone(),
            parent_id: Some("root".to_string()),
            generation: 1,
            variation_type: VariationType::Mutate,
            combined_with: None,
        };
        store.save_node(&node).unwrap();
        node.variation_type = VariationType::Evolve;
        store.save_node(&node).unwrap();

        assert_eq!(store.count_nodes(), 2);
        assert_eq!(
            store
                .get_node_for_sound("child")
                .unwrap()
                .unwrap()
                .variation_type,
            VariationType::Evolve
        );
    }
}
