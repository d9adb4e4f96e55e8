//! Batch variation orchestration.
//!
//! The sole entry point that turns "generate N variations of sound S using
//! strategy T" into N new sound records plus lineage-graph updates, with
//! per-item failure isolation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::strategies::{StrategyContext, VariationStrategy, MAX_VARIATIONS, MIN_VARIATIONS};
use super::DerivationError;
use crate::library::{GenerationStatus, SoundGeneration, SoundLibrary};
use crate::lineage::{Lineage, LineageNode, LineageStore};
use crate::synthesis::{Engine, SynthesisBackend};

/// A batch variation request.
#[derive(Debug, Clone)]
pub struct DerivationRequest {
    pub parent_sound_id: String,
    pub strategy: VariationStrategy,
    /// Number of variations, 1 to 10.
    pub count: usize,
    /// Synthesis engine chosen by the caller (the engine-selection heuristic
    /// runs at the API layer, not here).
    pub engine: Engine,
}

/// Result of a batch derivation. `sounds.len()` may legitimately be smaller
/// than `requested` when some items failed.
#[derive(Debug, Clone, Serialize)]
pub struct DerivationOutcome {
    pub sounds: Vec<SoundGeneration>,
    pub lineage_id: String,
    /// Generation number shared by every sibling of this batch.
    pub generation: u32,
    pub requested: usize,
}

/// Coordinates variation batches across the library, the lineage graph and
/// the synthesis collaborator. Explicitly constructed and injected; holds no
/// global state.
pub struct DerivationEngine {
    library: Arc<dyn SoundLibrary>,
    lineages: Arc<dyn LineageStore>,
    synthesis: Arc<dyn SynthesisBackend>,
}

impl DerivationEngine {
    pub fn new(
        library: Arc<dyn SoundLibrary>,
        lineages: Arc<dyn LineageStore>,
        synthesis: Arc<dyn SynthesisBackend>,
    ) -> Self {
        Self {
            library,
            lineages,
            synthesis,
        }
    }

    /// Derive a batch of variations from an existing sound.
    ///
    /// Validation and not-found errors block the whole operation before any
    /// side effect. Per-item synthesis or persistence failures are logged
    /// and skipped; the batch fails only if every item failed.
    pub async fn derive_variations(
        &self,
        request: DerivationRequest,
    ) -> Result<DerivationOutcome, DerivationError> {
        if !(MIN_VARIATIONS..=MAX_VARIATIONS).contains(&request.count) {
            return Err(DerivationError::Validation(format!(
                "count must be in [{}, {}], got {}",
                MIN_VARIATIONS, MAX_VARIATIONS, request.count
            )));
        }
        request.strategy.validate()?;

        let parent = self
            .library
            .get(&request.parent_sound_id)?
            .ok_or_else(|| {
                DerivationError::NotFound(format!("sound {}", request.parent_sound_id))
            })?;

        // The combine target must independently resolve before the batch
        // starts.
        let combine_source = match &request.strategy {
            VariationStrategy::Combine { with_sound_id } => Some(
                self.library
                    .get(with_sound_id)?
                    .ok_or_else(|| {
                        DerivationError::NotFound(format!("combine target sound {}", with_sound_id))
                    })?,
            ),
            _ => None,
        };
        let combined_with = combine_source.as_ref().map(|s| s.id.clone());

        let (lineage, parent_generation) = self.resolve_lineage(&parent)?;
        // Fixed before the loop so every sibling shares it regardless of
        // completion order.
        let generation = parent_generation + 1;
        let variation_type = request.strategy.variation_type();

        let mut produced = Vec::new();
        for index in 0..request.count {
            let plan = request.strategy.plan(&StrategyContext {
                parent: &parent,
                combine_source: combine_source.as_ref(),
                index,
                total: request.count,
            })?;
            let prompt = compose_prompt(&parent.prompt, &plan.prompt_suffix);

            let clip = match self
                .synthesis
                .generate(request.engine, &prompt, &plan.parameters)
                .await
            {
                Ok(clip) => clip,
                Err(err) => {
                    warn!(
                        "Variation {}/{} of sound {} failed in synthesis: {:#}",
                        index + 1,
                        request.count,
                        parent.id,
                        err
                    );
                    continue;
                }
            };

            let record = SoundGeneration {
                id: uuid::Uuid::new_v4().to_string(),
                prompt,
                created_at: chrono::Utc::now().timestamp(),
                parameters: plan.parameters,
                audio_url: Some(clip.audio_url),
                status: GenerationStatus::Ready,
                provenance_id: clip.provenance_id,
                variant_of: Some(parent.id.clone()),
                name: None,
                collection: parent.collection.clone(),
            };
            let saved = match self.library.save(record) {
                Ok(saved) => saved,
                Err(err) => {
                    warn!(
                        "Variation {}/{} of sound {} failed to persist: {:#}",
                        index + 1,
                        request.count,
                        parent.id,
                        err
                    );
                    continue;
                }
            };

            let node = LineageNode {
                sound_id: saved.id.clone(),
                lineage_id: lineage.id.clone(),
                parent_id: Some(parent.id.clone()),
                generation,
                variation_type,
                combined_with: combined_with.clone(),
            };
            if let Err(err) = self.lineages.save_node(&node) {
                error!(
                    "Sound {} was saved but its lineage node write failed: {:#}",
                    saved.id, err
                );
                continue;
            }

            produced.push(saved);
        }

        if produced.is_empty() {
            return Err(DerivationError::BatchExhausted {
                requested: request.count,
            });
        }

        info!(
            "Derived {}/{} {} variations of sound {} at generation {}",
            produced.len(),
            request.count,
            variation_type.as_str(),
            parent.id,
            generation
        );

        Ok(DerivationOutcome {
            sounds: produced,
            lineage_id: lineage.id,
            generation,
            requested: request.count,
        })
    }

    /// Reuse the parent's lineage if it already has a node, otherwise reuse
    /// a lineage rooted at it, otherwise create one lazily. Returns the
    /// lineage and the parent's generation number.
    fn resolve_lineage(
        &self,
        parent: &SoundGeneration,
    ) -> Result<(Lineage, u32), DerivationError> {
        if let Some(node) = self.lineages.get_node_for_sound(&parent.id)? {
            let lineage = self.lineages.get_lineage(&node.lineage_id)?.ok_or_else(|| {
                DerivationError::Inconsistency(format!(
                    "node for sound {} references missing lineage {}",
                    parent.id, node.lineage_id
                ))
            })?;
            return Ok((lineage, node.generation));
        }
        if let Some(lineage) = self.lineages.get_lineage_by_root(&parent.id)? {
            return Ok((lineage, 0));
        }
        let lineage = self.lineages.create_lineage(parent)?;
        info!(
            "Created lineage {} rooted at sound {}",
            lineage.id, parent.id
        );
        Ok((lineage, 0))
    }

    /// Ancestor sound ids, nearest-first. `ancestors(root)` is empty.
    ///
    /// The walk is bounded by the lineage's node count; exceeding it means a
    /// cycle, which violates the tree invariant and fails loudly.
    pub fn ancestors(&self, sound_id: &str) -> Result<Vec<String>, DerivationError> {
        let node = self
            .lineages
            .get_node_for_sound(sound_id)?
            .ok_or_else(|| {
                DerivationError::NotFound(format!("sound {} has no lineage node", sound_id))
            })?;
        let bound = self.lineages.get_nodes_for_lineage(&node.lineage_id)?.len();

        let mut chain = Vec::new();
        let mut current = node;
        while let Some(parent_id) = current.parent_id.clone() {
            if chain.len() >= bound {
                return Err(DerivationError::Inconsistency(format!(
                    "ancestor walk from sound {} exceeded {} nodes in lineage {}",
                    sound_id, bound, current.lineage_id
                )));
            }
            let parent = self
                .lineages
                .get_node_for_sound(&parent_id)?
                .ok_or_else(|| {
                    DerivationError::Inconsistency(format!(
                        "node {} references missing parent {}",
                        current.sound_id, parent_id
                    ))
                })?;
            chain.push(parent_id);
            current = parent;
        }
        Ok(chain)
    }

    /// All transitive descendants of a sound, breadth-first. Order beyond
    /// "breadth-first from the given sound" is unspecified.
    pub fn descendants(&self, sound_id: &str) -> Result<Vec<String>, DerivationError> {
        let node = self
            .lineages
            .get_node_for_sound(sound_id)?
            .ok_or_else(|| {
                DerivationError::NotFound(format!("sound {} has no lineage node", sound_id))
            })?;
        let nodes = self.lineages.get_nodes_for_lineage(&node.lineage_id)?;

        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for n in &nodes {
            if let Some(parent_id) = &n.parent_id {
                children
                    .entry(parent_id.as_str())
                    .or_default()
                    .push(n.sound_id.as_str());
            }
        }

        let mut found = Vec::new();
        let mut queue = VecDeque::from([sound_id]);
        while let Some(current) = queue.pop_front() {
            for &child in children.get(current).map(|v| v.as_slice()).unwrap_or(&[]) {
                if found.len() >= nodes.len() {
                    return Err(DerivationError::Inconsistency(format!(
                        "descendant walk from sound {} exceeded {} nodes in lineage {}",
                        sound_id,
                        nodes.len(),
                        node.lineage_id
                    )));
                }
                found.push(child.to_string());
                queue.push_back(child);
            }
        }
        Ok(found)
    }
}

/// Append a strategy's fragment to the parent's prompt.
fn compose_prompt(parent_prompt: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        parent_prompt.to_string()
    } else {
        format!("{}, {}", parent_prompt, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_prompt() {
        assert_eq!(
            compose_prompt("soft rain", "with adjusted parameters"),
            "soft rain, with adjusted parameters"
        );
        assert_eq!(compose_prompt("soft rain", ""), "soft rain");
    }
}
