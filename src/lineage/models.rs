//! Data models for the lineage graph.

use serde::{Deserialize, Serialize};

/// One derivation tree. Created lazily the first time a sound is varied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineage {
    pub id: String,
    pub root_sound_id: String,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

/// How a sound entered its lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationType {
    Root,
    ParameterShift,
    StyleTransfer,
    Combine,
    Evolve,
    Mutate,
}

impl VariationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariationType::Root => "root",
            VariationType::ParameterShift => "parameter_shift",
            VariationType::StyleTransfer => "style_transfer",
            VariationType::Combine => "combine",
            VariationType::Evolve => "evolve",
            VariationType::Mutate => "mutate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "root" => Some(VariationType::Root),
            "parameter_shift" => Some(VariationType::ParameterShift),
            "style_transfer" => Some(VariationType::StyleTransfer),
            "combine" => Some(VariationType::Combine),
            "evolve" => Some(VariationType::Evolve),
            "mutate" => Some(VariationType::Mutate),
            _ => None,
        }
    }
}

/// One entry per sound participating in a lineage.
///
/// The graph is a strict tree: `parent_id` is the only structural edge.
/// `combined_with` is a weak reference for provenance display only; walks
/// never follow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageNode {
    pub sound_id: String,
    pub lineage_id: String,
    /// None only for the root node.
    pub parent_id: Option<String>,
    /// Root = 0; each derivation is its parent's generation + 1.
    pub generation: u32,
    pub variation_type: VariationType,
    /// Secondary source of a combine derivation (weak, non-owning).
    #[serde(default)]
    pub combined_with: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variation_type_round_trip() {
        for t in [
            VariationType::Root,
            VariationType::ParameterShift,
            VariationType::StyleTransfer,
            VariationType::Combine,
            VariationType::Evolve,
            VariationType::Mutate,
        ] {
            assert_eq!(VariationType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(VariationType::from_str("remix"), None);
    }
}
