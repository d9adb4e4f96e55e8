//! The derivation engine: turns an existing sound into a family of related
//! sounds, tracks their ancestry in the lineage graph, and computes the
//! parameters and prompts that drive each derived generation.

mod orchestrator;
mod strategies;

pub use orchestrator::{DerivationEngine, DerivationOutcome, DerivationRequest};
pub use strategies::{
    ParameterShifts, StrategyContext, VariationPlan, VariationStrategy, MAX_VARIATIONS,
    MIN_VARIATIONS,
};

use thiserror::Error;

/// Errors surfaced by the derivation engine.
///
/// Per-item synthesis failures are not represented here: they are isolated
/// inside a batch (logged and skipped) and only show up as a shorter result
/// list, or as `BatchExhausted` when nothing succeeded.
#[derive(Debug, Error)]
pub enum DerivationError {
    /// Missing or out-of-range request fields. Rejected before any side
    /// effect.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Parent or combine-target sound (or its lineage) is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Every item in the batch failed. The only batch-level failure.
    #[error("all {requested} requested variations failed")]
    BatchExhausted { requested: usize },

    /// A graph walk would not terminate within the expected node bound, or
    /// the store contradicts itself. Indicates a broken invariant upstream.
    #[error("lineage store inconsistency: {0}")]
    Inconsistency(String),

    /// Store or collaborator infrastructure error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
