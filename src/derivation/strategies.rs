//! Variation strategies.
//!
//! Each strategy maps (parent, config, index, total) to a complete parameter
//! overlay plus a prompt fragment describing the transformation. Strategies
//! never mutate the parent record.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::DerivationError;
use crate::library::{
    clamp_bpm, clamp_brightness, clamp_scale, push_tag, SoundGeneration, SoundParameters,
};
use crate::lineage::VariationType;

/// Batch size bounds for a variation request.
pub const MIN_VARIATIONS: usize = 1;
pub const MAX_VARIATIONS: usize = 10;

const SHIFT_SUFFIX: &str = "with adjusted parameters";
const MUTATE_SUFFIX: &str = "experimental mutation, unexpected elements";

/// Explicit per-field shift magnitudes for `parameter_shift`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterShifts {
    #[serde(default)]
    pub intensity: i16,
    #[serde(default)]
    pub texture: i16,
    #[serde(default)]
    pub noisiness: i16,
    #[serde(default)]
    pub brightness: f32,
    #[serde(default)]
    pub bpm: i16,
}

/// The closed set of variation strategies. One case per variation type; the
/// set is fixed and each case has a materially different configuration
/// shape, so this is a tagged enum with a single dispatch rather than
/// open-ended polymorphism.
#[derive(Debug, Clone)]
pub enum VariationStrategy {
    ParameterShift(ParameterShifts),
    StyleTransfer { style: String },
    /// `evolution_strength` in [0.1, 0.5] controls divergence.
    Evolve { evolution_strength: f32 },
    /// `mutation_rate` in [0.1, 0.7]; `preserve_core` pins intensity and bpm.
    Mutate { mutation_rate: f32, preserve_core: bool },
    Combine { with_sound_id: String },
}

/// Inputs to a single variation plan.
pub struct StrategyContext<'a> {
    pub parent: &'a SoundGeneration,
    /// Resolved secondary source; present only for combine.
    pub combine_source: Option<&'a SoundGeneration>,
    /// 0-based index within the batch.
    pub index: usize,
    /// Total variations requested in the batch.
    pub total: usize,
}

/// A computed overlay for one variation: the full derived parameter vector
/// plus the prompt fragment to append to the parent's prompt.
#[derive(Debug, Clone)]
pub struct VariationPlan {
    pub parameters: SoundParameters,
    pub prompt_suffix: String,
}

/// Linear ramp from 0 at the first variation to 1 at the last. A batch of
/// one uses the full magnitude.
fn shift_fraction(index: usize, total: usize) -> f32 {
    if total <= 1 {
        1.0
    } else {
        index as f32 / (total - 1) as f32
    }
}

/// Blend ratio across the batch: 0.0 is pure parent A, 1.0 pure parent B.
/// A batch of one sits at the midpoint.
fn blend_ratio(index: usize, total: usize) -> f32 {
    if total <= 1 {
        0.5
    } else {
        index as f32 / (total - 1) as f32
    }
}

/// Evolution phase for the i-th variation.
fn evolve_phase(index: usize, total: usize) -> f32 {
    index as f32 / total.saturating_sub(1).max(1) as f32
}

fn evolve_stage_suffix(phase: f32) -> &'static str {
    if phase < 0.3 {
        "subtle evolution, early stage"
    } else if phase < 0.7 {
        "mid evolution, developing"
    } else {
        "evolved form, refined"
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn lerp_scale(a: u8, b: u8, t: f32) -> u8 {
    clamp_scale(lerp(a as f32, b as f32, t).round() as i32)
}

fn blend_descriptor(ratio: f32, a: &str, b: &str) -> String {
    if ratio < 0.35 {
        format!("blend of {} and {}, mostly {}", a, b, a)
    } else if ratio <= 0.65 {
        format!("balanced blend of {} and {}", a, b)
    } else {
        format!("blend of {} and {}, mostly {}", a, b, b)
    }
}

impl VariationStrategy {
    /// The lineage node type this strategy produces.
    pub fn variation_type(&self) -> VariationType {
        match self {
            VariationStrategy::ParameterShift(_) => VariationType::ParameterShift,
            VariationStrategy::StyleTransfer { .. } => VariationType::StyleTransfer,
            VariationStrategy::Evolve { .. } => VariationType::Evolve,
            VariationStrategy::Mutate { .. } => VariationType::Mutate,
            VariationStrategy::Combine { .. } => VariationType::Combine,
        }
    }

    /// Range-check the configuration. Called before any side effect.
    pub fn validate(&self) -> Result<(), DerivationError> {
        match self {
            VariationStrategy::ParameterShift(shifts) => {
                if shifts.intensity.unsigned_abs() > 100
                    || shifts.texture.unsigned_abs() > 100
                    || shifts.noisiness.unsigned_abs() > 100
                {
                    return Err(DerivationError::Validation(
                        "parameter shifts must be within [-100, 100]".to_string(),
                    ));
                }
                if !shifts.brightness.is_finite() || shifts.brightness.abs() > 2.0 {
                    return Err(DerivationError::Validation(
                        "brightness shift must be within [-2.0, 2.0]".to_string(),
                    ));
                }
                if shifts.bpm.unsigned_abs() > 280 {
                    return Err(DerivationError::Validation(
                        "bpm shift must be within [-280, 280]".to_string(),
                    ));
                }
                Ok(())
            }
            VariationStrategy::StyleTransfer { style } => {
                if style.trim().is_empty() {
                    return Err(DerivationError::Validation(
                        "style transfer requires a non-empty style".to_string(),
                    ));
                }
                Ok(())
            }
            VariationStrategy::Evolve { evolution_strength } => {
                if !(0.1..=0.5).contains(evolution_strength) {
                    return Err(DerivationError::Validation(format!(
                        "evolution_strength must be in [0.1, 0.5], got {}",
                        evolution_strength
                    )));
                }
                Ok(())
            }
            VariationStrategy::Mutate { mutation_rate, .. } => {
                if !(0.1..=0.7).contains(mutation_rate) {
                    return Err(DerivationError::Validation(format!(
                        "mutation_rate must be in [0.1, 0.7], got {}",
                        mutation_rate
                    )));
                }
                Ok(())
            }
            VariationStrategy::Combine { with_sound_id } => {
                if with_sound_id.trim().is_empty() {
                    return Err(DerivationError::Validation(
                        "combine requires a second sound id".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Compute the overlay for the i-th of `total` variations.
    pub fn plan(&self, ctx: &StrategyContext) -> Result<VariationPlan, DerivationError> {
        let parent = &ctx.parent.parameters;
        match self {
            VariationStrategy::ParameterShift(shifts) => {
                let fraction = shift_fraction(ctx.index, ctx.total);
                let mut parameters = parent.clone();
                parameters.intensity = clamp_scale(
                    parent.intensity as i32 + (shifts.intensity as f32 * fraction).round() as i32,
                );
                parameters.texture = clamp_scale(
                    parent.texture as i32 + (shifts.texture as f32 * fraction).round() as i32,
                );
                parameters.noisiness = clamp_scale(
                    parent.noisiness as i32 + (shifts.noisiness as f32 * fraction).round() as i32,
                );
                parameters.brightness =
                    clamp_brightness(parent.brightness + shifts.brightness * fraction);
                parameters.bpm = parent.bpm.map(|bpm| {
                    clamp_bpm(bpm as i32 + (shifts.bpm as f32 * fraction).round() as i32)
                });
                parameters.seed = None;
                Ok(VariationPlan {
                    parameters,
                    prompt_suffix: SHIFT_SUFFIX.to_string(),
                })
            }
            VariationStrategy::StyleTransfer { style } => {
                let mut parameters = parent.clone();
                parameters.seed = None;
                Ok(VariationPlan {
                    parameters,
                    prompt_suffix: format!("in the style of {}", style.trim()),
                })
            }
            VariationStrategy::Evolve { evolution_strength } => {
                let phase = evolve_phase(ctx.index, ctx.total);
                let divergence = evolution_strength * phase;
                let mut parameters = parent.clone();
                parameters.intensity =
                    clamp_scale(parent.intensity as i32 - (25.0 * divergence).round() as i32);
                parameters.texture =
                    clamp_scale(parent.texture as i32 + (40.0 * divergence).round() as i32);
                parameters.noisiness =
                    clamp_scale(parent.noisiness as i32 + (30.0 * divergence).round() as i32);
                parameters.brightness = clamp_brightness(parent.brightness + 0.5 * divergence);
                parameters.seed = None;
                Ok(VariationPlan {
                    parameters,
                    prompt_suffix: evolve_stage_suffix(phase).to_string(),
                })
            }
            VariationStrategy::Mutate {
                mutation_rate,
                preserve_core,
            } => {
                let mut rng = rand::rng();
                let scale_span = (mutation_rate * 50.0).round() as i32;
                let bpm_span = (mutation_rate * 30.0).round() as i32;

                let mut parameters = parent.clone();
                parameters.texture = clamp_scale(
                    parent.texture as i32 + rng.random_range(-scale_span..=scale_span),
                );
                parameters.noisiness = clamp_scale(
                    parent.noisiness as i32 + rng.random_range(-scale_span..=scale_span),
                );
                parameters.brightness = clamp_brightness(
                    parent.brightness + rng.random_range(-mutation_rate..=*mutation_rate),
                );
                if !preserve_core {
                    parameters.intensity = clamp_scale(
                        parent.intensity as i32 + rng.random_range(-scale_span..=scale_span),
                    );
                    parameters.bpm = parent
                        .bpm
                        .map(|bpm| clamp_bpm(bpm as i32 + rng.random_range(-bpm_span..=bpm_span)));
                }
                parameters.seed = None;
                Ok(VariationPlan {
                    parameters,
                    prompt_suffix: MUTATE_SUFFIX.to_string(),
                })
            }
            VariationStrategy::Combine { .. } => {
                let other = ctx.combine_source.ok_or_else(|| {
                    DerivationError::Validation(
                        "combine requires a resolved second source sound".to_string(),
                    )
                })?;
                let b = &other.parameters;
                let ratio = blend_ratio(ctx.index, ctx.total);

                let mut mood_tags = parent.mood_tags.clone();
                for tag in &b.mood_tags {
                    push_tag(&mut mood_tags, tag);
                }

                let bpm = match (parent.bpm, b.bpm) {
                    (Some(a), Some(b)) => {
                        Some(clamp_bpm(lerp(a as f32, b as f32, ratio).round() as i32))
                    }
                    (Some(a), None) => Some(a),
                    (None, Some(b)) => Some(b),
                    (None, None) => None,
                };
                let key = if ratio <= 0.5 {
                    parent.key.clone().or_else(|| b.key.clone())
                } else {
                    b.key.clone().or_else(|| parent.key.clone())
                };

                let parameters = SoundParameters {
                    // The blend stays in parent A's family
                    sound_type: parent.sound_type,
                    intensity: lerp_scale(parent.intensity, b.intensity, ratio),
                    texture: lerp_scale(parent.texture, b.texture, ratio),
                    noisiness: lerp_scale(parent.noisiness, b.noisiness, ratio),
                    brightness: clamp_brightness(lerp(parent.brightness, b.brightness, ratio)),
                    mood_tags,
                    length_seconds: lerp(parent.length_seconds, b.length_seconds, ratio),
                    bpm,
                    key,
                    seed: None,
                };
                Ok(VariationPlan {
                    parameters,
                    prompt_suffix: blend_descriptor(
                        ratio,
                        &ctx.parent.display_name(),
                        &other.display_name(),
                    ),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{GenerationStatus, SoundType};

    fn make_parent() -> SoundGeneration {
        SoundGeneration {
            id: "parent".to_string(),
            prompt: "punchy kick drum".to_string(),
            created_at: 0,
            parameters: SoundParameters {
                sound_type: SoundType::Percussion,
                intensity: 50,
                texture: 40,
                noisiness: 30,
                brightness: 0.0,
                mood_tags: vec!["punchy".to_string()],
                length_seconds: 2.0,
                bpm: Some(120),
                key: Some("C minor".to_string()),
                seed: Some(7),
            },
            audio_url: Some("https://cdn.example/parent.mp3".to_string()),
            status: GenerationStatus::Ready,
            provenance_id: None,
            variant_of: None,
            name: Some("Kick A".to_string()),
            collection: None,
        }
    }

    fn make_other() -> SoundGeneration {
        let mut other = make_parent();
        other.id = "other".to_string();
        other.name = Some("Kick B".to_string());
        other.parameters.sound_type = SoundType::Bass;
        other.parameters.intensity = 100;
        other.parameters.texture = 0;
        other.parameters.noisiness = 90;
        other.parameters.brightness = 1.0;
        other.parameters.bpm = Some(140);
        other.parameters.key = Some("A minor".to_string());
        other.parameters.mood_tags = vec!["punchy".to_string(), "deep".to_string()];
        other
    }

    fn ctx<'a>(
        parent: &'a SoundGeneration,
        other: Option<&'a SoundGeneration>,
        index: usize,
        total: usize,
    ) -> StrategyContext<'a> {
        StrategyContext {
            parent,
            combine_source: other,
            index,
            total,
        }
    }

    #[test]
    fn test_shift_single_variation_uses_full_magnitude() {
        let parent = make_parent();
        let strategy = VariationStrategy::ParameterShift(ParameterShifts {
            intensity: 20,
            texture: -10,
            noisiness: 0,
            brightness: 0.5,
            bpm: 10,
        });

        let plan = strategy.plan(&ctx(&parent, None, 0, 1)).unwrap();
        assert_eq!(plan.parameters.intensity, 70);
        assert_eq!(plan.parameters.texture, 30);
        assert_eq!(plan.parameters.noisiness, 30);
        assert_eq!(plan.parameters.brightness, 0.5);
        assert_eq!(plan.parameters.bpm, Some(130));
        assert_eq!(plan.prompt_suffix, "with adjusted parameters");
    }

    #[test]
    fn test_shift_ramps_from_zero_to_full() {
        let parent = make_parent();
        let strategy = VariationStrategy::ParameterShift(ParameterShifts {
            intensity: 30,
            ..Default::default()
        });

        let first = strategy.plan(&ctx(&parent, None, 0, 4)).unwrap();
        let last = strategy.plan(&ctx(&parent, None, 3, 4)).unwrap();
        assert_eq!(first.parameters.intensity, 50);
        assert_eq!(last.parameters.intensity, 80);
    }

    #[test]
    fn test_shift_reclamps_to_bounds() {
        let mut parent = make_parent();
        parent.parameters.intensity = 95;
        parent.parameters.brightness = 0.9;
        let strategy = VariationStrategy::ParameterShift(ParameterShifts {
            intensity: 50,
            brightness: 1.0,
            ..Default::default()
        });

        let plan = strategy.plan(&ctx(&parent, None, 0, 1)).unwrap();
        assert_eq!(plan.parameters.intensity, 100);
        assert_eq!(plan.parameters.brightness, 1.0);
    }

    #[test]
    fn test_style_transfer_leaves_parameters_untouched() {
        let parent = make_parent();
        let strategy = VariationStrategy::StyleTransfer {
            style: "vintage tape".to_string(),
        };

        let plan = strategy.plan(&ctx(&parent, None, 0, 3)).unwrap();
        assert_eq!(plan.parameters.intensity, parent.parameters.intensity);
        assert_eq!(plan.parameters.texture, parent.parameters.texture);
        assert_eq!(plan.parameters.bpm, parent.parameters.bpm);
        assert!(plan.parameters.seed.is_none());
        assert_eq!(plan.prompt_suffix, "in the style of vintage tape");
    }

    #[test]
    fn test_evolve_stage_suffixes() {
        let parent = make_parent();
        let strategy = VariationStrategy::Evolve {
            evolution_strength: 0.5,
        };

        // 11 variations: phases 0.0, 0.1, ..., 1.0
        let early = strategy.plan(&ctx(&parent, None, 0, 11)).unwrap();
        let mid = strategy.plan(&ctx(&parent, None, 5, 11)).unwrap();
        let late = strategy.plan(&ctx(&parent, None, 10, 11)).unwrap();
        assert_eq!(early.prompt_suffix, "subtle evolution, early stage");
        assert_eq!(mid.prompt_suffix, "mid evolution, developing");
        assert_eq!(late.prompt_suffix, "evolved form, refined");
    }

    #[test]
    fn test_evolve_divergence_is_monotone() {
        let parent = make_parent();
        let strategy = VariationStrategy::Evolve {
            evolution_strength: 0.5,
        };

        let mut last_texture = parent.parameters.texture;
        let mut last_intensity = parent.parameters.intensity;
        for index in 0..5 {
            let plan = strategy.plan(&ctx(&parent, None, index, 5)).unwrap();
            assert!(plan.parameters.texture >= last_texture);
            assert!(plan.parameters.intensity <= last_intensity);
            last_texture = plan.parameters.texture;
            last_intensity = plan.parameters.intensity;
        }
        // First variation (phase 0) is the parent unchanged
        let first = strategy.plan(&ctx(&parent, None, 0, 5)).unwrap();
        assert_eq!(first.parameters.texture, parent.parameters.texture);
    }

    #[test]
    fn test_mutate_preserve_core_pins_intensity_and_bpm() {
        let parent = make_parent();
        let strategy = VariationStrategy::Mutate {
            mutation_rate: 0.7,
            preserve_core: true,
        };

        for index in 0..20 {
            let plan = strategy.plan(&ctx(&parent, None, index, 20)).unwrap();
            assert_eq!(plan.parameters.intensity, parent.parameters.intensity);
            assert_eq!(plan.parameters.bpm, parent.parameters.bpm);
        }
    }

    #[test]
    fn test_mutate_perturbations_stay_bounded() {
        let parent = make_parent();
        let rate = 0.2_f32;
        let strategy = VariationStrategy::Mutate {
            mutation_rate: rate,
            preserve_core: false,
        };

        let span = (rate * 50.0).round() as i32;
        let bpm_span = (rate * 30.0).round() as i32;
        for index in 0..50 {
            let plan = strategy.plan(&ctx(&parent, None, index, 50)).unwrap();
            let p = &plan.parameters;
            assert!((p.texture as i32 - parent.parameters.texture as i32).abs() <= span);
            assert!((p.noisiness as i32 - parent.parameters.noisiness as i32).abs() <= span);
            assert!((p.intensity as i32 - parent.parameters.intensity as i32).abs() <= span);
            assert!((p.brightness - parent.parameters.brightness).abs() <= rate + f32::EPSILON);
            let bpm_delta = p.bpm.unwrap() as i32 - parent.parameters.bpm.unwrap() as i32;
            assert!(bpm_delta.abs() <= bpm_span);
            assert_eq!(plan.prompt_suffix, "experimental mutation, unexpected elements");
        }
    }

    #[test]
    fn test_combine_single_variation_is_midpoint() {
        let parent = make_parent();
        let other = make_other();
        let strategy = VariationStrategy::Combine {
            with_sound_id: other.id.clone(),
        };

        let plan = strategy.plan(&ctx(&parent, Some(&other), 0, 1)).unwrap();
        assert_eq!(plan.parameters.intensity, 75); // midpoint of 50 and 100
        assert_eq!(plan.parameters.bpm, Some(130)); // midpoint of 120 and 140
        assert!(plan.prompt_suffix.contains("balanced blend"));
    }

    #[test]
    fn test_combine_ratios_span_pure_a_to_pure_b() {
        let parent = make_parent();
        let other = make_other();
        let strategy = VariationStrategy::Combine {
            with_sound_id: other.id.clone(),
        };

        let first = strategy.plan(&ctx(&parent, Some(&other), 0, 3)).unwrap();
        let middle = strategy.plan(&ctx(&parent, Some(&other), 1, 3)).unwrap();
        let last = strategy.plan(&ctx(&parent, Some(&other), 2, 3)).unwrap();

        assert_eq!(first.parameters.intensity, parent.parameters.intensity);
        assert_eq!(middle.parameters.intensity, 75);
        assert_eq!(last.parameters.intensity, other.parameters.intensity);
        assert!(first.prompt_suffix.contains("mostly Kick A"));
        assert!(last.prompt_suffix.contains("mostly Kick B"));
    }

    #[test]
    fn test_combine_unions_mood_tags_and_keeps_parent_type() {
        let parent = make_parent();
        let other = make_other();
        let strategy = VariationStrategy::Combine {
            with_sound_id: other.id.clone(),
        };

        let plan = strategy.plan(&ctx(&parent, Some(&other), 0, 1)).unwrap();
        assert_eq!(plan.parameters.mood_tags, vec!["punchy", "deep"]);
        assert_eq!(plan.parameters.sound_type, SoundType::Percussion);
    }

    #[test]
    fn test_combine_bpm_falls_back_to_present_side() {
        let mut parent = make_parent();
        parent.parameters.bpm = None;
        let other = make_other();
        let strategy = VariationStrategy::Combine {
            with_sound_id: other.id.clone(),
        };

        let plan = strategy.plan(&ctx(&parent, Some(&other), 0, 1)).unwrap();
        assert_eq!(plan.parameters.bpm, Some(140));
    }

    #[test]
    fn test_combine_without_resolved_source_errors() {
        let parent = make_parent();
        let strategy = VariationStrategy::Combine {
            with_sound_id: "other".to_string(),
        };
        let result = strategy.plan(&ctx(&parent, None, 0, 1));
        assert!(matches!(result, Err(DerivationError::Validation(_))));
    }

    #[test]
    fn test_validate_ranges() {
        assert!(VariationStrategy::Evolve {
            evolution_strength: 0.3
        }
        .validate()
        .is_ok());
        assert!(VariationStrategy::Evolve {
            evolution_strength: 0.05
        }
        .validate()
        .is_err());
        assert!(VariationStrategy::Evolve {
            evolution_strength: 0.6
        }
        .validate()
        .is_err());

        assert!(VariationStrategy::Mutate {
            mutation_rate: 0.7,
            preserve_core: false
        }
        .validate()
        .is_ok());
        assert!(VariationStrategy::Mutate {
            mutation_rate: 0.8,
            preserve_core: false
        }
        .validate()
        .is_err());

        assert!(VariationStrategy::StyleTransfer {
            style: "  ".to_string()
        }
        .validate()
        .is_err());

        assert!(VariationStrategy::ParameterShift(ParameterShifts {
            intensity: 120,
            ..Default::default()
        })
        .validate()
        .is_err());

        assert!(VariationStrategy::Combine {
            with_sound_id: "".to_string()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_variation_type_mapping() {
        assert_eq!(
            VariationStrategy::ParameterShift(ParameterShifts::default()).variation_type(),
            VariationType::ParameterShift
        );
        assert_eq!(
            VariationStrategy::Combine {
                with_sound_id: "x".to_string()
            }
            .variation_type(),
            VariationType::Combine
        );
    }
}
