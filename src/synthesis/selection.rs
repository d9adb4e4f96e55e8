//! Engine selection heuristic.
//!
//! A pure priority cascade from a free-text prompt plus contextual hints to
//! a recommended engine. Rules are evaluated top to bottom; each matching
//! rule contributes an ordered fallback chain, and the first available
//! candidate of the first matching rule wins. A chain whose candidates are
//! all unavailable falls through to the next matching rule.

use lazy_static::lazy_static;
use regex::Regex;

use super::engine::{Engine, EngineAvailability};

/// Contextual hints accompanying the prompt.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext {
    pub duration_seconds: f32,
    pub has_reference_audio: bool,
}

const SHORT_LOOP_MAX_SECONDS: f32 = 22.0;
const STANDARD_LOOP_MAX_SECONDS: f32 = 30.0;

const VOCAL_KEYWORDS: &[&str] = &[
    "vocal", "vocals", "voice", "voices", "sing", "singing", "sung", "choir", "speech", "spoken",
    "acapella", "vox",
];
const PERCUSSION_KEYWORDS: &[&str] = &[
    "drum", "drums", "kick", "snare", "hat", "hats", "percussion", "percussive", "beat", "beats",
    "groove",
];
const RHYTHM_KEYWORDS: &[&str] = &["bpm", "tempo", "rhythm", "rhythmic", "groove"];
const SFX_KEYWORDS: &[&str] = &[
    "sfx", "impact", "whoosh", "swoosh", "riser", "stinger", "foley", "hit", "hits",
];
const SFX_PHRASES: &[&str] = &["sound effect", "ui sound"];
const AMBIENCE_KEYWORDS: &[&str] = &[
    "ambience",
    "ambient",
    "drone",
    "atmosphere",
    "atmospheric",
    "texture",
    "textures",
    "soundscape",
    "pad",
    "pads",
];

lazy_static! {
    /// Matches an explicit tempo like "128 bpm" or "90bpm".
    static ref BPM_DIGITS: Regex = Regex::new(r"\b\d{2,3}\s*bpm\b").unwrap();
}

/// Word-level keyword match. Whole words only, so "hit" does not fire on
/// "white" and "sing" does not fire on "single".
fn contains_word(text: &str, keywords: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| keywords.contains(&word))
}

fn contains_phrase(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

fn drum_chain(duration_seconds: f32) -> &'static [Engine] {
    if duration_seconds <= SHORT_LOOP_MAX_SECONDS {
        &[
            Engine::DrumLoopShort,
            Engine::DrumLoopStandard,
            Engine::Instrumental,
        ]
    } else if duration_seconds <= STANDARD_LOOP_MAX_SECONDS {
        &[
            Engine::DrumLoopStandard,
            Engine::DrumLoopExtended,
            Engine::Instrumental,
        ]
    } else {
        &[
            Engine::DrumLoopExtended,
            Engine::LongForm,
            Engine::Instrumental,
        ]
    }
}

fn sfx_chain(duration_seconds: f32) -> &'static [Engine] {
    if duration_seconds <= SHORT_LOOP_MAX_SECONDS {
        &[Engine::SfxBurst, Engine::SfxCinematic]
    } else {
        &[Engine::SfxCinematic, Engine::SfxBurst]
    }
}

/// Recommend a synthesis engine for a prompt.
///
/// Pure function: same inputs and availability set always produce the same
/// recommendation.
pub fn recommend_engine(
    prompt: &str,
    ctx: &SelectionContext,
    availability: &EngineAvailability,
) -> Engine {
    let text = prompt.to_lowercase();
    let mentions_percussion = contains_word(&text, PERCUSSION_KEYWORDS);
    let strict_bpm = BPM_DIGITS.is_match(&text) || contains_word(&text, RHYTHM_KEYWORDS);

    let mut chains: Vec<&[Engine]> = Vec::new();
    if contains_word(&text, VOCAL_KEYWORDS) {
        chains.push(&[Engine::Vocals, Engine::Instrumental]);
    }
    if mentions_percussion && strict_bpm {
        chains.push(drum_chain(ctx.duration_seconds));
    }
    if ctx.has_reference_audio {
        chains.push(&[Engine::Resample]);
    }
    if contains_word(&text, SFX_KEYWORDS)
        || contains_phrase(&text, SFX_PHRASES)
        || mentions_percussion
    {
        chains.push(sfx_chain(ctx.duration_seconds));
    }
    if contains_word(&text, AMBIENCE_KEYWORDS) {
        chains.push(&[Engine::AmbientTexture, Engine::LongForm]);
    }
    if ctx.duration_seconds > STANDARD_LOOP_MAX_SECONDS {
        chains.push(&[Engine::LongForm, Engine::Instrumental]);
    }
    chains.push(&[Engine::Instrumental, Engine::SfxCinematic]);

    for chain in chains {
        if let Some(engine) = chain
            .iter()
            .copied()
            .find(|engine| availability.is_available(*engine))
        {
            return engine;
        }
    }
    Engine::Instrumental
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(duration_seconds: f32) -> SelectionContext {
        SelectionContext {
            duration_seconds,
            has_reference_audio: false,
        }
    }

    #[test]
    fn test_vocal_prompt_picks_vocals() {
        let engine = recommend_engine(
            "angelic choir singing",
            &ctx(10.0),
            &EngineAvailability::all_available(),
        );
        assert_eq!(engine, Engine::Vocals);
    }

    #[test]
    fn test_bpm_drum_prompt_buckets_by_duration() {
        let availability = EngineAvailability::all_available();
        assert_eq!(
            recommend_engine("128 bpm kick drum loop", &ctx(15.0), &availability),
            Engine::DrumLoopShort
        );
        assert_eq!(
            recommend_engine("128 bpm kick drum loop", &ctx(25.0), &availability),
            Engine::DrumLoopStandard
        );
        assert_eq!(
            recommend_engine("128 bpm kick drum loop", &ctx(45.0), &availability),
            Engine::DrumLoopExtended
        );
    }

    #[test]
    fn test_rhythm_keyword_counts_as_strict_bpm() {
        let engine = recommend_engine(
            "driving drum groove",
            &ctx(15.0),
            &EngineAvailability::all_available(),
        );
        assert_eq!(engine, Engine::DrumLoopShort);
    }

    #[test]
    fn test_reference_audio_picks_resample() {
        let engine = recommend_engine(
            "something like this",
            &SelectionContext {
                duration_seconds: 10.0,
                has_reference_audio: true,
            },
            &EngineAvailability::all_available(),
        );
        assert_eq!(engine, Engine::Resample);
    }

    #[test]
    fn test_percussion_without_bpm_uses_sfx_buckets() {
        let availability = EngineAvailability::all_available();
        assert_eq!(
            recommend_engine("big snare hit", &ctx(3.0), &availability),
            Engine::SfxBurst
        );
        assert_eq!(
            recommend_engine("big snare hit", &ctx(28.0), &availability),
            Engine::SfxCinematic
        );
    }

    #[test]
    fn test_ambience_prompt_picks_texture_engine() {
        let engine = recommend_engine(
            "ambient drone texture",
            &ctx(20.0),
            &EngineAvailability::all_available(),
        );
        assert_eq!(engine, Engine::AmbientTexture);
    }

    #[test]
    fn test_long_duration_picks_long_form() {
        let engine = recommend_engine(
            "mellow piano piece",
            &ctx(60.0),
            &EngineAvailability::all_available(),
        );
        assert_eq!(engine, Engine::LongForm);
    }

    #[test]
    fn test_generic_prompt_defaults_to_instrumental() {
        let engine = recommend_engine("", &ctx(10.0), &EngineAvailability::all_available());
        assert_eq!(engine, Engine::Instrumental);
    }

    #[test]
    fn test_unavailable_primary_falls_back_within_chain() {
        let availability = EngineAvailability::with_disabled([Engine::DrumLoopShort]);
        let engine = recommend_engine("128 bpm kick drum loop", &ctx(15.0), &availability);
        assert_eq!(engine, Engine::DrumLoopStandard);
    }

    #[test]
    fn test_exhausted_chain_falls_through_to_next_rule() {
        // The whole drum chain is down; the prompt still mentions
        // percussion, so the SFX rule answers next.
        let availability = EngineAvailability::with_disabled([
            Engine::DrumLoopShort,
            Engine::DrumLoopStandard,
            Engine::Instrumental,
        ]);
        let engine = recommend_engine("128 bpm kick drum loop", &ctx(15.0), &availability);
        assert_eq!(engine, Engine::SfxBurst);
    }

    #[test]
    fn test_everything_disabled_still_returns_default() {
        let availability = EngineAvailability::with_disabled(Engine::ALL.iter().copied());
        let engine = recommend_engine("anything", &ctx(5.0), &availability);
        assert_eq!(engine, Engine::Instrumental);
    }

    #[test]
    fn test_word_matching_avoids_substring_hits() {
        // "white" must not trigger the "hit" keyword, "single" not "sing"
        let availability = EngineAvailability::all_available();
        assert_eq!(
            recommend_engine("white noise bed", &ctx(10.0), &availability),
            Engine::Instrumental
        );
        assert_eq!(
            recommend_engine("a single note", &ctx(10.0), &availability),
            Engine::Instrumental
        );
    }

    #[test]
    fn test_determinism() {
        let availability = EngineAvailability::with_disabled([Engine::Vocals]);
        let first = recommend_engine("spoken word", &ctx(12.0), &availability);
        let second = recommend_engine("spoken word", &ctx(12.0), &availability);
        assert_eq!(first, second);
        assert_eq!(first, Engine::Instrumental);
    }
}
