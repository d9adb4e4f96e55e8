//! Tempo correction using ffmpeg's atempo filter.
//!
//! A stateless utility, independent of the derivation core: callers hand in
//! encoded audio bytes and a target BPM, and get re-encoded audio stretched
//! by `target_bpm / source_bpm`. When the source tempo is unknown it is
//! inferred from a fixed empirical table bucketed by the requested BPM.

use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// A single atempo stage is only invertible within this range; ratios
/// outside it are decomposed into a chain of stages.
const STAGE_MIN: f64 = 0.5;
const STAGE_MAX: f64 = 2.0;

/// Overall sanity bounds for a correction ratio.
const RATIO_MIN: f64 = 1.0 / 16.0;
const RATIO_MAX: f64 = 16.0;

/// Ratios this close to 1.0 skip processing entirely.
const UNITY_EPSILON: f64 = 1e-3;

/// Errors that can occur during tempo correction.
#[derive(Debug, Error)]
pub enum TempoError {
    #[error("invalid BPM: {0}")]
    InvalidBpm(f64),

    #[error("stretch ratio {0} is out of range")]
    InvalidRatio(f64),

    #[error("ffmpeg failed: {0}")]
    StretchFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Infer the likely tempo of generated material when the caller doesn't
/// know it.
///
/// Empirical table bucketed by the requested BPM: generation models tend to
/// come back near loop-friendly tempos regardless of what was asked, so the
/// assumed source is the request scaled by a per-bucket factor. A request
/// for 144 infers a source around 120.
pub fn infer_source_bpm(target_bpm: f64) -> f64 {
    let factor = if target_bpm < 70.0 {
        1.5
    } else if target_bpm < 100.0 {
        1.25
    } else if target_bpm < 130.0 {
        1.0
    } else if target_bpm < 160.0 {
        0.833
    } else {
        0.667
    };
    target_bpm * factor
}

/// Decompose a stretch ratio into a chain of atempo stages, each within
/// [0.5, 2.0]: factor out 2.0 (or 0.5) repeatedly until the remainder is
/// representable, then one final corrective stage.
pub fn stretch_stages(ratio: f64) -> Result<Vec<f64>, TempoError> {
    if !ratio.is_finite() || ratio <= 0.0 || !(RATIO_MIN..=RATIO_MAX).contains(&ratio) {
        return Err(TempoError::InvalidRatio(ratio));
    }

    let mut stages = Vec::new();
    let mut remainder = ratio;
    while remainder > STAGE_MAX {
        stages.push(STAGE_MAX);
        remainder /= STAGE_MAX;
    }
    while remainder < STAGE_MIN {
        stages.push(STAGE_MIN);
        remainder /= STAGE_MIN;
    }
    stages.push(remainder);
    Ok(stages)
}

/// Render a stage chain as an ffmpeg audio filter string.
pub fn atempo_filter(stages: &[f64]) -> String {
    stages
        .iter()
        .map(|s| format!("atempo={:.6}", s))
        .collect::<Vec<_>>()
        .join(",")
}

/// Stretch encoded audio to the target BPM.
///
/// When `source_bpm` is unknown it is inferred via `infer_source_bpm`. A
/// ratio within epsilon of 1.0 returns the input unchanged. Output is
/// re-encoded as MP3.
pub async fn correct_tempo(
    input: &[u8],
    target_bpm: f64,
    source_bpm: Option<f64>,
) -> Result<Vec<u8>, TempoError> {
    if !target_bpm.is_finite() || target_bpm <= 0.0 {
        return Err(TempoError::InvalidBpm(target_bpm));
    }
    if let Some(source) = source_bpm {
        if !source.is_finite() || source <= 0.0 {
            return Err(TempoError::InvalidBpm(source));
        }
    }

    let source = source_bpm.unwrap_or_else(|| infer_source_bpm(target_bpm));
    let ratio = target_bpm / source;
    if (ratio - 1.0).abs() < UNITY_EPSILON {
        debug!(
            "Tempo correction to {} BPM is a no-op (assumed source {})",
            target_bpm, source
        );
        return Ok(input.to_vec());
    }

    let stages = stretch_stages(ratio)?;
    let filter = atempo_filter(&stages);
    debug!(
        "Stretching {} -> {} BPM (ratio {:.3}) with filter '{}'",
        source, target_bpm, ratio, filter
    );

    let mut child = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "pipe:0",
            "-filter:a",
            &filter,
            "-vn",
            "-f",
            "mp3",
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Feed stdin from a separate task; writing and reading sequentially can
    // deadlock once ffmpeg fills the stdout pipe buffer.
    let mut stdin = child.stdin.take().expect("ffmpeg stdin was piped");
    let payload = input.to_vec();
    let writer = tokio::spawn(async move {
        let _ = stdin.write_all(&payload).await;
        drop(stdin);
    });

    let output = child.wait_with_output().await?;
    let _ = writer.await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TempoError::StretchFailed(stderr.to_string()));
    }

    Ok(output.stdout)
}

/// Check if ffmpeg is available.
#[allow(dead_code)]
pub async fn check_ffmpeg_available() -> Result<(), TempoError> {
    let result = Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => Ok(()),
        _ => Err(TempoError::StretchFailed(
            "ffmpeg not found or not working".to_string(),
        )),
    }
}
