//! Sample-rate conversion using rubato
//!
//! The rendered clip arrives at whatever rate the collaborator produced;
//! the output device runs at the configured rate. Clips are short, so the
//! whole signal is converted in one pass.

use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

use crate::error::{Error, Result};

/// Resample interleaved audio to the target rate.
///
/// Returns the input unchanged when the rates already match.
pub fn resample(input: &[f32], input_rate: u32, output_rate: u32, channels: u16) -> Result<Vec<f32>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }
    if input.is_empty() {
        return Ok(Vec::new());
    }

    debug!(input_rate, output_rate, channels, "resampling clip");

    let planar_input = deinterleave(input, channels);
    let input_frames = planar_input[0].len();

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input_frames,
        channels as usize,
    )
    .map_err(|e| Error::Decode(format!("failed to create resampler: {e}")))?;

    let planar_output = resampler
        .process(&planar_input, None)
        .map_err(|e| Error::Decode(format!("resampling failed: {e}")))?;

    Ok(interleave(planar_output))
}

/// [L, R, L, R, ...] → [[L, L, ...], [R, R, ...]]
fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let num_channels = channels as usize;
    let num_frames = samples.len() / num_channels;

    let mut planar = vec![Vec::with_capacity(num_frames); num_channels];
    for frame_idx in 0..num_frames {
        for ch_idx in 0..num_channels {
            planar[ch_idx].push(samples[frame_idx * num_channels + ch_idx]);
        }
    }
    planar
}

/// [[L, L, ...], [R, R, ...]] → [L, R, L, R, ...]
fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
    if planar.is_empty() {
        return Vec::new();
    }
    let num_channels = planar.len();
    let num_frames = planar[0].len();

    let mut interleaved = Vec::with_capacity(num_frames * num_channels);
    for frame_idx in 0..num_frames {
        for channel in &planar {
            interleaved.push(channel[frame_idx]);
        }
    }
    interleaved
}
