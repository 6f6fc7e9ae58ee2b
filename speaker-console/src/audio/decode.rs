//! Announcement clip decoding using symphonia
//!
//! The render endpoint produces WAV or MP3; either way the whole clip is
//! decoded to interleaved stereo f32 so the exact duration is known before
//! playback starts.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::debug;

use crate::error::{Error, Result};

/// Fully decoded announcement clip.
#[derive(Debug, Clone)]
pub struct DecodedClip {
    /// Interleaved stereo f32 samples [L, R, L, R, ...]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    /// Exact clip duration derived from the decoded frame count.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Mono mix for zone-mapped playback: one sample per frame.
    pub fn to_mono(&self) -> Vec<f32> {
        self.samples
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) * 0.5)
            .collect()
    }
}

/// Decode an audio file completely.
pub fn decode_file(path: &Path) -> Result<DecodedClip> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(ext.to_str().unwrap_or(""));
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("unrecognized audio format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| Error::Decode("no audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("unsupported codec: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(Error::Decode(format!("packet read failed: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| Error::Decode(format!("decode failed: {e}")))?;
        append_stereo(&decoded, &mut samples)?;
    }

    debug!(
        frames = samples.len() / 2,
        sample_rate, "decoded announcement clip"
    );

    Ok(DecodedClip {
        samples,
        sample_rate,
    })
}

/// Convert one decoded buffer to interleaved stereo f32.
fn append_stereo(buffer: &AudioBufferRef, out: &mut Vec<f32>) -> Result<()> {
    match buffer {
        AudioBufferRef::F32(buf) => append_converted(buf.as_ref(), |s| s, out),
        AudioBufferRef::F64(buf) => append_converted(buf.as_ref(), |s| s as f32, out),
        AudioBufferRef::S32(buf) => {
            append_converted(buf.as_ref(), |s| s as f32 / i32::MAX as f32, out)
        }
        AudioBufferRef::S16(buf) => {
            append_converted(buf.as_ref(), |s| s as f32 / i16::MAX as f32, out)
        }
        AudioBufferRef::U16(buf) => {
            append_converted(buf.as_ref(), |s| (s as i32 - 32768) as f32 / 32768.0, out)
        }
        AudioBufferRef::U8(buf) => {
            append_converted(buf.as_ref(), |s| (s as i32 - 128) as f32 / 128.0, out)
        }
        _ => Err(Error::Decode(
            "unsupported sample format in rendered clip".to_string(),
        )),
    }
}

/// Interleave a planar buffer into stereo, converting samples to f32.
///
/// Mono duplicates to both channels; more than two channels downmix by
/// averaging even channels left and odd channels right.
fn append_converted<S, F>(buf: &AudioBuffer<S>, to_f32: F, out: &mut Vec<f32>) -> Result<()>
where
    S: Sample + Copy,
    F: Fn(S) -> f32,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    out.reserve(frames * 2);

    match channels {
        0 => {}
        1 => {
            let mono = buf.chan(0);
            for &sample in &mono[..frames] {
                let s = to_f32(sample);
                out.push(s);
                out.push(s);
            }
        }
        2 => {
            let left = buf.chan(0);
            let right = buf.chan(1);
            for i in 0..frames {
                out.push(to_f32(left[i]));
                out.push(to_f32(right[i]));
            }
        }
        _ => {
            for i in 0..frames {
                let mut left_sum = 0.0f32;
                let mut right_sum = 0.0f32;
                for ch in 0..channels {
                    let s = to_f32(buf.chan(ch)[i]);
                    if ch % 2 == 0 {
                        left_sum += s;
                    } else {
                        right_sum += s;
                    }
                }
                let half = (channels as f32 / 2.0).max(1.0);
                out.push(left_sum / half);
                out.push(right_sum / half);
            }
        }
    }
    Ok(())
}
