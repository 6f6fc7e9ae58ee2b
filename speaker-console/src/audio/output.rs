//! Zone-mapped audio output using cpal
//!
//! A clip plays as a mono signal copied onto the hardware channels of the
//! selected zones; every other channel gets silence. The cpal `Stream` is
//! not `Send`, so each playback session spawns one dedicated thread that
//! builds the stream, keeps it alive, and tears it down on a stop command
//! or when the backstop timeout elapses.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, StreamConfig};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Find the configured output device.
///
/// `name` is matched as a prefix of the device name, the way operators
/// configure hardware ("Speakers (USB Audio)" vs the OS's decorated
/// variants). None selects the system default device.
pub fn find_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(prefix) => {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("failed to enumerate devices: {e}")))?;
            devices
                .find(|d| {
                    d.name()
                        .map(|n| n.starts_with(prefix))
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    Error::AudioOutput(format!("output device '{prefix}' not found"))
                })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("no default output device".to_string())),
    }
}

/// Negotiated stream parameters for one playback session.
#[derive(Debug, Clone)]
pub struct NegotiatedOutput {
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
}

impl NegotiatedOutput {
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

/// Pick a device configuration able to carry the given channel mapping at
/// the desired sample rate.
///
/// Prefers f32 output; falls back to any sample format, then to the
/// device's default configuration when the desired rate is unsupported.
/// Fails only when no configuration reaches every mapped channel.
pub fn negotiate(device: &Device, desired_rate: u32, mapping: &[u16]) -> Result<NegotiatedOutput> {
    let needed = mapping.iter().max().map(|&c| c + 1).unwrap_or(1);

    let ranges: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| Error::AudioOutput(format!("failed to query device configs: {e}")))?
        .collect();

    let rate_fits = |r: &cpal::SupportedStreamConfigRange| {
        r.min_sample_rate().0 <= desired_rate && r.max_sample_rate().0 >= desired_rate
    };

    let picked = ranges
        .iter()
        .find(|r| r.channels() >= needed && rate_fits(r) && r.sample_format() == SampleFormat::F32)
        .or_else(|| ranges.iter().find(|r| r.channels() >= needed && rate_fits(r)))
        .cloned();

    if let Some(range) = picked {
        let sample_format = range.sample_format();
        let config = range.with_sample_rate(SampleRate(desired_rate)).config();
        debug!(
            channels = config.channels,
            sample_rate = config.sample_rate.0,
            ?sample_format,
            "negotiated output config"
        );
        return Ok(NegotiatedOutput {
            config,
            sample_format,
        });
    }

    // Desired rate unsupported: take the default config if it still
    // reaches every mapped channel. The clip gets resampled to its rate.
    let default = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("failed to get default config: {e}")))?;
    if default.channels() >= needed {
        warn!(
            desired_rate,
            actual_rate = default.sample_rate().0,
            "device does not support the configured sample rate; using its default"
        );
        let sample_format = default.sample_format();
        return Ok(NegotiatedOutput {
            config: default.config(),
            sample_format,
        });
    }

    Err(Error::AudioOutput(format!(
        "no output configuration reaches channel {} on this device",
        needed - 1
    )))
}

/// Handle to a running playback thread.
#[derive(Debug)]
pub struct PlaybackHandle {
    stop_tx: mpsc::Sender<()>,
}

impl PlaybackHandle {
    /// Interrupt playback immediately. Idempotent; the thread may already
    /// have exited on its own.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

/// Write one callback buffer: the mono signal goes to every mapped
/// channel, silence everywhere else. Past the end of the clip the buffer
/// fills with silence.
fn fill_frames(
    data: &mut [f32],
    channels: usize,
    mapping: &[u16],
    mono: &[f32],
    position: &mut usize,
) {
    for frame in data.chunks_mut(channels) {
        let sample = mono.get(*position).copied().unwrap_or(0.0);
        frame.fill(0.0);
        for &ch in mapping {
            if let Some(slot) = frame.get_mut(ch as usize) {
                *slot = sample;
            }
        }
        *position += 1;
    }
}

/// Start playback of a preloaded mono clip on the mapped channels.
///
/// The stream lives on its own thread until `PlaybackHandle::stop` is
/// called or `hold` elapses (a backstop in case the completion timer never
/// fires). Resolves once the stream is actually playing.
pub async fn start_mapped_playback(
    device: Device,
    output: NegotiatedOutput,
    mono: Vec<f32>,
    mapping: Vec<u16>,
    hold: Duration,
) -> Result<PlaybackHandle> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<Result<()>>();

    thread::Builder::new()
        .name("announcement-playback".to_string())
        .spawn(move || {
            let stream = build_stream(&device, &output, mono, mapping);
            match stream {
                Ok(stream) => {
                    if let Err(e) = stream
                        .play()
                        .map_err(|e| Error::AudioOutput(format!("failed to start stream: {e}")))
                    {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));
                    // Hold the stream alive until stopped; the timeout is a
                    // backstop, the completion timer normally stops first.
                    match stop_rx.recv_timeout(hold) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {}
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            warn!("playback thread backstop timeout reached");
                        }
                    }
                    drop(stream);
                    debug!("playback thread finished");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        })
        .map_err(|e| Error::AudioOutput(format!("failed to spawn playback thread: {e}")))?;

    match ready_rx.await {
        Ok(Ok(())) => {
            info!("audio stream started");
            Ok(PlaybackHandle { stop_tx })
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(Error::AudioOutput(
            "playback thread exited before the stream started".to_string(),
        )),
    }
}

fn build_stream(
    device: &Device,
    output: &NegotiatedOutput,
    mono: Vec<f32>,
    mapping: Vec<u16>,
) -> Result<cpal::Stream> {
    let channels = output.config.channels as usize;
    let err_fn = |err| error!("audio stream error: {err}");

    let stream = match output.sample_format {
        SampleFormat::F32 => {
            let mut position = 0usize;
            device
                .build_output_stream(
                    &output.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        fill_frames(data, channels, &mapping, &mono, &mut position);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::AudioOutput(format!("failed to build stream: {e}")))?
        }
        SampleFormat::I16 => {
            let mut position = 0usize;
            let mut scratch = Vec::new();
            device
                .build_output_stream(
                    &output.config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        scratch.clear();
                        scratch.resize(data.len(), 0.0f32);
                        fill_frames(&mut scratch, channels, &mapping, &mono, &mut position);
                        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                            *dst = (src.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::AudioOutput(format!("failed to build stream: {e}")))?
        }
        format => {
            return Err(Error::AudioOutput(format!(
                "unsupported sample format: {format:?}"
            )));
        }
    };

    Ok(stream)
}
