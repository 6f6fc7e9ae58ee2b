//! Audio pipeline: decode → resample → zone-mapped output
//!
//! Announcement clips are short, so the whole file is decoded into memory
//! before the device opens; the output thread then feeds the callback from
//! a preloaded buffer.

pub mod decode;
pub mod output;
pub mod resampler;

pub use decode::{decode_file, DecodedClip};
pub use output::{find_device, negotiate, start_mapped_playback, PlaybackHandle};
pub use resampler::resample;
