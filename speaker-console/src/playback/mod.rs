//! Announcement playback
//!
//! The engine owns the single playback session: render download, temp
//! file, decode, zone-mapped output, completion timer, and the stop paths.

pub mod engine;

pub use engine::{AnnouncementSource, PlaybackConfig, PlaybackEngine, PlaybackRequest};
