//! # Announcement Speaker Console (speaker-console)
//!
//! Headless core of an airport public-announcement station.
//!
//! **Purpose:** Fetch flight and background announcement schedules from the
//! collaborator service, track operator selection, render announcements to
//! audio server-side, and play them over a multi-zone output device, with
//! a timer-driven autoplay mode.
//!
//! **Architecture:** tokio event loop + one dedicated playback thread per
//! session (the cpal stream is not `Send`), polling timers gated by a
//! shared pause guard.

pub mod app;
pub mod audio;
pub mod autoplay;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod playback;
pub mod polling;
pub mod schedule;
pub mod state;

pub use error::{Error, PlaybackError, Result};
pub use state::SharedState;
