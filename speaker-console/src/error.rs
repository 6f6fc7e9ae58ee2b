//! Error types for the speaker console
//!
//! `PlaybackError` is the operator-facing taxonomy: every variant maps to a
//! message dialog or status line and unwinds the engine to idle without
//! touching store state. Everything else folds into the crate-wide `Error`.

use speaker_common::FetchError;
use thiserror::Error;

/// Playback precondition and runtime failures shown to the operator
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// No announcement row is selected
    #[error("no announcement selected")]
    NoSelection,

    /// A contextual field the announcement text requires is missing
    #[error("required field missing: {0}")]
    MissingData(String),

    /// No language ticked for the selected row
    #[error("at least one language must be selected")]
    NoLanguage,

    /// No playback zone ticked for the selected row
    #[error("at least one zone must be selected")]
    NoZone,

    /// The render endpoint returned zero bytes
    #[error("rendered audio file is empty")]
    EmptyFile,

    /// The output device could not be opened, even degraded
    #[error("audio output device unavailable")]
    DeviceUnavailable,

    /// A playback session is already active
    #[error("an announcement is already playing")]
    AlreadyPlaying,
}

/// Main error type for the console
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file loading errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Collaborator request failures
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Operator-facing playback failures
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// Audio decoding errors
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("audio output error: {0}")]
    AudioOutput(String),

    /// File I/O errors
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The playback variant, if this error is one.
    pub fn as_playback(&self) -> Option<&PlaybackError> {
        match self {
            Error::Playback(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience Result type using the console Error
pub type Result<T> = std::result::Result<T, Error>;
