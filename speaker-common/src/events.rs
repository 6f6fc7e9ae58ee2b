//! Console event bus
//!
//! The core broadcasts typed events; the GUI layer (out of scope here)
//! subscribes and renders them. This replaces the original's signal/slot
//! chains with one observable surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which announcement table an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Schedule,
    Background,
}

/// Coarse playback state of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Idle,
    Playing,
}

/// Events emitted by the console core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpeakerEvent {
    /// Transient status-bar message (never fatal)
    StatusMessage {
        text: String,
        is_error: bool,
        timestamp: DateTime<Utc>,
    },

    /// A table finished a full refresh
    ScheduleRefreshed {
        table: TableKind,
        rows: usize,
        timestamp: DateTime<Utc>,
    },

    /// A single row was merged into the schedule
    RowMerged {
        schedule_id: String,
        inserted: bool,
        timestamp: DateTime<Utc>,
    },

    /// Playback began
    PlaybackStarted {
        /// None for background announcements
        schedule_id: Option<String>,
        audio_text_id: i64,
        is_autoplay: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Playback ended (manual stop, natural completion, or error unwind)
    PlaybackFinished {
        schedule_id: Option<String>,
        manual: bool,
        timestamp: DateTime<Utc>,
    },

    /// The autoplay scan fired a scheduled announcement
    AutoplayTriggered {
        schedule_id: String,
        timestamp: DateTime<Utc>,
    },
}

/// One-to-many broadcast of [`SpeakerEvent`].
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SpeakerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Emit an event; having no subscribers is not an error.
    pub fn emit(&self, event: SpeakerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeakerEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
