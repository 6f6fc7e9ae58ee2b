//! Shared console state
//!
//! Thread-safe state shared by every component: coarse play state, the
//! global autoplay switch, and the event bus the GUI subscribes to.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use speaker_common::events::{EventBus, PlayState, SpeakerEvent};
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info};

/// State accessible by all components
pub struct SharedState {
    /// Coarse playback state (Idle or Playing)
    play_state: RwLock<PlayState>,

    /// Global autoplay switch; scanning stops entirely when false
    autoplay_enabled: AtomicBool,

    /// Event broadcaster for the UI layer
    events: EventBus,
}

impl SharedState {
    pub fn new(autoplay_enabled: bool) -> Self {
        Self {
            play_state: RwLock::new(PlayState::Idle),
            autoplay_enabled: AtomicBool::new(autoplay_enabled),
            events: EventBus::new(),
        }
    }

    pub async fn play_state(&self) -> PlayState {
        *self.play_state.read().await
    }

    pub async fn set_play_state(&self, state: PlayState) {
        *self.play_state.write().await = state;
    }

    pub fn autoplay_enabled(&self) -> bool {
        self.autoplay_enabled.load(Ordering::Relaxed)
    }

    pub fn set_autoplay_enabled(&self, enabled: bool) {
        self.autoplay_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Broadcast an event to all subscribers.
    pub fn emit(&self, event: SpeakerEvent) {
        self.events.emit(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeakerEvent> {
        self.events.subscribe()
    }

    /// Status-bar message: logged and broadcast, never fatal.
    pub fn status(&self, text: impl Into<String>, is_error: bool) {
        let text = text.into();
        if is_error {
            error!("{text}");
        } else {
            info!("{text}");
        }
        self.events.emit(SpeakerEvent::StatusMessage {
            text,
            is_error,
            timestamp: Utc::now(),
        });
    }
}
