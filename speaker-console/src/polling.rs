//! Centralized polling pause/resume
//!
//! The schedule refresh, background refresh, and autoplay scan timers must
//! all stand down while a playback session holds the device and temp file.
//! Instead of each call site stopping and restarting timers, the timers
//! keep ticking and check one shared guard; pausing is a scoped resource
//! that cannot leak a stopped timer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared pause counter for all polling timers.
#[derive(Debug, Clone, Default)]
pub struct PollControl {
    paused: Arc<AtomicUsize>,
}

impl PollControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while at least one pause guard is alive.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire) > 0
    }

    /// Suspend polling until the returned guard is dropped.
    #[must_use = "polling resumes when the guard is dropped"]
    pub fn pause(&self) -> PollPause {
        self.paused.fetch_add(1, Ordering::AcqRel);
        PollPause {
            paused: Arc::clone(&self.paused),
        }
    }
}

/// RAII pause guard; resumes polling on drop.
#[derive(Debug)]
pub struct PollPause {
    paused: Arc<AtomicUsize>,
}

impl Drop for PollPause {
    fn drop(&mut self) {
        self.paused.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_and_resume() {
        let control = PollControl::new();
        assert!(!control.is_paused());

        let guard = control.pause();
        assert!(control.is_paused());

        drop(guard);
        assert!(!control.is_paused());
    }

    #[test]
    fn nested_pauses_resume_only_when_all_released() {
        let control = PollControl::new();
        let a = control.pause();
        let b = control.pause();

        drop(a);
        assert!(control.is_paused());

        drop(b);
        assert!(!control.is_paused());
    }

    #[test]
    fn clones_share_the_counter() {
        let control = PollControl::new();
        let clone = control.clone();

        let _guard = control.pause();
        assert!(clone.is_paused());
    }
}
