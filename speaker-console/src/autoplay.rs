//! Autoplay scan
//!
//! A polling timer that watches the schedule for jobs whose fire time has
//! arrived and hands exactly one of them to the playback path. The scan is
//! a two-state machine: Idle (polling) and Triggering (handoff in flight).
//! It returns to Idle only when playback reports finished, so a slow render
//! or a long clip can never cause a second trigger.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Utc};
use speaker_common::api::types::ScheduleRow;
use speaker_common::events::SpeakerEvent;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::polling::PollControl;
use crate::schedule::ScheduleStore;
use crate::state::SharedState;

/// Schedule row projected down to what the scan needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoplayJob {
    pub schedule_id: String,
    pub job_datetime: NaiveDateTime,
    pub job_is_fact: bool,
    pub is_played: bool,
    pub autoplay_is_canceled: bool,
}

impl AutoplayJob {
    fn eligible(&self, now: NaiveDateTime) -> bool {
        !self.autoplay_is_canceled
            && !self.is_played
            && self.job_is_fact
            && now >= self.job_datetime
    }
}

/// Derive the job list from schedule rows, earliest fire time first.
///
/// Rows without a fire time are not jobs. The sort is stable, so rows
/// sharing a fire time keep their store order.
pub fn jobs_from_rows<'a, I>(rows: I) -> Vec<AutoplayJob>
where
    I: Iterator<Item = &'a ScheduleRow>,
{
    let mut jobs: Vec<AutoplayJob> = rows
        .filter_map(|row| {
            row.job_datetime.map(|job_datetime| AutoplayJob {
                schedule_id: row.schedule_id.clone(),
                job_datetime,
                job_is_fact: row.job_is_fact.unwrap_or(false),
                is_played: row.is_played,
                autoplay_is_canceled: row.autoplay_is_canceled,
            })
        })
        .collect();
    jobs.sort_by_key(|job| job.job_datetime);
    jobs
}

/// The earliest job due at `now`, if any.
pub fn due_job(jobs: &[AutoplayJob], now: NaiveDateTime) -> Option<&AutoplayJob> {
    jobs.iter().find(|job| job.eligible(now))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    Triggering,
}

/// Polling scanner that fires scheduled announcements.
pub struct AutoplayScheduler {
    store: Arc<RwLock<ScheduleStore>>,
    state: Arc<SharedState>,
    polling: PollControl,
    poll_interval: Duration,
    scan_state: RwLock<ScanState>,
    trigger_tx: mpsc::Sender<String>,
}

impl AutoplayScheduler {
    /// Returns the scheduler and the receiver of trigger messages
    /// (schedule ids ready to play).
    pub fn new(
        store: Arc<RwLock<ScheduleStore>>,
        state: Arc<SharedState>,
        polling: PollControl,
        poll_interval: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let scheduler = Arc::new(Self {
            store,
            state,
            polling,
            poll_interval,
            scan_state: RwLock::new(ScanState::Idle),
            trigger_tx,
        });
        (scheduler, trigger_rx)
    }

    /// Scan loop. Runs until the process shuts down.
    ///
    /// Each tick is skipped while polling is paused (an active playback
    /// session, an open dialog) or while a previous trigger is still being
    /// handled. Playback completion is observed on the event bus.
    pub async fn run(self: Arc<Self>) {
        let mut tick = interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events = self.state.subscribe();

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if !self.state.autoplay_enabled() || self.polling.is_paused() {
                        continue;
                    }
                    if *self.scan_state.read().await == ScanState::Triggering {
                        continue;
                    }
                    self.scan().await;
                }
                event = events.recv() => {
                    match event {
                        Ok(SpeakerEvent::PlaybackFinished { .. }) => {
                            self.playback_finished().await;
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "autoplay scan lagged behind the event bus");
                            // A finish event may be among the skipped ones.
                            self.playback_finished().await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    async fn scan(&self) {
        let due = {
            let store = self.store.read().await;
            let jobs = jobs_from_rows(store.rows_in_order());
            due_job(&jobs, Local::now().naive_local()).cloned()
        };
        let Some(job) = due else {
            return;
        };

        info!(schedule_id = %job.schedule_id, fire_time = %job.job_datetime,
            "autoplay job due");
        *self.scan_state.write().await = ScanState::Triggering;

        // Bring the row into view before the handoff.
        self.store.write().await.select(&job.schedule_id);
        self.state.emit(SpeakerEvent::AutoplayTriggered {
            schedule_id: job.schedule_id.clone(),
            timestamp: Utc::now(),
        });

        if self.trigger_tx.send(job.schedule_id).await.is_err() {
            debug!("trigger receiver gone; returning scan to idle");
            *self.scan_state.write().await = ScanState::Idle;
        }
    }

    /// Called when playback reports finished (any path); re-arms the scan.
    pub async fn playback_finished(&self) {
        let mut scan_state = self.scan_state.write().await;
        if *scan_state == ScanState::Triggering {
            debug!("autoplay handoff complete; scan idle again");
        }
        *scan_state = ScanState::Idle;
    }
}
