//! Application wiring
//!
//! `App` is the dependency-injection context: every component receives its
//! collaborators here, at construction, and nothing reaches for globals.
//! It owns the refresh loops, the autoplay scan, and the operations a GUI
//! layer invokes (play, stop, create, delete).

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use speaker_common::api::types::DeleteScheduleRequest;
use speaker_common::events::{SpeakerEvent, TableKind};
use speaker_common::ApiClient;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::audio;
use crate::autoplay::AutoplayScheduler;
use crate::catalog::{AnnouncementCatalog, ZoneCatalog};
use crate::config::Config;
use crate::error::Result;
use crate::history::ActionHistoryReporter;
use crate::playback::{PlaybackConfig, PlaybackEngine, PlaybackRequest};
use crate::polling::PollControl;
use crate::schedule::{BackgroundStore, ScheduleStore, Selection, SelectionState};
use crate::state::SharedState;

/// The assembled console.
pub struct App {
    config: Config,
    api: Arc<ApiClient>,
    pub state: Arc<SharedState>,
    pub zones: Arc<ZoneCatalog>,
    pub catalog: AnnouncementCatalog,
    pub schedule: Arc<RwLock<ScheduleStore>>,
    pub background: Arc<RwLock<BackgroundStore>>,
    pub selection: SelectionState,
    pub engine: Arc<PlaybackEngine>,
    scheduler: Arc<AutoplayScheduler>,
    polling: PollControl,
    trigger_rx: mpsc::Receiver<String>,
}

impl App {
    /// Construct every component and verify the startup-critical
    /// collaborators: the zone catalog and the output device.
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let api = Arc::new(
            ApiClient::new(&config.api_url).context("invalid collaborator base URL")?,
        );
        let state = Arc::new(SharedState::new(config.autoplay.enabled));
        let polling = PollControl::new();

        let zones = Arc::new(
            ZoneCatalog::load(&api)
                .await
                .context("cannot fetch the zone catalog from the collaborator")?,
        );

        audio::find_device(config.device.name.as_deref())
            .context("configured audio output device not found")?;

        let catalog = match AnnouncementCatalog::load(&api).await {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!("announcement catalog unavailable, dialogs will be empty: {err}");
                AnnouncementCatalog::empty()
            }
        };

        let schedule = Arc::new(RwLock::new(ScheduleStore::new(Arc::clone(&api))));
        let background = Arc::new(RwLock::new(BackgroundStore::new(Arc::clone(&api))));
        let selection = SelectionState::new(
            Arc::clone(&schedule),
            Arc::clone(&api),
            Arc::clone(&state),
        );

        let history = ActionHistoryReporter::new(Arc::clone(&api), config.user_id);
        let engine = Arc::new(PlaybackEngine::new(
            PlaybackConfig::from_config(&config),
            Arc::clone(&api),
            Arc::clone(&zones),
            Arc::clone(&schedule),
            history,
            Arc::clone(&state),
            polling.clone(),
        ));

        let (scheduler, trigger_rx) = AutoplayScheduler::new(
            Arc::clone(&schedule),
            Arc::clone(&state),
            polling.clone(),
            config.autoplay_poll_interval(),
        );

        Ok(Self {
            config,
            api,
            state,
            zones,
            catalog,
            schedule,
            background,
            selection,
            engine,
            scheduler,
            polling,
            trigger_rx,
        })
    }

    /// Run until `shutdown` resolves: initial fetches, refresh loops,
    /// autoplay scan, and trigger handling.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        if let Err(err) = self.schedule.write().await.refresh().await {
            self.state
                .status(format!("schedule fetch failed: {err}"), true);
        }
        if let Err(err) = self.background.write().await.refresh().await {
            self.state
                .status(format!("background fetch failed: {err}"), true);
        }

        self.spawn_refresh_loops();
        tokio::spawn(Arc::clone(&self.scheduler).run());
        info!("console running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                trigger = self.trigger_rx.recv() => {
                    match trigger {
                        Some(schedule_id) => self.handle_autoplay_trigger(&schedule_id).await,
                        None => break,
                    }
                }
            }
        }

        if self.engine.is_playing().await {
            self.engine.stop(true).await;
        }
        Ok(())
    }

    /// Voice the highlighted schedule row.
    pub async fn play_selected(&self) -> Result<()> {
        let request = self
            .selection
            .current()
            .await
            .map(|s| PlaybackRequest::from_selection(&s, false));
        let result = self.engine.play(request).await;
        if let Err(err) = &result {
            self.state.status(format!("playback error: {err}"), true);
        }
        result
    }

    /// Voice the highlighted background announcement.
    pub async fn play_selected_background(&self) -> Result<()> {
        let request = self
            .background
            .read()
            .await
            .active_row()
            .map(PlaybackRequest::from_background_row);
        let result = self.engine.play(request).await;
        if let Err(err) = &result {
            self.state.status(format!("playback error: {err}"), true);
        }
        result
    }

    /// Manual stop button.
    pub async fn stop_playback(&self) {
        self.engine.stop(true).await;
    }

    /// Called after the creation dialog appended an announcement: merge
    /// just that row instead of reloading the whole table.
    pub async fn announcement_created(&self, flight_id: i64, audio_text_id: i64) {
        let existed = {
            let store = self.schedule.read().await;
            let existed = store
                .rows_in_order()
                .any(|r| r.flight_id == flight_id && r.audio_text_id == audio_text_id);
            existed
        };
        let result = self
            .schedule
            .write()
            .await
            .merge_single(flight_id, audio_text_id)
            .await;
        match result {
            Ok(()) => {
                let schedule_id = format!("{flight_id}_{audio_text_id}");
                self.state.emit(SpeakerEvent::RowMerged {
                    schedule_id,
                    inserted: !existed,
                    timestamp: Utc::now(),
                });
                self.state.status("announcement added", false);
            }
            Err(err) => {
                self.state
                    .status(format!("announcement not merged: {err}"), true);
            }
        }
    }

    /// Delete the highlighted schedule row (or its whole flight),
    /// server-side first, then locally.
    pub async fn delete_selected(&self, delete_all_for_flight: bool) -> Result<()> {
        let target = {
            let store = self.schedule.read().await;
            store
                .active_row()
                .map(|row| (row.schedule_id.clone(), row.flight_id, row.audio_text_id))
        };
        let Some((schedule_id, flight_id, audio_text_id)) = target else {
            self.state.status("no announcement selected", true);
            return Err(crate::error::PlaybackError::NoSelection.into());
        };

        let _pause = self.polling.pause();
        self.api
            .delete_schedule(&DeleteScheduleRequest {
                flight_id,
                audio_text_id: (!delete_all_for_flight).then_some(audio_text_id),
                delete_all_audio: delete_all_for_flight,
            })
            .await?;

        self.schedule
            .write()
            .await
            .delete_row(&schedule_id, delete_all_for_flight);
        self.state.status("announcement deleted", false);
        Ok(())
    }

    fn spawn_refresh_loops(&self) {
        {
            let store = Arc::clone(&self.schedule);
            let state = Arc::clone(&self.state);
            let polling = self.polling.clone();
            let period = self.config.schedule_update_interval();
            tokio::spawn(async move {
                let mut tick = interval(period);
                tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                tick.tick().await; // initial fetch already done
                loop {
                    tick.tick().await;
                    if polling.is_paused() {
                        continue;
                    }
                    let result = store.write().await.refresh().await;
                    match result {
                        Ok(()) => {
                            let rows = store.read().await.len();
                            state.emit(SpeakerEvent::ScheduleRefreshed {
                                table: TableKind::Schedule,
                                rows,
                                timestamp: Utc::now(),
                            });
                            state.status("schedule data received", false);
                        }
                        Err(err) => {
                            state.status(format!("API connection error: {err}"), true);
                        }
                    }
                }
            });
        }
        {
            let store = Arc::clone(&self.background);
            let state = Arc::clone(&self.state);
            let polling = self.polling.clone();
            let period = self.config.background_update_interval();
            tokio::spawn(async move {
                let mut tick = interval(period);
                tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                tick.tick().await;
                loop {
                    tick.tick().await;
                    if polling.is_paused() {
                        continue;
                    }
                    let result = store.write().await.refresh().await;
                    match result {
                        Ok(()) => {
                            let rows = store.read().await.len();
                            state.emit(SpeakerEvent::ScheduleRefreshed {
                                table: TableKind::Background,
                                rows,
                                timestamp: Utc::now(),
                            });
                        }
                        Err(err) => {
                            state.status(format!("API connection error: {err}"), true);
                        }
                    }
                }
            });
        }
    }

    async fn handle_autoplay_trigger(&self, schedule_id: &str) {
        let request = {
            let store = self.schedule.read().await;
            store
                .row(schedule_id)
                .map(Selection::from_row)
                .map(|s| PlaybackRequest::from_selection(&s, true))
        };

        if let Err(err) = self.engine.play(request).await {
            self.state
                .status(format!("autoplay playback failed: {err}"), true);
            // The finish event will never come; re-arm the scan directly.
            self.scheduler.playback_finished().await;
        }
    }
}
