//! Playback engine orchestration
//!
//! One announcement at a time: build the render request, download the
//! clip, stage it at the fixed temp path, decode, open the device with the
//! selected zones mapped to hardware channels, and arm a completion timer.
//! Both stop paths (manual and natural) funnel through [`PlaybackEngine::stop`],
//! which is the only place the temp file, the polling pause, and the
//! server-side row flags are released.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use speaker_common::api::types::{ActionCode, BackgroundRow, RenderRequest, ScheduleKey};
use speaker_common::events::{PlayState, SpeakerEvent};
use speaker_common::ApiClient;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::audio::{self, DecodedClip};
use crate::catalog::ZoneCatalog;
use crate::config::Config;
use crate::error::{Error, PlaybackError, Result};
use crate::history::ActionHistoryReporter;
use crate::polling::{PollControl, PollPause};
use crate::schedule::{ScheduleStore, Selection};
use crate::state::SharedState;

/// What is being voiced: a schedule row or a background announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementSource {
    Schedule {
        schedule_id: String,
        flight_id: i64,
        audio_text_id: i64,
    },
    Background {
        audio_text_id: i64,
    },
}

impl AnnouncementSource {
    pub fn flight_id(&self) -> Option<i64> {
        match self {
            AnnouncementSource::Schedule { flight_id, .. } => Some(*flight_id),
            AnnouncementSource::Background { .. } => None,
        }
    }

    pub fn audio_text_id(&self) -> i64 {
        match self {
            AnnouncementSource::Schedule { audio_text_id, .. } => *audio_text_id,
            AnnouncementSource::Background { audio_text_id } => *audio_text_id,
        }
    }

    pub fn schedule_id(&self) -> Option<&str> {
        match self {
            AnnouncementSource::Schedule { schedule_id, .. } => Some(schedule_id),
            AnnouncementSource::Background { .. } => None,
        }
    }
}

/// Everything the engine needs to voice one announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub source: AnnouncementSource,
    /// Language ids in voicing order
    pub language_ids: Vec<u32>,
    /// Selected zone ids
    pub zones: Vec<u32>,
    pub terminal: Option<String>,
    pub boarding_gates: Vec<u32>,
    pub requires_terminal: bool,
    pub requires_boarding_gates: bool,
    pub autoplay_is_canceled: bool,
    pub is_autoplay: bool,
}

impl PlaybackRequest {
    /// Build a request from the highlighted schedule row's selection.
    pub fn from_selection(selection: &Selection, is_autoplay: bool) -> Self {
        Self {
            source: AnnouncementSource::Schedule {
                schedule_id: selection.schedule_id.clone(),
                flight_id: selection.flight_id,
                audio_text_id: selection.audio_text_id,
            },
            language_ids: selection.language_ids.clone(),
            zones: selection.zones.clone(),
            terminal: selection.terminal.clone(),
            boarding_gates: selection.boarding_gates.clone(),
            requires_terminal: selection.requires_terminal,
            requires_boarding_gates: selection.requires_boarding_gates,
            autoplay_is_canceled: selection.autoplay_is_canceled,
            is_autoplay,
        }
    }

    /// Build a request from a background announcement row.
    pub fn from_background_row(row: &BackgroundRow) -> Self {
        Self {
            source: AnnouncementSource::Background {
                audio_text_id: row.audio_text_id,
            },
            language_ids: row.selected_language_ids(),
            zones: row.zones_list.clone(),
            terminal: None,
            boarding_gates: Vec::new(),
            requires_terminal: false,
            requires_boarding_gates: false,
            autoplay_is_canceled: false,
            is_autoplay: false,
        }
    }

    fn render_request(&self) -> RenderRequest {
        RenderRequest {
            flight_id: self.source.flight_id(),
            audio_text_id: self.source.audio_text_id(),
            languages: self.language_ids.clone(),
            zones: self.zones.clone(),
            terminal: self.terminal.clone(),
            boarding_gates: self.boarding_gates.clone(),
            autoplay_is_canceled: self.autoplay_is_canceled,
        }
    }
}

/// Check the request against the row's requirements.
///
/// Order matters and is part of the contract: contextual fields, then
/// languages, then zones.
fn validate(request: &PlaybackRequest) -> std::result::Result<(), PlaybackError> {
    if request.requires_terminal
        && request.terminal.as_deref().map_or(true, str::is_empty)
    {
        return Err(PlaybackError::MissingData("terminal".to_string()));
    }
    if request.requires_boarding_gates && request.boarding_gates.is_empty() {
        return Err(PlaybackError::MissingData("boarding_gates".to_string()));
    }
    if request.language_ids.is_empty() {
        return Err(PlaybackError::NoLanguage);
    }
    if request.zones.is_empty() {
        return Err(PlaybackError::NoZone);
    }
    Ok(())
}

/// Engine-side playback settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    pub device_name: Option<String>,
    pub sample_rate: u32,
    pub temp_path: PathBuf,
    pub finish_slack: Duration,
}

impl PlaybackConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            device_name: config.device.name.clone(),
            sample_rate: config.device.sample_rate,
            temp_path: config.temp_file_path(),
            finish_slack: config.finish_slack(),
        }
    }
}

/// The one active session; owns the playback thread handle, the completion
/// timer, and the polling pause.
struct ActiveSession {
    request: PlaybackRequest,
    handle: Option<audio::PlaybackHandle>,
    finish: Option<AbortHandle>,
    _pause: PollPause,
}

/// Single-flight announcement playback.
pub struct PlaybackEngine {
    config: PlaybackConfig,
    api: Arc<ApiClient>,
    zones: Arc<ZoneCatalog>,
    schedule: Arc<RwLock<ScheduleStore>>,
    history: ActionHistoryReporter,
    state: Arc<SharedState>,
    polling: PollControl,
    session: Arc<Mutex<Option<ActiveSession>>>,
}

impl PlaybackEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PlaybackConfig,
        api: Arc<ApiClient>,
        zones: Arc<ZoneCatalog>,
        schedule: Arc<RwLock<ScheduleStore>>,
        history: ActionHistoryReporter,
        state: Arc<SharedState>,
        polling: PollControl,
    ) -> Self {
        Self {
            config,
            api,
            zones,
            schedule,
            history,
            state,
            polling,
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Clone handles for spawned tasks.
    fn clone_handles(&self) -> Self {
        Self {
            config: self.config.clone(),
            api: Arc::clone(&self.api),
            zones: Arc::clone(&self.zones),
            schedule: Arc::clone(&self.schedule),
            history: self.history.clone(),
            state: Arc::clone(&self.state),
            polling: self.polling.clone(),
            session: Arc::clone(&self.session),
        }
    }

    pub async fn is_playing(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Voice one announcement.
    ///
    /// `None` means the operator pressed play with nothing highlighted.
    /// The session slot stays locked for the whole setup, so a concurrent
    /// `play` observes `AlreadyPlaying` rather than racing the device.
    pub async fn play(&self, request: Option<PlaybackRequest>) -> Result<()> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Err(PlaybackError::AlreadyPlaying.into());
        }
        let request = request.ok_or(PlaybackError::NoSelection)?;
        validate(&request)?;

        // Refresh and autoplay polling stand down for the session; the
        // guard travels with the session and releases on stop.
        let pause = self.polling.pause();

        let bytes = self.api.render_announcement(&request.render_request()).await?;
        if bytes.is_empty() {
            return Err(PlaybackError::EmptyFile.into());
        }

        self.write_temp_file(&bytes)?;

        let clip = match audio::decode_file(&self.config.temp_path) {
            Ok(clip) => clip,
            Err(err) => {
                self.remove_temp_file();
                return Err(err);
            }
        };
        let duration = clip.duration();

        let handle = match self.open_and_start(clip, &request.zones).await {
            Ok(handle) => handle,
            Err(err) => {
                self.remove_temp_file();
                return Err(err);
            }
        };

        self.history.report(&request, ActionCode::AnnouncementPlay);
        self.state.set_play_state(PlayState::Playing).await;
        self.state.emit(SpeakerEvent::PlaybackStarted {
            schedule_id: request.source.schedule_id().map(String::from),
            audio_text_id: request.source.audio_text_id(),
            is_autoplay: request.is_autoplay,
            duration_ms: duration.as_millis() as u64,
            timestamp: Utc::now(),
        });

        // Whole seconds plus slack, as the operators expect from the
        // original console's completion timing.
        let total = Duration::from_secs(duration.as_secs_f64().ceil() as u64)
            + self.config.finish_slack;
        let engine = self.clone_handles();
        let finish = tokio::spawn(async move {
            tokio::time::sleep(total).await;
            engine.stop(false).await;
        });

        info!(
            audio_text_id = request.source.audio_text_id(),
            is_autoplay = request.is_autoplay,
            duration_ms = duration.as_millis() as u64,
            "announcement playing"
        );

        *slot = Some(ActiveSession {
            request,
            handle: Some(handle),
            finish: Some(finish.abort_handle()),
            _pause: pause,
        });
        Ok(())
    }

    /// Halt playback and unwind the session.
    ///
    /// `manual` records a manual-stop history action and cancels the row's
    /// autoplay; natural completion marks the row played instead. Calling
    /// with no active session is a no-op.
    pub async fn stop(&self, manual: bool) {
        let session = self.session.lock().await.take();
        let Some(mut session) = session else {
            debug!("stop requested with no active session");
            return;
        };

        if manual {
            // Natural completion runs inside the finish task itself;
            // aborting there would cut the unwind short.
            if let Some(finish) = session.finish.take() {
                finish.abort();
            }
        }
        if let Some(handle) = session.handle.take() {
            handle.stop();
        }
        self.remove_temp_file();

        let request = &session.request;
        if let AnnouncementSource::Schedule {
            schedule_id,
            flight_id,
            audio_text_id,
        } = &request.source
        {
            let key = ScheduleKey {
                flight_id: *flight_id,
                audio_text_id: *audio_text_id,
            };
            if manual {
                self.schedule.write().await.mark_autoplay_canceled(schedule_id);
                let api = Arc::clone(&self.api);
                tokio::spawn(async move {
                    if let Err(err) = api.set_schedule_autoplay_is_canceled(key).await {
                        warn!("autoplay cancel not persisted: {err}");
                    }
                });
            } else {
                self.schedule.write().await.mark_played(schedule_id);
                let api = Arc::clone(&self.api);
                tokio::spawn(async move {
                    if let Err(err) = api.set_schedule_is_played(key).await {
                        warn!("played flag not persisted: {err}");
                    }
                });
            }
        }

        if manual {
            self.history.report(request, ActionCode::ManualStop);
        }

        self.state.set_play_state(PlayState::Idle).await;
        self.state.emit(SpeakerEvent::PlaybackFinished {
            schedule_id: request.source.schedule_id().map(String::from),
            manual,
            timestamp: Utc::now(),
        });
        info!(manual, "playback stopped");
        // Dropping the session releases the polling pause.
    }

    /// Open the device with the zone mapping and start the clip.
    ///
    /// When the mapped layout cannot be opened the engine retries on the
    /// first output channel only (audible but possibly the wrong zone), so
    /// it is logged loudly rather than taken silently.
    async fn open_and_start(
        &self,
        clip: DecodedClip,
        zone_ids: &[u32],
    ) -> Result<audio::PlaybackHandle> {
        let device = audio::find_device(self.config.device_name.as_deref()).map_err(|err| {
            warn!("output device lookup failed: {err}");
            Error::Playback(PlaybackError::DeviceUnavailable)
        })?;

        let mapping = {
            let mapped = self.zones.channels_for(zone_ids);
            if mapped.is_empty() {
                warn!("selected zones map to no hardware channels; degraded playback on channel 0");
                vec![0]
            } else {
                mapped
            }
        };

        let (output, mapping) = match audio::negotiate(&device, self.config.sample_rate, &mapping)
        {
            Ok(output) => (output, mapping),
            Err(err) => {
                warn!(
                    "zone-mapped output unavailable ({err}); degraded playback on channel 0 only"
                );
                let degraded = vec![0u16];
                let output = audio::negotiate(&device, self.config.sample_rate, &degraded)
                    .map_err(|err| {
                        warn!("degraded output failed as well: {err}");
                        Error::Playback(PlaybackError::DeviceUnavailable)
                    })?;
                (output, degraded)
            }
        };

        let device_rate = output.sample_rate();
        let samples = audio::resample(&clip.samples, clip.sample_rate, device_rate, 2)?;
        let mono = DecodedClip {
            samples,
            sample_rate: device_rate,
        }
        .to_mono();

        // Backstop well past the completion timer.
        let hold = clip.duration() + self.config.finish_slack + Duration::from_secs(5);

        audio::start_mapped_playback(device, output, mono, mapping, hold)
            .await
            .map_err(|err| {
                warn!("audio stream failed to start: {err}");
                Error::Playback(PlaybackError::DeviceUnavailable)
            })
    }

    fn write_temp_file(&self, bytes: &[u8]) -> Result<()> {
        let path = &self.config.temp_path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Stage then rename, so a crash never leaves a half-written clip
        // at the fixed path.
        let staging = path.with_extension("part");
        std::fs::write(&staging, bytes)?;
        std::fs::rename(&staging, path)?;
        Ok(())
    }

    fn remove_temp_file(&self) {
        let path = &self.config.temp_path;
        if path.exists() {
            if let Err(err) = std::fs::remove_file(path) {
                warn!("temp clip not removed (file may be locked): {err}");
            }
        }
    }
}
