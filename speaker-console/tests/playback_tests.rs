//! Playback engine preconditions and selection persistence, driven
//! through the public API against the mock collaborator.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use speaker_common::api::types::Zone;
use speaker_common::ApiClient;
use speaker_console::catalog::ZoneCatalog;
use speaker_console::history::ActionHistoryReporter;
use speaker_console::playback::{PlaybackConfig, PlaybackEngine, PlaybackRequest};
use speaker_console::polling::PollControl;
use speaker_console::schedule::{ScheduleStore, SelectionState};
use speaker_console::{PlaybackError, SharedState};
use tokio::sync::RwLock;

struct Rig {
    engine: Arc<PlaybackEngine>,
    schedule: Arc<RwLock<ScheduleStore>>,
    selection: SelectionState,
    polling: PollControl,
    temp_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
    mock: helpers::MockCollaborator,
}

async fn rig() -> Rig {
    let mock = helpers::spawn().await;
    let api = Arc::new(ApiClient::new(&mock.base_url).unwrap());
    let schedule = Arc::new(RwLock::new(ScheduleStore::new(Arc::clone(&api))));
    let state = Arc::new(SharedState::new(true));
    let polling = PollControl::new();
    let dir = tempfile::tempdir().unwrap();
    let temp_path = dir.path().join("announcement.wav");

    let config = PlaybackConfig {
        device_name: None,
        sample_rate: 44100,
        temp_path: temp_path.clone(),
        finish_slack: Duration::from_secs(2),
    };
    let zones = Arc::new(ZoneCatalog::from_zones(vec![Zone {
        id: 1,
        name: "Hall".to_string(),
        channel: 0,
        flight_types: None,
    }]));
    let history = ActionHistoryReporter::new(Arc::clone(&api), uuid::Uuid::new_v4());
    let engine = Arc::new(PlaybackEngine::new(
        config,
        Arc::clone(&api),
        zones,
        Arc::clone(&schedule),
        history,
        Arc::clone(&state),
        polling.clone(),
    ));
    let selection = SelectionState::new(Arc::clone(&schedule), api, state);

    Rig {
        engine,
        schedule,
        selection,
        polling,
        temp_path,
        _dir: dir,
        mock,
    }
}

fn playback_err(err: speaker_console::Error) -> PlaybackError {
    match err {
        speaker_console::Error::Playback(e) => e,
        other => panic!("expected a playback error, got {other}"),
    }
}

#[tokio::test]
async fn play_with_nothing_selected_is_no_selection() {
    let rig = rig().await;
    let err = rig.engine.play(None).await.unwrap_err();
    assert_eq!(playback_err(err), PlaybackError::NoSelection);
}

#[tokio::test]
async fn language_check_precedes_zone_check() {
    let rig = rig().await;

    // A row whose only language is unticked and whose zones are empty.
    let mut row_json = helpers::schedule_row("1_1", 1, 1, "2026-08-07 12:00:00", None);
    row_json["languages"]["RUS"]["display"] = serde_json::json!(false);
    row_json["zones_list"] = serde_json::json!([]);
    *rig.mock.state.schedule.lock().unwrap() = vec![row_json];
    rig.schedule.write().await.refresh().await.unwrap();

    let selection = rig.selection.current().await.unwrap();
    let request = PlaybackRequest::from_selection(&selection, false);
    let err = rig.engine.play(Some(request)).await.unwrap_err();
    assert_eq!(playback_err(err), PlaybackError::NoLanguage);

    // Tick the language back on: now the empty zones are the complaint.
    rig.selection.toggle_language("RUS").await.unwrap();
    let selection = rig.selection.current().await.unwrap();
    let request = PlaybackRequest::from_selection(&selection, false);
    let err = rig.engine.play(Some(request)).await.unwrap_err();
    assert_eq!(playback_err(err), PlaybackError::NoZone);
}

#[tokio::test]
async fn required_terminal_is_enforced() {
    let rig = rig().await;

    let mut row_json = helpers::schedule_row("1_1", 1, 1, "2026-08-07 12:00:00", None);
    row_json["is_has_terminal"] = serde_json::json!(true);
    row_json["terminal"] = serde_json::Value::Null;
    *rig.mock.state.schedule.lock().unwrap() = vec![row_json];
    rig.schedule.write().await.refresh().await.unwrap();

    let selection = rig.selection.current().await.unwrap();
    let request = PlaybackRequest::from_selection(&selection, false);
    let err = rig.engine.play(Some(request)).await.unwrap_err();
    assert_eq!(
        playback_err(err),
        PlaybackError::MissingData("terminal".to_string())
    );
}

#[tokio::test]
async fn zero_byte_render_is_empty_file_with_no_leftovers() {
    let rig = rig().await;

    *rig.mock.state.schedule.lock().unwrap() =
        vec![helpers::schedule_row("1_1", 1, 1, "2026-08-07 12:00:00", None)];
    rig.schedule.write().await.refresh().await.unwrap();
    // render_bytes defaults to empty.

    let selection = rig.selection.current().await.unwrap();
    let request = PlaybackRequest::from_selection(&selection, false);
    let err = rig.engine.play(Some(request)).await.unwrap_err();
    assert_eq!(playback_err(err), PlaybackError::EmptyFile);

    assert!(!rig.temp_path.exists(), "no temp file may be left behind");
    assert!(!rig.polling.is_paused(), "polling must resume after failure");
    assert!(!rig.engine.is_playing().await);
}

#[tokio::test]
async fn selection_toggles_persist_to_the_collaborator() {
    let rig = rig().await;

    *rig.mock.state.schedule.lock().unwrap() =
        vec![helpers::schedule_row("1_1", 1, 1, "2026-08-07 12:00:00", None)];
    rig.schedule.write().await.refresh().await.unwrap();

    rig.selection.toggle_zone(4).await.unwrap();

    let updates = rig.mock.state.updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    let body = &updates[0];
    assert_eq!(body["id"], "1_1");
    assert_eq!(body["flight_id"], 1);
    assert_eq!(body["zones"], serde_json::json!([1, 4]));
    assert_eq!(body["languages"], serde_json::json!([1]));
    assert_eq!(body["is_deleted"], false);
}

#[tokio::test]
async fn language_toggle_is_optimistic_on_server_failure() {
    let rig = rig().await;

    *rig.mock.state.schedule.lock().unwrap() =
        vec![helpers::schedule_row("1_1", 1, 1, "2026-08-07 12:00:00", None)];
    rig.schedule.write().await.refresh().await.unwrap();

    // Point the selection at a dead collaborator.
    let dead_api = Arc::new(ApiClient::new("http://127.0.0.1:1/").unwrap());
    let selection = SelectionState::new(
        Arc::clone(&rig.schedule),
        dead_api,
        Arc::new(SharedState::new(true)),
    );

    let snapshot = selection.toggle_language("ENG").await.unwrap();
    assert_eq!(snapshot.language_ids, vec![1, 3]);

    // Local row state kept the toggle despite the failed POST.
    let store = rig.schedule.read().await;
    assert!(store.row("1_1").unwrap().languages["ENG"].display);
}
