//! In-process mock of the collaborator service.
//!
//! Spins an axum router on an ephemeral port; tests seed its state and
//! inspect the requests the console issued.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Default)]
pub struct MockState {
    pub zones: Mutex<Vec<Value>>,
    pub schedule: Mutex<Vec<Value>>,
    pub background: Mutex<Vec<Value>>,
    pub render_bytes: Mutex<Vec<u8>>,
    /// When set, `get_scheduler` answers 500
    pub fail_schedule: Mutex<bool>,

    pub updates: Mutex<Vec<Value>>,
    pub played: Mutex<Vec<Value>>,
    pub canceled: Mutex<Vec<Value>>,
    pub history: Mutex<Vec<Value>>,
    pub deletes: Mutex<Vec<Value>>,
}

pub struct MockCollaborator {
    pub base_url: String,
    pub state: Arc<MockState>,
}

pub async fn spawn() -> MockCollaborator {
    let state = Arc::new(MockState::default());

    let router = Router::new()
        .route("/get_zones", get(get_zones))
        .route("/get_scheduler", get(get_scheduler))
        .route("/get_audio_background_text", get(get_background))
        .route("/get_scheduler_sound", post(render_sound))
        .route("/update_schedule", post(update_schedule))
        .route("/set_schedule_is_played", post(set_played))
        .route("/set_schedule_autoplay_is_canceled", post(set_canceled))
        .route("/save_action_history", post(save_history))
        .route("/delete_schedule", post(delete_schedule))
        .route("/get_terminals", get(empty_list))
        .route("/get_audio_text", get(empty_list))
        .route("/get_audio_text_reasons", get(empty_list))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockCollaborator {
        base_url: format!("http://{addr}/"),
        state,
    }
}

async fn empty_list() -> Json<Value> {
    Json(json!([]))
}

async fn get_zones(State(state): State<Arc<MockState>>) -> Json<Value> {
    Json(Value::Array(state.zones.lock().unwrap().clone()))
}

async fn get_scheduler(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if *state.fail_schedule.lock().unwrap() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let rows = state.schedule.lock().unwrap().clone();
    let rows = match (params.get("flight_id"), params.get("audio_text_id")) {
        (Some(flight_id), Some(audio_text_id)) => rows
            .into_iter()
            .filter(|row| {
                row["flight_id"].to_string() == *flight_id
                    && row["audio_text_id"].to_string() == *audio_text_id
            })
            .collect(),
        _ => rows,
    };
    Json(Value::Array(rows)).into_response()
}

async fn get_background(State(state): State<Arc<MockState>>) -> Json<Value> {
    Json(Value::Array(state.background.lock().unwrap().clone()))
}

async fn render_sound(
    State(state): State<Arc<MockState>>,
    Json(_body): Json<Value>,
) -> Vec<u8> {
    state.render_bytes.lock().unwrap().clone()
}

async fn update_schedule(State(state): State<Arc<MockState>>, Json(body): Json<Value>) {
    state.updates.lock().unwrap().push(body);
}

async fn set_played(State(state): State<Arc<MockState>>, Json(body): Json<Value>) {
    state.played.lock().unwrap().push(body);
}

async fn set_canceled(State(state): State<Arc<MockState>>, Json(body): Json<Value>) {
    state.canceled.lock().unwrap().push(body);
}

async fn save_history(State(state): State<Arc<MockState>>, Json(body): Json<Value>) {
    state.history.lock().unwrap().push(body);
}

async fn delete_schedule(State(state): State<Arc<MockState>>, Json(body): Json<Value>) {
    state.deletes.lock().unwrap().push(body);
}

/// Fully populated schedule row payload.
pub fn schedule_row(
    schedule_id: &str,
    flight_id: i64,
    audio_text_id: i64,
    flight_datetime: &str,
    queue: Option<i64>,
) -> Value {
    json!({
        "schedule_id": schedule_id,
        "flight_id": flight_id,
        "audio_text_id": audio_text_id,
        "flight_number_full": format!("SU {flight_id}"),
        "direction": "Departure",
        "direction_id": 2,
        "status_id": 1,
        "flight_datetime": flight_datetime,
        "plan_flight_time": "12:00",
        "public_flight_time": "12:10",
        "audio_text": "Boarding announcement",
        "route": "Moscow",
        "terminal": "A",
        "boarding_gates": [1, 2],
        "languages": {
            "RUS": {"id": 1, "display": true, "order": 1, "duration": 10.0},
            "ENG": {"id": 3, "display": false, "order": 3, "duration": 9.0}
        },
        "zones_list": [1],
        "queue": queue,
        "is_played": false,
        "autoplay_is_canceled": false,
        "is_has_terminal": false,
        "is_has_boarding_gate": false
    })
}

/// Attach a confirmed autoplay fire time to a row payload.
pub fn with_job(mut row: Value, fire_datetime: &str, is_fact: bool) -> Value {
    row["job_id"] = json!(1);
    row["job_time"] = json!(fire_datetime.split(' ').nth(1).unwrap_or(fire_datetime));
    row["job_datetime"] = json!(fire_datetime);
    row["job_is_fact"] = json!(is_fact);
    row
}

pub fn zone(id: u32, name: &str, channel: u16) -> Value {
    json!({ "id": id, "name": name, "channel": channel })
}

pub fn background_row(audio_text_id: i64, name: &str) -> Value {
    json!({
        "audio_text_id": audio_text_id,
        "name": name,
        "languages": {
            "RUS": {"id": 1, "display": true, "order": 1, "duration": 8.0}
        },
        "zones_list": [1, 2]
    })
}
