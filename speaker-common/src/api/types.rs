//! Typed collaborator payloads
//!
//! One struct per endpoint request/response. Everything the server may omit
//! is an explicit `Option` or a defaulted collection; validation happens at
//! the deserialization boundary, not in the consuming code.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::{serde_datetime, serde_datetime_opt};

/// One physical loudspeaker group.
///
/// `channel` is the zero-based hardware output channel feeding the zone.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Zone {
    pub id: u32,
    pub name: String,
    pub channel: u16,
    /// Flight direction/type ids this zone applies to (None = all)
    #[serde(default)]
    pub flight_types: Option<Vec<i64>>,
}

/// Per-language announcement metadata within a schedule row.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LanguageInfo {
    pub id: u32,
    /// Whether the operator has this language ticked for playback
    pub display: bool,
    /// Voicing order among the selected languages
    pub order: u32,
    /// Rendered duration of this language's fragment, seconds
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub text: Option<String>,
}

/// One flight + announcement-text pairing in the schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleRow {
    pub schedule_id: String,
    pub flight_id: i64,
    pub audio_text_id: i64,
    #[serde(rename = "flight_number_full")]
    pub flight_number: String,
    pub direction: String,
    pub direction_id: i64,
    pub status_id: i64,
    /// Scheduled flight datetime; primary sort key
    #[serde(with = "serde_datetime")]
    pub flight_datetime: NaiveDateTime,
    #[serde(rename = "plan_flight_time")]
    pub plan_time: String,
    #[serde(rename = "public_flight_time")]
    pub public_time: String,
    pub audio_text: String,
    #[serde(default)]
    pub audio_text_description: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    pub route: String,
    #[serde(default)]
    pub terminal: Option<String>,
    #[serde(default)]
    pub boarding_gates: Vec<u32>,
    /// Keyed by language code ("RUS", "TAT", "ENG", ...)
    pub languages: BTreeMap<String, LanguageInfo>,
    #[serde(default)]
    pub zones_list: Vec<u32>,
    /// Manual queue position; rows without one sort after those with one
    #[serde(default)]
    pub queue: Option<i64>,
    #[serde(default)]
    pub is_played: bool,
    #[serde(default)]
    pub job_id: Option<i64>,
    #[serde(default)]
    pub job_time: Option<String>,
    #[serde(default, with = "serde_datetime_opt")]
    pub job_datetime: Option<NaiveDateTime>,
    #[serde(default)]
    pub job_is_fact: Option<bool>,
    #[serde(default)]
    pub autoplay_is_canceled: bool,
    /// The rendered text requires a terminal to be chosen
    #[serde(default)]
    pub is_has_terminal: bool,
    /// The rendered text requires boarding gates to be chosen
    #[serde(default)]
    pub is_has_boarding_gate: bool,
}

impl ScheduleRow {
    /// Total ordering of schedule rows: flight datetime, then flight id,
    /// then manual queue position (absent sorts last), then schedule id.
    pub fn sort_key(&self) -> (NaiveDateTime, i64, (bool, i64), &str) {
        (
            self.flight_datetime,
            self.flight_id,
            (self.queue.is_none(), self.queue.unwrap_or(0)),
            self.schedule_id.as_str(),
        )
    }

    /// Ids of the languages ticked for playback, in voicing order.
    pub fn selected_language_ids(&self) -> Vec<u32> {
        let mut picked: Vec<&LanguageInfo> =
            self.languages.values().filter(|l| l.display).collect();
        picked.sort_by_key(|l| l.order);
        picked.iter().map(|l| l.id).collect()
    }
}

/// Non-flight-bound ("background") announcement.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackgroundRow {
    pub audio_text_id: i64,
    pub name: String,
    pub languages: BTreeMap<String, LanguageInfo>,
    #[serde(default)]
    pub zones_list: Vec<u32>,
}

impl BackgroundRow {
    pub fn selected_language_ids(&self) -> Vec<u32> {
        let mut picked: Vec<&LanguageInfo> =
            self.languages.values().filter(|l| l.display).collect();
        picked.sort_by_key(|l| l.order);
        picked.iter().map(|l| l.id).collect()
    }
}

/// Targeted schedule query.
#[derive(Debug, Clone)]
pub enum ScheduleFilter {
    /// One row, by its composite identity
    Pair { flight_id: i64, audio_text_id: i64 },
    /// All rows of one flight number
    FlightNumber(String),
}

/// `POST get_scheduler_sound`: ask the collaborator to render a clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub flight_id: Option<i64>,
    pub audio_text_id: i64,
    pub languages: Vec<u32>,
    pub zones: Vec<u32>,
    #[serde(default)]
    pub terminal: Option<String>,
    #[serde(default)]
    pub boarding_gates: Vec<u32>,
    pub autoplay_is_canceled: bool,
}

/// `POST update_schedule`: push the operator's full row selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub id: String,
    pub flight_id: i64,
    pub audio_text_id: i64,
    pub languages: Vec<u32>,
    pub zones: Vec<u32>,
    #[serde(default)]
    pub terminal: Option<String>,
    #[serde(default)]
    pub boarding_gates: Vec<u32>,
    pub is_deleted: bool,
}

/// Identifies one schedule row in the mutation endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleKey {
    pub flight_id: i64,
    pub audio_text_id: i64,
}

/// Operator action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCode {
    AnnouncementPlay,
    ManualStop,
}

/// `POST save_action_history`: fire-and-forget audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionHistoryRecord {
    pub user_id: Uuid,
    #[serde(default)]
    pub flight_id: Option<i64>,
    pub audio_text_id: i64,
    pub languages: Vec<u32>,
    pub zones: Vec<u32>,
    #[serde(default)]
    pub terminal: Option<String>,
    #[serde(default)]
    pub boarding_gates: Vec<u32>,
    pub action_code: ActionCode,
    pub client_ip: String,
    pub is_autoplay: bool,
}

/// Terminal available for the terminal override combobox.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Terminal {
    pub id: i64,
    pub name: String,
}

/// Reason attachable to delay/cancellation announcements.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioTextReason {
    pub id: i64,
    pub name: String,
}

/// Selectable pre-defined announcement text.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioText {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Direction ids this text applies to (None = all)
    #[serde(default)]
    pub direction_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub is_has_reason: bool,
    #[serde(default)]
    pub is_has_terminal: bool,
    #[serde(default)]
    pub is_has_boarding_gate: bool,
    #[serde(default)]
    pub is_has_event_time: bool,
}

/// Flight row offered by the creation dialog's flight picker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlightInfo {
    pub flight_id: i64,
    #[serde(rename = "flight_number_full")]
    pub flight_number: String,
    pub direction_id: i64,
    #[serde(with = "serde_datetime")]
    pub flight_datetime: NaiveDateTime,
}

/// `POST append_audio_text_to_schedule`: create a new announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendScheduleRequest {
    pub flight_id: i64,
    pub audio_text_id: i64,
    #[serde(default)]
    pub reason_id: Option<i64>,
    #[serde(default)]
    pub terminal: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
}

/// `POST delete_schedule`: server-side removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteScheduleRequest {
    pub flight_id: i64,
    #[serde(default)]
    pub audio_text_id: Option<i64>,
    /// Remove every announcement of the flight, not just one text
    pub delete_all_audio: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row_json() -> serde_json::Value {
        serde_json::json!({
            "schedule_id": "100_7",
            "flight_id": 100,
            "audio_text_id": 7,
            "flight_number_full": "SU 1422",
            "direction": "Departure",
            "direction_id": 2,
            "status_id": 1,
            "flight_datetime": "2026-08-07 14:30:00",
            "plan_flight_time": "14:30",
            "public_flight_time": "14:45",
            "audio_text": "Boarding announcement",
            "audio_text_description": null,
            "event_time": null,
            "route": "Moscow",
            "terminal": "A",
            "boarding_gates": [3, 4],
            "languages": {
                "RUS": {"id": 1, "display": true, "order": 1, "duration": 12.5},
                "ENG": {"id": 3, "display": false, "order": 3, "duration": 11.0}
            },
            "zones_list": [1, 2],
            "queue": null,
            "is_played": false,
            "job_datetime": "2026-08-07 14:10:00",
            "job_is_fact": true,
            "autoplay_is_canceled": false,
            "is_has_terminal": true,
            "is_has_boarding_gate": true
        })
    }

    #[test]
    fn schedule_row_roundtrip() {
        let row: ScheduleRow = serde_json::from_value(sample_row_json()).unwrap();
        assert_eq!(row.schedule_id, "100_7");
        assert_eq!(row.boarding_gates, vec![3, 4]);
        assert_eq!(row.job_is_fact, Some(true));
        assert!(row.job_datetime.is_some());
        assert!(row.languages["RUS"].display);
    }

    #[test]
    fn missing_optional_fields_default() {
        let mut json = sample_row_json();
        let obj = json.as_object_mut().unwrap();
        obj.remove("job_datetime");
        obj.remove("job_is_fact");
        obj.remove("queue");
        obj.remove("boarding_gates");
        obj.remove("autoplay_is_canceled");

        let row: ScheduleRow = serde_json::from_value(json).unwrap();
        assert_eq!(row.job_datetime, None);
        assert_eq!(row.queue, None);
        assert!(row.boarding_gates.is_empty());
        assert!(!row.autoplay_is_canceled);
    }

    #[test]
    fn selected_languages_follow_order() {
        let mut json = sample_row_json();
        json["languages"]["ENG"]["display"] = serde_json::json!(true);
        json["languages"]["TAT"] = serde_json::json!({
            "id": 2, "display": true, "order": 2, "duration": 10.0
        });

        let row: ScheduleRow = serde_json::from_value(json).unwrap();
        assert_eq!(row.selected_language_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn sort_key_orders_queue_before_none() {
        let row: ScheduleRow = serde_json::from_value(sample_row_json()).unwrap();
        let mut queued = row.clone();
        queued.schedule_id = "100_8".to_string();
        queued.queue = Some(3);

        // Same datetime and flight: the queued row sorts first.
        assert!(queued.sort_key() < row.sort_key());
    }

    #[test]
    fn action_code_wire_format() {
        assert_eq!(
            serde_json::to_string(&ActionCode::AnnouncementPlay).unwrap(),
            "\"announcement_play\""
        );
        assert_eq!(
            serde_json::to_string(&ActionCode::ManualStop).unwrap(),
            "\"manual_stop\""
        );
    }
}
