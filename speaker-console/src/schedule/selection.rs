//! Operator selection for the highlighted schedule row
//!
//! Selection is not separate state: languages, zones, terminal and gates
//! live on the row itself and every mutation writes through to the
//! collaborator. What this module adds is the snapshot handed to the
//! playback engine and the optimistic persistence of each toggle.

use std::sync::Arc;

use speaker_common::api::types::{ScheduleRow, UpdateScheduleRequest};
use speaker_common::{ApiClient, FetchError};
use tokio::sync::RwLock;

use crate::state::SharedState;

use super::store::ScheduleStore;

/// Snapshot of the active row's operator choices.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub schedule_id: String,
    pub flight_id: i64,
    pub audio_text_id: i64,
    /// Language ids in voicing order
    pub language_ids: Vec<u32>,
    pub zones: Vec<u32>,
    pub terminal: Option<String>,
    pub boarding_gates: Vec<u32>,
    pub requires_terminal: bool,
    pub requires_boarding_gates: bool,
    pub autoplay_is_canceled: bool,
}

impl Selection {
    pub fn from_row(row: &ScheduleRow) -> Self {
        Self {
            schedule_id: row.schedule_id.clone(),
            flight_id: row.flight_id,
            audio_text_id: row.audio_text_id,
            language_ids: row.selected_language_ids(),
            zones: row.zones_list.clone(),
            terminal: row.terminal.clone(),
            boarding_gates: row.boarding_gates.clone(),
            requires_terminal: row.is_has_terminal,
            requires_boarding_gates: row.is_has_boarding_gate,
            autoplay_is_canceled: row.autoplay_is_canceled,
        }
    }
}

/// Read/write access to the active row's selection.
pub struct SelectionState {
    store: Arc<RwLock<ScheduleStore>>,
    api: Arc<ApiClient>,
    state: Arc<SharedState>,
}

impl SelectionState {
    pub fn new(
        store: Arc<RwLock<ScheduleStore>>,
        api: Arc<ApiClient>,
        state: Arc<SharedState>,
    ) -> Self {
        Self { store, api, state }
    }

    /// Highlight a row and return its selection snapshot.
    pub async fn select_row(&self, schedule_id: &str) -> Option<Selection> {
        let mut store = self.store.write().await;
        if !store.select(schedule_id) {
            return None;
        }
        store.active_row().map(Selection::from_row)
    }

    /// Snapshot of whatever is currently highlighted.
    pub async fn current(&self) -> Option<Selection> {
        self.store.read().await.active_row().map(Selection::from_row)
    }

    /// Tick or untick a language on the active row.
    pub async fn toggle_language(&self, code: &str) -> Option<Selection> {
        self.mutate_active(|row| {
            if let Some(lang) = row.languages.get_mut(code) {
                lang.display = !lang.display;
            }
        })
        .await
    }

    /// Tick or untick a playback zone on the active row.
    pub async fn toggle_zone(&self, zone_id: u32) -> Option<Selection> {
        self.mutate_active(|row| {
            if let Some(pos) = row.zones_list.iter().position(|&z| z == zone_id) {
                row.zones_list.remove(pos);
            } else {
                row.zones_list.push(zone_id);
                row.zones_list.sort_unstable();
            }
        })
        .await
    }

    /// Override the terminal of the active row.
    pub async fn set_terminal(&self, terminal: Option<String>) -> Option<Selection> {
        self.mutate_active(|row| row.terminal = terminal).await
    }

    /// Replace the boarding gates of the active row.
    pub async fn set_boarding_gates(&self, gates: Vec<u32>) -> Option<Selection> {
        self.mutate_active(|row| row.boarding_gates = gates).await
    }

    /// Apply one mutation to the active row, re-select it, and persist.
    async fn mutate_active<F>(&self, mutate: F) -> Option<Selection>
    where
        F: FnOnce(&mut ScheduleRow),
    {
        let snapshot = {
            let mut store = self.store.write().await;
            let active_id = store.active_id()?.to_string();
            let row = store.row_mut(&active_id)?;
            mutate(row);
            store.select(&active_id);
            store.active_row().map(Selection::from_row)?
        };

        if let Err(err) = self.persist(&snapshot).await {
            self.state
                .status(format!("selection not saved: {err}"), true);
        }
        Some(snapshot)
    }

    /// Push the full current selection to the collaborator.
    ///
    /// Local state is kept on failure; the next successful persist or the
    /// next refresh reconciles.
    pub async fn persist(&self, selection: &Selection) -> Result<(), FetchError> {
        let request = UpdateScheduleRequest {
            id: selection.schedule_id.clone(),
            flight_id: selection.flight_id,
            audio_text_id: selection.audio_text_id,
            languages: selection.language_ids.clone(),
            zones: selection.zones.clone(),
            terminal: selection.terminal.clone(),
            boarding_gates: selection.boarding_gates.clone(),
            is_deleted: false,
        };
        self.api.update_schedule(&request).await
    }
}
