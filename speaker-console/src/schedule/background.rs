//! Background announcement store
//!
//! The flightless mirror of [`super::store::ScheduleStore`]: fixed
//! announcements (cleaning, security, greetings) keyed by audio text id,
//! with no flight grouping, no job schedule and no played state. Rows are
//! displayed sorted by name.

use std::collections::HashMap;
use std::sync::Arc;

use speaker_common::api::types::BackgroundRow;
use speaker_common::{ApiClient, FetchError};

/// In-memory list of background announcements.
pub struct BackgroundStore {
    api: Arc<ApiClient>,
    rows: HashMap<i64, BackgroundRow>,
    order: Vec<i64>,
    active: Option<i64>,
}

impl BackgroundStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            rows: HashMap::new(),
            order: Vec::new(),
            active: None,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn row(&self, audio_text_id: i64) -> Option<&BackgroundRow> {
        self.rows.get(&audio_text_id)
    }

    pub fn visual_order(&self) -> &[i64] {
        &self.order
    }

    pub fn active_id(&self) -> Option<i64> {
        self.active
    }

    pub fn active_row(&self) -> Option<&BackgroundRow> {
        self.active.and_then(|id| self.rows.get(&id))
    }

    pub fn select(&mut self, audio_text_id: i64) -> bool {
        if self.rows.contains_key(&audio_text_id) {
            self.active = Some(audio_text_id);
            true
        } else {
            false
        }
    }

    pub async fn refresh(&mut self) -> Result<(), FetchError> {
        let rows = self.api.get_audio_background_text().await?;
        self.replace_rows(rows);
        Ok(())
    }

    /// Replace all rows, preserving the highlight where possible.
    pub fn replace_rows(&mut self, rows: Vec<BackgroundRow>) {
        let previous = self.active.take();

        self.rows.clear();
        self.order.clear();
        for row in rows {
            let id = row.audio_text_id;
            if self.rows.insert(id, row).is_none() {
                self.order.push(id);
            }
        }
        let rows = &self.rows;
        self.order
            .sort_by(|a, b| (&rows[a].name, a).cmp(&(&rows[b].name, b)));

        self.active = match previous {
            Some(id) if self.rows.contains_key(&id) => Some(id),
            _ => self.order.first().copied(),
        };
    }

    /// Remove one background announcement locally.
    pub fn delete_row(&mut self, audio_text_id: i64) {
        let previous_index = self
            .active
            .and_then(|id| self.order.iter().position(|&o| o == id))
            .unwrap_or(0);

        self.rows.remove(&audio_text_id);
        self.order.retain(|&id| id != audio_text_id);

        match self.active {
            Some(id) if self.rows.contains_key(&id) => {}
            _ => {
                self.active = if self.order.is_empty() {
                    None
                } else {
                    Some(self.order[previous_index.min(self.order.len() - 1)])
                };
            }
        }
    }

    /// Tick or untick a language; persists the row optimistically.
    pub async fn toggle_language(&mut self, code: &str) -> Result<(), FetchError> {
        let Some(id) = self.active else {
            return Ok(());
        };
        if let Some(row) = self.rows.get_mut(&id) {
            if let Some(lang) = row.languages.get_mut(code) {
                lang.display = !lang.display;
            }
        }
        self.persist_active().await
    }

    /// Tick or untick a zone; persists the row optimistically.
    pub async fn toggle_zone(&mut self, zone_id: u32) -> Result<(), FetchError> {
        let Some(id) = self.active else {
            return Ok(());
        };
        if let Some(row) = self.rows.get_mut(&id) {
            if let Some(pos) = row.zones_list.iter().position(|&z| z == zone_id) {
                row.zones_list.remove(pos);
            } else {
                row.zones_list.push(zone_id);
                row.zones_list.sort_unstable();
            }
        }
        self.persist_active().await
    }

    async fn persist_active(&self) -> Result<(), FetchError> {
        match self.active_row() {
            Some(row) => self.api.update_audio_background_text(row).await,
            None => Ok(()),
        }
    }
}
