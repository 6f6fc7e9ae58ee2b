//! Flight announcement schedule store
//!
//! Rows are kept in an id-keyed map with a separately maintained visual
//! order, so lookups never scan rendered cells and the order projection is
//! the only thing a table view needs. The active row survives refreshes,
//! merges, and deletions wherever possible.

use std::collections::HashMap;
use std::sync::Arc;

use speaker_common::api::types::{ScheduleFilter, ScheduleRow};
use speaker_common::{ApiClient, FetchError};
use tracing::{debug, warn};

/// In-memory representation of the current announcement schedule.
pub struct ScheduleStore {
    api: Arc<ApiClient>,
    rows: HashMap<String, ScheduleRow>,
    /// Visual order projection: schedule ids sorted by the row sort key
    order: Vec<String>,
    /// Currently highlighted row
    active: Option<String>,
    /// Flight of the most recent explicit selection; used to re-anchor
    /// the highlight when the selected row disappears on refresh
    current_flight: Option<i64>,
}

impl ScheduleStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            rows: HashMap::new(),
            order: Vec::new(),
            active: None,
            current_flight: None,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn row(&self, schedule_id: &str) -> Option<&ScheduleRow> {
        self.rows.get(schedule_id)
    }

    pub(crate) fn row_mut(&mut self, schedule_id: &str) -> Option<&mut ScheduleRow> {
        self.rows.get_mut(schedule_id)
    }

    /// Schedule ids in display order.
    pub fn visual_order(&self) -> &[String] {
        &self.order
    }

    pub fn rows_in_order(&self) -> impl Iterator<Item = &ScheduleRow> {
        self.order.iter().filter_map(|id| self.rows.get(id))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_row(&self) -> Option<&ScheduleRow> {
        self.active.as_deref().and_then(|id| self.rows.get(id))
    }

    pub fn active_index(&self) -> Option<usize> {
        let active = self.active.as_deref()?;
        self.order.iter().position(|id| id == active)
    }

    /// Highlight a row. Returns false if the id is unknown.
    pub fn select(&mut self, schedule_id: &str) -> bool {
        match self.rows.get(schedule_id) {
            Some(row) => {
                self.current_flight = Some(row.flight_id);
                self.active = Some(schedule_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Full refresh from the collaborator.
    ///
    /// On failure the previous rows stay; the caller surfaces the error as
    /// a status message and the polling loop tries again next tick.
    pub async fn refresh(&mut self) -> Result<(), FetchError> {
        let rows = self.api.get_scheduler(None).await?;
        self.replace_rows(rows);
        Ok(())
    }

    /// Replace all rows, preserving the highlight where possible.
    pub fn replace_rows(&mut self, rows: Vec<ScheduleRow>) {
        let previous = self.active.take();

        self.rows.clear();
        self.order.clear();
        for row in rows {
            let id = row.schedule_id.clone();
            if self.rows.insert(id.clone(), row).is_some() {
                warn!(schedule_id = %id, "duplicate schedule id in refresh payload");
            } else {
                self.order.push(id);
            }
        }
        self.sort_order();
        self.reselect(previous);
    }

    /// Fetch one row by its composite identity and merge it in.
    ///
    /// Used after the creation dialog appends an announcement: a full
    /// reload would reset the operator's scroll and selection for the sake
    /// of one new row.
    pub async fn merge_single(
        &mut self,
        flight_id: i64,
        audio_text_id: i64,
    ) -> Result<(), FetchError> {
        let filter = ScheduleFilter::Pair {
            flight_id,
            audio_text_id,
        };
        let mut fetched = self.api.get_scheduler(Some(&filter)).await?;
        let first = fetched.drain(..).next();
        match first {
            Some(row) => {
                self.merge_row(row);
                Ok(())
            }
            None => {
                warn!(
                    flight_id,
                    audio_text_id, "targeted schedule query returned no rows"
                );
                Ok(())
            }
        }
    }

    /// Merge one fetched row: insert and re-sort when new, otherwise pick
    /// up the refreshed event time. The row becomes the active selection
    /// either way.
    pub fn merge_row(&mut self, row: ScheduleRow) {
        let existing_id = self
            .rows_in_order()
            .find(|r| r.flight_id == row.flight_id && r.audio_text_id == row.audio_text_id)
            .map(|r| r.schedule_id.clone());

        match existing_id {
            Some(id) => {
                debug!(schedule_id = %id, "merge: row already present, refreshing event time");
                if let Some(existing) = self.rows.get_mut(&id) {
                    existing.event_time = row.event_time;
                }
                self.select(&id);
            }
            None => {
                let id = row.schedule_id.clone();
                debug!(schedule_id = %id, "merge: inserting new row");
                self.rows.insert(id.clone(), row);
                self.order.push(id.clone());
                self.sort_order();
                self.select(&id);
            }
        }
    }

    /// Remove one row, or every row of its flight.
    ///
    /// The highlight stays at the same visual position where possible.
    pub fn delete_row(&mut self, schedule_id: &str, delete_all_for_flight: bool) {
        let Some(target) = self.rows.get(schedule_id) else {
            return;
        };
        let flight_id = target.flight_id;
        let audio_text_id = target.audio_text_id;

        let previous_index = self.active_index().unwrap_or(0);

        self.order.retain(|id| {
            let row = &self.rows[id];
            let doomed = if delete_all_for_flight {
                row.flight_id == flight_id
            } else {
                row.flight_id == flight_id && row.audio_text_id == audio_text_id
            };
            !doomed
        });
        self.rows.retain(|_, row| {
            if delete_all_for_flight {
                row.flight_id != flight_id
            } else {
                row.flight_id != flight_id || row.audio_text_id != audio_text_id
            }
        });

        match &self.active {
            Some(id) if self.rows.contains_key(id) => {}
            _ => {
                self.active = None;
                if !self.order.is_empty() {
                    let index = previous_index.min(self.order.len() - 1);
                    let id = self.order[index].clone();
                    self.select(&id);
                }
            }
        }
    }

    /// Mark a row as voiced (natural playback completion).
    pub fn mark_played(&mut self, schedule_id: &str) {
        if let Some(row) = self.rows.get_mut(schedule_id) {
            row.is_played = true;
        }
    }

    /// Mark a row's autoplay as canceled (manual stop).
    pub fn mark_autoplay_canceled(&mut self, schedule_id: &str) {
        if let Some(row) = self.rows.get_mut(schedule_id) {
            row.autoplay_is_canceled = true;
        }
    }

    fn sort_order(&mut self) {
        let rows = &self.rows;
        self.order
            .sort_by(|a, b| rows[a].sort_key().cmp(&rows[b].sort_key()));
    }

    fn reselect(&mut self, previous: Option<String>) {
        if let Some(id) = previous {
            if self.rows.contains_key(&id) {
                self.active = Some(id);
                return;
            }
        }
        if let Some(flight) = self.current_flight {
            if let Some(id) = self
                .order
                .iter()
                .find(|id| self.rows[*id].flight_id == flight)
                .cloned()
            {
                self.active = Some(id);
                return;
            }
        }
        self.active = self.order.first().cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use speaker_common::time::parse_datetime;
    use std::collections::BTreeMap;

    fn dt(value: &str) -> NaiveDateTime {
        parse_datetime(value).unwrap()
    }

    fn make_row(
        schedule_id: &str,
        flight_id: i64,
        audio_text_id: i64,
        flight_datetime: &str,
        queue: Option<i64>,
    ) -> ScheduleRow {
        ScheduleRow {
            schedule_id: schedule_id.to_string(),
            flight_id,
            audio_text_id,
            flight_number: format!("SU {flight_id}"),
            direction: "Departure".to_string(),
            direction_id: 2,
            status_id: 1,
            flight_datetime: dt(flight_datetime),
            plan_time: "12:00".to_string(),
            public_time: "12:00".to_string(),
            audio_text: "Boarding".to_string(),
            audio_text_description: None,
            event_time: None,
            route: "Moscow".to_string(),
            terminal: Some("A".to_string()),
            boarding_gates: vec![1],
            languages: BTreeMap::new(),
            zones_list: vec![1],
            queue,
            is_played: false,
            job_id: None,
            job_time: None,
            job_datetime: None,
            job_is_fact: None,
            autoplay_is_canceled: false,
            is_has_terminal: false,
            is_has_boarding_gate: false,
        }
    }

    fn order_of(store: &ScheduleStore) -> Vec<String> {
        store.visual_order().to_vec()
    }

    fn store() -> ScheduleStore {
        let api = Arc::new(ApiClient::new("http://127.0.0.1:1/").unwrap());
        ScheduleStore::new(api)
    }

    #[test]
    fn rows_sort_by_datetime_then_flight() {
        let mut store = store();
        store.replace_rows(vec![
            make_row("2_1", 2, 1, "2026-08-07 13:00:00", None),
            make_row("1_1", 1, 1, "2026-08-07 12:00:00", None),
            make_row("3_1", 3, 1, "2026-08-07 12:00:00", None),
        ]);

        assert_eq!(order_of(&store), vec!["1_1", "3_1", "2_1"]);
    }

    #[test]
    fn queued_rows_sort_before_unqueued_on_ties() {
        // Both rows share the flight datetime: the row carrying a manual
        // queue position wins the tie over the one without.
        let mut store = store();
        store.replace_rows(vec![
            make_row("1_10", 1, 10, "2026-08-07 12:00:00", None),
            make_row("1_5", 1, 5, "2026-08-07 12:00:00", Some(3)),
        ]);

        assert_eq!(order_of(&store), vec!["1_5", "1_10"]);
    }

    #[test]
    fn schedule_id_is_the_final_tiebreak() {
        let mut store = store();
        store.replace_rows(vec![
            make_row("1_9", 1, 9, "2026-08-07 12:00:00", Some(0)),
            make_row("1_8", 1, 8, "2026-08-07 12:00:00", Some(0)),
        ]);

        assert_eq!(order_of(&store), vec!["1_8", "1_9"]);
    }

    #[test]
    fn refresh_preserves_active_selection() {
        let mut store = store();
        let rows = vec![
            make_row("1_1", 1, 1, "2026-08-07 12:00:00", None),
            make_row("2_1", 2, 1, "2026-08-07 13:00:00", None),
        ];
        store.replace_rows(rows.clone());
        store.select("2_1");

        store.replace_rows(rows);
        assert_eq!(store.active_id(), Some("2_1"));
    }

    #[test]
    fn replace_is_idempotent() {
        let mut store = store();
        let rows = vec![
            make_row("1_1", 1, 1, "2026-08-07 12:00:00", None),
            make_row("2_1", 2, 1, "2026-08-07 13:00:00", Some(1)),
            make_row("3_1", 3, 1, "2026-08-07 11:00:00", None),
        ];
        store.replace_rows(rows.clone());
        let order_first: Vec<String> = store.visual_order().to_vec();
        let active_first = store.active_id().map(String::from);

        store.replace_rows(rows);
        assert_eq!(order_of(&store), order_first);
        assert_eq!(store.active_id().map(String::from), active_first);
    }

    #[test]
    fn vanished_selection_falls_back_to_current_flight() {
        let mut store = store();
        store.replace_rows(vec![
            make_row("1_1", 1, 1, "2026-08-07 12:00:00", None),
            make_row("1_2", 1, 2, "2026-08-07 12:00:00", None),
            make_row("2_1", 2, 1, "2026-08-07 13:00:00", None),
        ]);
        store.select("1_2");

        // The selected row is gone but its flight still has a row.
        store.replace_rows(vec![
            make_row("1_1", 1, 1, "2026-08-07 12:00:00", None),
            make_row("2_1", 2, 1, "2026-08-07 13:00:00", None),
        ]);
        assert_eq!(store.active_id(), Some("1_1"));
    }

    #[test]
    fn empty_refresh_clears_selection() {
        let mut store = store();
        store.replace_rows(vec![make_row("1_1", 1, 1, "2026-08-07 12:00:00", None)]);
        assert!(store.active_id().is_some());

        store.replace_rows(Vec::new());
        assert_eq!(store.active_id(), None);
    }

    #[test]
    fn merge_inserts_sorts_and_selects() {
        let mut store = store();
        store.replace_rows(vec![
            make_row("1_1", 1, 1, "2026-08-07 10:00:00", None),
            make_row("2_1", 2, 1, "2026-08-07 11:00:00", None),
            make_row("3_1", 3, 1, "2026-08-07 12:00:00", None),
            make_row("4_1", 4, 1, "2026-08-07 13:00:00", None),
            make_row("5_1", 5, 1, "2026-08-07 14:00:00", None),
        ]);
        store.select("5_1");

        store.merge_row(make_row("100_7", 100, 7, "2026-08-07 11:30:00", None));

        assert_eq!(store.len(), 6);
        assert_eq!(store.visual_order()[2], "100_7");
        assert_eq!(store.active_id(), Some("100_7"));
    }

    #[test]
    fn merge_of_present_row_updates_event_time_only() {
        let mut store = store();
        store.replace_rows(vec![make_row("1_1", 1, 1, "2026-08-07 12:00:00", None)]);
        store.row_mut("1_1").unwrap().terminal = Some("B".to_string());

        let mut update = make_row("1_1", 1, 1, "2026-08-07 18:00:00", None);
        update.event_time = Some("12:45".to_string());
        update.terminal = Some("C".to_string());
        store.merge_row(update);

        let row = store.row("1_1").unwrap();
        assert_eq!(row.event_time.as_deref(), Some("12:45"));
        // Everything else keeps the local state.
        assert_eq!(row.terminal.as_deref(), Some("B"));
        assert_eq!(row.flight_datetime, dt("2026-08-07 12:00:00"));
        assert_eq!(store.active_id(), Some("1_1"));
    }

    #[test]
    fn delete_single_row_keeps_visual_position() {
        let mut store = store();
        store.replace_rows(vec![
            make_row("1_1", 1, 1, "2026-08-07 10:00:00", None),
            make_row("2_1", 2, 1, "2026-08-07 11:00:00", None),
            make_row("3_1", 3, 1, "2026-08-07 12:00:00", None),
        ]);
        store.select("2_1");

        store.delete_row("2_1", false);

        assert_eq!(store.len(), 2);
        // The row that moved up into index 1 is highlighted.
        assert_eq!(store.active_id(), Some("3_1"));
    }

    #[test]
    fn delete_all_for_flight_removes_every_text() {
        let mut store = store();
        store.replace_rows(vec![
            make_row("1_1", 1, 1, "2026-08-07 10:00:00", None),
            make_row("1_2", 1, 2, "2026-08-07 10:00:00", None),
            make_row("2_1", 2, 1, "2026-08-07 11:00:00", None),
        ]);

        store.delete_row("1_1", true);

        assert_eq!(order_of(&store), vec!["2_1"]);
        assert_eq!(store.active_id(), Some("2_1"));
    }

    #[test]
    fn delete_of_last_row_clamps_selection() {
        let mut store = store();
        store.replace_rows(vec![
            make_row("1_1", 1, 1, "2026-08-07 10:00:00", None),
            make_row("2_1", 2, 1, "2026-08-07 11:00:00", None),
        ]);
        store.select("2_1");

        store.delete_row("2_1", false);
        assert_eq!(store.active_id(), Some("1_1"));

        store.delete_row("1_1", false);
        assert_eq!(store.active_id(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn played_and_canceled_marks_stick() {
        let mut store = store();
        store.replace_rows(vec![make_row("1_1", 1, 1, "2026-08-07 10:00:00", None)]);

        store.mark_played("1_1");
        store.mark_autoplay_canceled("1_1");

        let row = store.row("1_1").unwrap();
        assert!(row.is_played);
        assert!(row.autoplay_is_canceled);
    }
}
