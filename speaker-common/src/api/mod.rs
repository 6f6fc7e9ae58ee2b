//! Collaborator service client
//!
//! One `ApiClient` per process. Every endpoint the console consumes is a
//! typed method; payload shapes live in [`types`].

pub mod types;

use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{FetchError, Result};
use types::*;

const USER_AGENT: &str = concat!("speaker-console/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the announcement collaborator service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client against the configured base URL.
    ///
    /// The base URL is normalized to end with `/` so endpoint names join
    /// as path segments.
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| FetchError::Malformed {
            endpoint: base_url.to_string(),
            detail: format!("invalid base url: {e}"),
        })?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> Url {
        // The base URL always ends with '/', so join cannot fail for a
        // bare endpoint name.
        self.base_url
            .join(name)
            .expect("endpoint name must be a valid path segment")
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        name: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(name);
        debug!(endpoint = name, "GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(name, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                endpoint: name.to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Malformed {
                endpoint: name.to_string(),
                detail: e.to_string(),
            })
    }

    async fn post_json<B: Serialize + ?Sized>(&self, name: &str, body: &B) -> Result<()> {
        let url = self.endpoint(name);
        debug!(endpoint = name, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(name, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                endpoint: name.to_string(),
            });
        }
        Ok(())
    }

    /// `GET get_zones`: the physical zone catalog, fetched once at startup.
    pub async fn get_zones(&self) -> Result<Vec<Zone>> {
        self.get_json("get_zones", &[]).await
    }

    /// `GET get_scheduler`: the full schedule, or a targeted subset.
    pub async fn get_scheduler(&self, filter: Option<&ScheduleFilter>) -> Result<Vec<ScheduleRow>> {
        let query = match filter {
            None => Vec::new(),
            Some(ScheduleFilter::Pair {
                flight_id,
                audio_text_id,
            }) => vec![
                ("flight_id", flight_id.to_string()),
                ("audio_text_id", audio_text_id.to_string()),
            ],
            Some(ScheduleFilter::FlightNumber(number)) => {
                vec![("flight_number", number.clone())]
            }
        };
        self.get_json("get_scheduler", &query).await
    }

    /// `POST get_scheduler_sound`: render one announcement to audio bytes.
    pub async fn render_announcement(&self, request: &RenderRequest) -> Result<Vec<u8>> {
        let name = "get_scheduler_sound";
        let url = self.endpoint(name);
        debug!(endpoint = name, audio_text_id = request.audio_text_id, "POST");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(name, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                endpoint: name.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(name, e))?;
        Ok(bytes.to_vec())
    }

    /// `POST update_schedule`: persist the operator's row selection.
    pub async fn update_schedule(&self, request: &UpdateScheduleRequest) -> Result<()> {
        self.post_json("update_schedule", request).await
    }

    /// `POST set_schedule_is_played`
    pub async fn set_schedule_is_played(&self, key: ScheduleKey) -> Result<()> {
        self.post_json("set_schedule_is_played", &key).await
    }

    /// `POST set_schedule_autoplay_is_canceled`
    pub async fn set_schedule_autoplay_is_canceled(&self, key: ScheduleKey) -> Result<()> {
        self.post_json("set_schedule_autoplay_is_canceled", &key)
            .await
    }

    /// `POST save_action_history`: audit log record.
    pub async fn save_action_history(&self, record: &ActionHistoryRecord) -> Result<()> {
        self.post_json("save_action_history", record).await
    }

    /// `GET get_audio_background_text`: the background announcement list.
    pub async fn get_audio_background_text(&self) -> Result<Vec<BackgroundRow>> {
        self.get_json("get_audio_background_text", &[]).await
    }

    /// `POST update_audio_background_text`: persist background selection.
    pub async fn update_audio_background_text(&self, row: &BackgroundRow) -> Result<()> {
        self.post_json("update_audio_background_text", row).await
    }

    /// `POST delete_audio_background_text`
    pub async fn delete_audio_background_text(&self, audio_text_id: i64) -> Result<()> {
        self.post_json(
            "delete_audio_background_text",
            &serde_json::json!({ "audio_text_id": audio_text_id }),
        )
        .await
    }

    /// `GET get_terminals`: dialog boundary.
    pub async fn get_terminals(&self) -> Result<Vec<Terminal>> {
        self.get_json("get_terminals", &[]).await
    }

    /// `GET get_audio_text`: the selectable announcement text catalog.
    pub async fn get_audio_text(&self) -> Result<Vec<AudioText>> {
        self.get_json("get_audio_text", &[]).await
    }

    /// `GET get_audio_text_reasons`: dialog boundary.
    pub async fn get_audio_text_reasons(&self) -> Result<Vec<AudioTextReason>> {
        self.get_json("get_audio_text_reasons", &[]).await
    }

    /// `GET get_flights`: flight picker for the creation dialog.
    pub async fn get_flights(&self, flight_id: Option<i64>) -> Result<Vec<FlightInfo>> {
        let query = match flight_id {
            Some(id) => vec![("flight_id", id.to_string())],
            None => Vec::new(),
        };
        self.get_json("get_flights", &query).await
    }

    /// `POST append_audio_text_to_schedule`: create an announcement.
    pub async fn append_audio_text_to_schedule(
        &self,
        request: &AppendScheduleRequest,
    ) -> Result<()> {
        self.post_json("append_audio_text_to_schedule", request).await
    }

    /// `POST delete_schedule`: server-side removal.
    pub async fn delete_schedule(&self, request: &DeleteScheduleRequest) -> Result<()> {
        self.post_json("delete_schedule", request).await
    }
}
