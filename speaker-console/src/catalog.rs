//! Static catalogs fetched once at startup
//!
//! The zone catalog is startup-critical: without it no announcement can be
//! routed to hardware channels. The announcement catalog feeds the
//! creation dialogs and is refreshed only by restarting.

use speaker_common::api::types::{AudioText, AudioTextReason, Terminal, Zone};
use speaker_common::{ApiClient, FetchError};
use tracing::{info, warn};

/// Lookup of physical playback zones and their hardware channels.
#[derive(Debug, Clone)]
pub struct ZoneCatalog {
    zones: Vec<Zone>,
}

impl ZoneCatalog {
    /// Fetch the catalog. Failure here is fatal to startup.
    pub async fn load(api: &ApiClient) -> Result<Self, FetchError> {
        let zones = api.get_zones().await?;
        info!("Loaded {} playback zones", zones.len());
        Ok(Self { zones })
    }

    pub fn from_zones(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    pub fn get(&self, id: u32) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Map selected zone ids to hardware output channels.
    ///
    /// Unknown ids are skipped with a warning; duplicates collapse.
    pub fn channels_for(&self, zone_ids: &[u32]) -> Vec<u16> {
        let mut channels = Vec::with_capacity(zone_ids.len());
        for &id in zone_ids {
            match self.get(id) {
                Some(zone) => {
                    if !channels.contains(&zone.channel) {
                        channels.push(zone.channel);
                    }
                }
                None => warn!(zone_id = id, "selected zone is not in the catalog"),
            }
        }
        channels
    }
}

/// Selectable announcement texts plus dialog lookups.
#[derive(Debug, Clone)]
pub struct AnnouncementCatalog {
    texts: Vec<AudioText>,
    terminals: Vec<Terminal>,
    reasons: Vec<AudioTextReason>,
}

impl AnnouncementCatalog {
    /// Catalog with nothing in it; the dialogs degrade to empty pickers.
    pub fn empty() -> Self {
        Self {
            texts: Vec::new(),
            terminals: Vec::new(),
            reasons: Vec::new(),
        }
    }

    pub async fn load(api: &ApiClient) -> Result<Self, FetchError> {
        let texts = api.get_audio_text().await?;
        let terminals = api.get_terminals().await?;
        let reasons = api.get_audio_text_reasons().await?;
        info!(
            "Loaded announcement catalog: {} texts, {} terminals, {} reasons",
            texts.len(),
            terminals.len(),
            reasons.len()
        );
        Ok(Self {
            texts,
            terminals,
            reasons,
        })
    }

    pub fn text(&self, id: i64) -> Option<&AudioText> {
        self.texts.iter().find(|t| t.id == id)
    }

    /// Texts applicable to a flight direction.
    pub fn texts_for_direction(&self, direction_id: i64) -> Vec<&AudioText> {
        self.texts
            .iter()
            .filter(|t| match &t.direction_ids {
                Some(ids) => ids.contains(&direction_id),
                None => true,
            })
            .collect()
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    pub fn reasons(&self) -> &[AudioTextReason] {
        &self.reasons
    }
}
