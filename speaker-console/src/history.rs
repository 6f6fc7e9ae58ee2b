//! Action history reporting
//!
//! Every play and manual stop is logged to the collaborator's audit trail.
//! Reporting is fire-and-forget: a failed POST is logged and forgotten,
//! never surfaced to the operator and never retried.

use std::net::UdpSocket;
use std::sync::Arc;

use speaker_common::api::types::{ActionCode, ActionHistoryRecord};
use speaker_common::ApiClient;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::playback::PlaybackRequest;

/// Fire-and-forget audit log client.
#[derive(Debug, Clone)]
pub struct ActionHistoryReporter {
    api: Arc<ApiClient>,
    user_id: Uuid,
    client_ip: String,
}

impl ActionHistoryReporter {
    pub fn new(api: Arc<ApiClient>, user_id: Uuid) -> Self {
        let client_ip = detect_client_ip();
        debug!(%client_ip, "action history reporter ready");
        Self {
            api,
            user_id,
            client_ip,
        }
    }

    /// Record an action for the given playback request.
    pub fn report(&self, request: &PlaybackRequest, action: ActionCode) {
        let record = ActionHistoryRecord {
            user_id: self.user_id,
            flight_id: request.source.flight_id(),
            audio_text_id: request.source.audio_text_id(),
            languages: request.language_ids.clone(),
            zones: request.zones.clone(),
            terminal: request.terminal.clone(),
            boarding_gates: request.boarding_gates.clone(),
            action_code: action,
            client_ip: self.client_ip.clone(),
            is_autoplay: request.is_autoplay,
        };

        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(err) = api.save_action_history(&record).await {
                warn!("action history not recorded: {err}");
            }
        });
    }
}

/// Address this station reaches the collaborator from.
///
/// Routing-table trick: connect a UDP socket (no packets are sent) and
/// read the chosen local address.
fn detect_client_ip() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_is_always_available() {
        let ip = detect_client_ip();
        assert!(!ip.is_empty());
        assert!(ip.parse::<std::net::IpAddr>().is_ok());
    }
}
