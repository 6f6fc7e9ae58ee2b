//! Error types for collaborator traffic
//!
//! Every request the console issues against the collaborator service fails
//! into this taxonomy. Fetch errors are never fatal mid-session: callers
//! surface them as status messages and retry on the next poll.

use thiserror::Error;

/// Failure of a single collaborator request
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (refused, reset, timeout, DNS)
    #[error("connection error: {0}")]
    Connection(String),

    /// Server answered with a non-2xx status
    #[error("unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    /// Body did not match the expected payload shape
    #[error("malformed payload from {endpoint}: {detail}")]
    Malformed { endpoint: String, detail: String },
}

impl FetchError {
    /// Classify a reqwest error for the given endpoint.
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Malformed {
                endpoint: endpoint.to_string(),
                detail: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            }
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}

/// Convenience Result type for collaborator calls
pub type Result<T> = std::result::Result<T, FetchError>;
