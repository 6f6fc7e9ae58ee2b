//! # Speaker Common Library (speaker-common)
//!
//! Shared boundary types for the announcement speaker console.
//!
//! **Purpose:** Typed collaborator-API client and payloads, fetch error
//! taxonomy, the console event bus, and datetime serde helpers.

pub mod api;
pub mod error;
pub mod events;
pub mod time;

pub use api::ApiClient;
pub use error::{FetchError, Result};
pub use events::{EventBus, SpeakerEvent};
