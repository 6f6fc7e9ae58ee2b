//! Announcement schedule state
//!
//! In-memory mirrors of the collaborator's schedule tables: the flight
//! announcement schedule, its background counterpart, and the operator's
//! per-row selection.

pub mod background;
pub mod selection;
pub mod store;

pub use background::BackgroundStore;
pub use selection::{Selection, SelectionState};
pub use store::ScheduleStore;
