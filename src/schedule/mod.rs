//! Pure scheduling leaves: time parsing, interval-overlap conflict checks,
//! and conflict-aware color assignment. Nothing here touches the store.

pub mod color;
pub mod conflict;
pub mod time;
