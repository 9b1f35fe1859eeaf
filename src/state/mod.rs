//! Cursor and bookmark state
//!
//! The connector receives the per-entity cursor map as input and returns the
//! updated map as output. Persistence between invocations is owned entirely
//! by the external orchestrator; nothing in this module touches disk.

mod types;

pub use types::{CursorValue, EntityState, SyncState};
