//! State types for tracking sync progress
//!
//! These types are serialized into the protocol payloads exchanged with the
//! external orchestrator. Cursor advancement is monotonic: `advance` never
//! moves a cursor backwards, so a replayed or out-of-order page cannot
//! regress committed progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A per-entity cursor value
///
/// Timestamp cursors mark the latest modification time seen; offset cursors
/// count records already committed for sources without a usable timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CursorValue {
    /// RFC 3339 modification timestamp
    Timestamp(DateTime<Utc>),
    /// Numeric record offset
    Offset(u64),
}

impl CursorValue {
    /// Render the cursor the way the source API expects it as a query value
    pub fn to_query_value(&self) -> String {
        match self {
            CursorValue::Timestamp(ts) => ts.to_rfc3339(),
            CursorValue::Offset(n) => n.to_string(),
        }
    }

    /// Whether `other` is strictly ahead of `self`
    ///
    /// Mixed representations never compare as ahead; an entity keeps one
    /// cursor format for its whole lifetime.
    pub fn is_behind(&self, other: &CursorValue) -> bool {
        match (self, other) {
            (CursorValue::Timestamp(a), CursorValue::Timestamp(b)) => a < b,
            (CursorValue::Offset(a), CursorValue::Offset(b)) => a < b,
            _ => false,
        }
    }
}

/// State for a single entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Current cursor value (absent until the first committed page)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorValue>,
}

impl EntityState {
    /// Create a new empty entity state
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the cursor, keeping it monotonically non-decreasing
    ///
    /// Returns true if the cursor moved.
    pub fn advance(&mut self, candidate: CursorValue) -> bool {
        match &self.cursor {
            None => {
                self.cursor = Some(candidate);
                true
            }
            Some(current) if current.is_behind(&candidate) => {
                self.cursor = Some(candidate);
                true
            }
            Some(_) => false,
        }
    }
}

/// Complete cursor state for a connector invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Per-entity state
    #[serde(default)]
    pub entities: HashMap<String, EntityState>,
}

impl SyncState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for an entity
    pub fn get(&self, entity: &str) -> Option<&EntityState> {
        self.entities.get(entity)
    }

    /// Get mutable state for an entity, creating if needed
    pub fn get_mut(&mut self, entity: &str) -> &mut EntityState {
        self.entities.entry(entity.to_string()).or_default()
    }

    /// Get cursor for an entity
    pub fn cursor(&self, entity: &str) -> Option<&CursorValue> {
        self.entities.get(entity)?.cursor.as_ref()
    }

    /// Advance the cursor for an entity (monotonic)
    pub fn advance(&mut self, entity: &str, candidate: CursorValue) -> bool {
        self.get_mut(entity).advance(candidate)
    }

    /// Merge another state into this one, entity by entity, monotonically
    pub fn merge(&mut self, other: &SyncState) {
        for (entity, state) in &other.entities {
            if let Some(cursor) = &state.cursor {
                self.advance(entity, cursor.clone());
            }
        }
    }
}
