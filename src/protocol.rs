//! Wire payloads exchanged with the external orchestrator
//!
//! The connector answers three operations: `test`, `schema`, and `sync`.
//! Per-entity failure is data, not an exception: each entity's outcome in a
//! sync response is a tagged value carrying either its records and cursor
//! or the reason it failed, so one entity can never abort its siblings.

use crate::schema::EntitySchema;
use crate::state::{EntityState, SyncState};
use crate::types::JsonObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// test
// ============================================================================

/// Result of the `test` operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    /// Whether authentication succeeded
    pub success: bool,

    /// Human-readable reason
    pub message: String,
}

impl TestResponse {
    /// Create a successful test response
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Create a failed test response
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// ============================================================================
// schema
// ============================================================================

/// Result of the `schema` operation
///
/// Resolution failures are reported per entity; they never fail the
/// operation as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaResponse {
    /// Resolved schema per entity
    pub entities: BTreeMap<String, EntitySchema>,

    /// Resolution failure reason per entity
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<String, String>,
}

impl SchemaResponse {
    /// Create an empty schema response
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved schema
    pub fn add_schema(&mut self, schema: EntitySchema) {
        self.entities.insert(schema.entity.clone(), schema);
    }

    /// Record a per-entity failure
    pub fn add_failure(&mut self, entity: impl Into<String>, reason: impl Into<String>) {
        self.failures.insert(entity.into(), reason.into());
    }
}

// ============================================================================
// sync
// ============================================================================

/// Input payload for the `sync` operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequest {
    /// Entities to process (empty = all configured entities)
    #[serde(default)]
    pub entities: Vec<String>,

    /// Cursor state handed back from the previous invocation
    #[serde(default)]
    pub state: SyncState,
}

/// Outcome of one entity within a sync
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    /// Extraction completed (or stopped cleanly at the time budget)
    Ok {
        /// Enhanced records in commit order
        records: Vec<JsonObject>,
        /// Whether pages remain for the next invocation
        has_more: bool,
        /// Committed cursor state
        state: EntityState,
    },

    /// The entity's schema could not be resolved; nothing was extracted
    SchemaFailed {
        /// Resolution failure reason
        reason: String,
    },

    /// Extraction failed after zero or more committed pages
    ExtractionFailed {
        /// Failure reason
        reason: String,
        /// Records from pages committed before the failure
        records: Vec<JsonObject>,
        /// Cursor state as of the last committed page
        state: EntityState,
    },
}

impl EntityOutcome {
    /// Records carried by this outcome, if any
    pub fn records(&self) -> &[JsonObject] {
        match self {
            EntityOutcome::Ok { records, .. }
            | EntityOutcome::ExtractionFailed { records, .. } => records,
            EntityOutcome::SchemaFailed { .. } => &[],
        }
    }

    /// Whether the entity completed without error
    pub fn is_ok(&self) -> bool {
        matches!(self, EntityOutcome::Ok { .. })
    }
}

/// Statistics for one sync invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Total records emitted
    pub records_synced: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Entities that completed without error
    pub entities_synced: usize,
    /// Entities that failed
    pub errors: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add emitted records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a fetched page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add a completed entity
    pub fn add_entity(&mut self) {
        self.entities_synced += 1;
    }

    /// Add a failed entity
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Result of the `sync` operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Per-entity outcome
    pub entities: BTreeMap<String, EntityOutcome>,

    /// Merged cursor state across all entities, to be persisted by the
    /// orchestrator and handed back on the next invocation
    pub state: SyncState,

    /// Invocation statistics
    pub stats: SyncStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CursorValue;
    use serde_json::json;

    #[test]
    fn test_test_response_shapes() {
        let ok = TestResponse::success("Authenticated");
        assert!(ok.success);

        let failed = TestResponse::failure("Invalid credentials");
        assert!(!failed.success);
        assert_eq!(failed.message, "Invalid credentials");
    }

    #[test]
    fn test_entity_outcome_serialization_is_tagged() {
        let outcome = EntityOutcome::SchemaFailed {
            reason: "no primary key".to_string(),
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "schema_failed");
        assert_eq!(json["reason"], "no primary key");
    }

    #[test]
    fn test_extraction_failed_keeps_partial_records() {
        let mut state = EntityState::new();
        state.advance(CursorValue::Offset(100));

        let outcome = EntityOutcome::ExtractionFailed {
            reason: "retries exhausted".to_string(),
            records: vec![json!({"sale_id": "s1"}).as_object().unwrap().clone()],
            state,
        };

        assert!(!outcome.is_ok());
        assert_eq!(outcome.records().len(), 1);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "extraction_failed");
        assert_eq!(json["state"]["cursor"], 100);
    }

    #[test]
    fn test_sync_request_defaults() {
        let request: SyncRequest = serde_json::from_str("{}").unwrap();
        assert!(request.entities.is_empty());
        assert!(request.state.entities.is_empty());
    }

    #[test]
    fn test_sync_request_with_state() {
        let request: SyncRequest = serde_json::from_value(json!({
            "entities": ["article", "sale"],
            "state": {
                "entities": {
                    "article": { "cursor": "2024-05-01T00:00:00Z" }
                }
            }
        }))
        .unwrap();

        assert_eq!(request.entities, vec!["article", "sale"]);
        assert!(matches!(
            request.state.cursor("article"),
            Some(CursorValue::Timestamp(_))
        ));
    }
}
