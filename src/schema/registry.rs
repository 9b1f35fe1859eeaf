//! Schema registry
//!
//! Resolves one schema per entity per invocation. Static definitions take
//! strict precedence; otherwise the registry infers from sample records.
//! The cache lives only as long as the registry, which is constructed fresh
//! per invocation.

use super::inference::{detect_primary_key, infer_columns};
use super::statics::static_schema;
use super::types::{EntitySchema, SchemaSource};
use crate::error::{Error, Result};
use crate::types::{JsonValue, SyncMode};
use std::collections::HashMap;
use tracing::debug;

/// Invocation-scoped schema registry
#[derive(Debug)]
pub struct SchemaRegistry {
    /// Max sample records examined during inference
    sample_size: usize,
    /// Resolved schemas, one per entity
    cache: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    /// Create a new registry
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            cache: HashMap::new(),
        }
    }

    /// Resolve the schema for an entity
    ///
    /// `samples` is only consulted when no static schema exists; callers
    /// pass an empty slice for known entities.
    pub fn resolve(&mut self, entity: &str, samples: &[JsonValue]) -> Result<&EntitySchema> {
        if !self.cache.contains_key(entity) {
            let schema = self.resolve_uncached(entity, samples)?;
            self.cache.insert(entity.to_string(), schema);
        }

        Ok(&self.cache[entity])
    }

    /// Peek at an already-resolved schema without re-resolving
    pub fn get(&self, entity: &str) -> Option<&EntitySchema> {
        self.cache.get(entity)
    }

    /// Whether a static definition exists for an entity
    pub fn has_static(entity: &str) -> bool {
        static_schema(entity).is_some()
    }

    fn resolve_uncached(&self, entity: &str, samples: &[JsonValue]) -> Result<EntitySchema> {
        if let Some(schema) = static_schema(entity) {
            debug!(entity, "resolved static schema");
            return Ok(schema.clone());
        }

        if samples.is_empty() {
            return Err(Error::schema(
                entity,
                "no predefined schema and no sample records to infer from",
            ));
        }

        let columns = infer_columns(samples, self.sample_size);
        if columns.is_empty() {
            return Err(Error::schema(
                entity,
                "sample records contained no usable columns",
            ));
        }

        let primary_key = detect_primary_key(entity, &columns).ok_or(Error::NoPrimaryKey {
            entity: entity.to_string(),
        })?;

        debug!(
            entity,
            columns = columns.len(),
            primary_key = %primary_key,
            "inferred schema from samples"
        );

        Ok(EntitySchema {
            entity: entity.to_string(),
            primary_key: vec![primary_key],
            columns,
            source: SchemaSource::Inferred,
            sync_mode: SyncMode::Incremental,
        })
    }
}
