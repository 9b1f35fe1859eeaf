//! Schema types

use crate::types::{JsonObject, JsonValue, SyncMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column type for an entity schema
///
/// Declaration order is the looseness ladder used by inference: a column's
/// final type is the loosest type observed across samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    String,
}

impl ColumnType {
    /// Merge two types, returning the looser of the two
    pub fn merge_with(self, other: ColumnType) -> ColumnType {
        self.max(other)
    }

    /// Classify a JSON value, if it carries type information
    ///
    /// Nulls carry none and return None; objects and arrays are treated as
    /// strings since the warehouse side stores them serialized.
    pub fn of_value(value: &JsonValue) -> Option<ColumnType> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(_) => Some(ColumnType::Boolean),
            JsonValue::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Some(ColumnType::Integer)
                } else {
                    Some(ColumnType::Float)
                }
            }
            JsonValue::String(_) => Some(ColumnType::String),
            JsonValue::Array(_) | JsonValue::Object(_) => Some(ColumnType::String),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::String => write!(f, "string"),
        }
    }
}

/// Where a resolved schema came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    /// Predefined for a known entity
    Static,
    /// Inferred from sample records
    Inferred,
}

/// A resolved schema for one entity
///
/// Immutable once resolved for an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Entity name
    pub entity: String,

    /// Primary key column(s)
    pub primary_key: Vec<String>,

    /// Column name to type map
    pub columns: BTreeMap<String, ColumnType>,

    /// Static or inferred
    pub source: SchemaSource,

    /// How the entity syncs (aggregate entities are always full refresh)
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl EntitySchema {
    /// Create a static schema from a declarative column list
    pub fn new_static(
        entity: impl Into<String>,
        primary_key: &[&str],
        columns: &[(&str, ColumnType)],
    ) -> Self {
        Self {
            entity: entity.into(),
            primary_key: primary_key.iter().map(ToString::to_string).collect(),
            columns: columns
                .iter()
                .map(|(name, ty)| ((*name).to_string(), *ty))
                .collect(),
            source: SchemaSource::Static,
            sync_mode: SyncMode::Incremental,
        }
    }

    /// Mark this schema as full refresh
    #[must_use]
    pub fn full_refresh(mut self) -> Self {
        self.sync_mode = SyncMode::FullRefresh;
        self
    }

    /// Check that every primary-key column is declared
    pub fn is_consistent(&self) -> bool {
        self.primary_key.iter().all(|k| self.columns.contains_key(k))
    }

    /// Conform a raw record to this schema
    ///
    /// Declared columns are carried over (coerced to the declared type,
    /// falling back to null), missing declared columns become explicit
    /// nulls, and undeclared columns are dropped.
    pub fn conform(&self, record: &JsonValue) -> JsonObject {
        let mut out = JsonObject::new();
        let source = record.as_object();

        for (name, ty) in &self.columns {
            let value = source
                .and_then(|map| map.get(name))
                .map_or(JsonValue::Null, |v| coerce(v, *ty));
            out.insert(name.clone(), value);
        }

        out
    }
}

/// Coerce a JSON value to a column type, falling back to null
fn coerce(value: &JsonValue, ty: ColumnType) -> JsonValue {
    if value.is_null() {
        return JsonValue::Null;
    }

    match ty {
        ColumnType::Boolean => match value {
            JsonValue::Bool(_) => value.clone(),
            JsonValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => JsonValue::Bool(true),
                "false" => JsonValue::Bool(false),
                _ => JsonValue::Null,
            },
            _ => JsonValue::Null,
        },
        ColumnType::Integer => match value {
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
            JsonValue::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map_or(JsonValue::Null, |f| JsonValue::from(f as i64)),
            JsonValue::String(s) => s
                .parse::<i64>()
                .map_or(JsonValue::Null, JsonValue::from),
            _ => JsonValue::Null,
        },
        ColumnType::Float => match value {
            JsonValue::Number(n) => n.as_f64().map_or(JsonValue::Null, JsonValue::from),
            JsonValue::String(s) => s
                .parse::<f64>()
                .map_or(JsonValue::Null, JsonValue::from),
            _ => JsonValue::Null,
        },
        ColumnType::String => match value {
            JsonValue::String(_) => value.clone(),
            JsonValue::Number(n) => JsonValue::from(n.to_string()),
            JsonValue::Bool(b) => JsonValue::from(b.to_string()),
            JsonValue::Array(_) | JsonValue::Object(_) => {
                JsonValue::from(value.to_string())
            }
            JsonValue::Null => JsonValue::Null,
        },
    }
}
