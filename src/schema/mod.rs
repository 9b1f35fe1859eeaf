//! Entity schemas: static definitions, inference, and conformance
//!
//! Every entity synced by the connector has exactly one resolved schema per
//! invocation. Static definitions for the known POS entities take strict
//! precedence; anything else is inferred from sample records. Records are
//! conformed to the resolved schema before they leave the extractor:
//! undeclared columns are dropped, declared columns are coerced.

mod inference;
mod registry;
mod statics;
mod types;

pub use inference::{infer_columns, is_timestamp, DEFAULT_SAMPLE_SIZE};
pub use registry::SchemaRegistry;
pub use statics::{static_entity_names, static_schema};
pub use types::{ColumnType, EntitySchema, SchemaSource};
