//! Extraction types

use crate::state::CursorValue;
use crate::types::JsonObject;

/// One page of conformed raw records
#[derive(Debug, Clone)]
pub struct Page {
    /// Records in source order, conformed to the entity schema
    pub records: Vec<JsonObject>,

    /// 1-based page number within this extraction
    pub number: u32,

    /// Cursor value this page advances to once committed
    ///
    /// The max modification timestamp observed in the page, or the running
    /// record offset when the entity has no usable timestamp column.
    pub cursor_candidate: Option<CursorValue>,

    /// Whether the source may have more pages after this one
    pub has_more: bool,
}

impl Page {
    /// Number of records in this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
