//! Schema inference from sample records
//!
//! Inference folds sample records into a column-to-type map. Each column's
//! final type is the loosest type observed across samples (boolean <
//! integer < float < string); a column that is null in every sample falls
//! back to string. Re-inferring from the same samples always yields the
//! same map.

use super::types::ColumnType;
use crate::types::JsonValue;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Default number of sample records used for inference
pub const DEFAULT_SAMPLE_SIZE: usize = 50;

/// Infer a column type map from sample records
///
/// Only the first `sample_size` records are examined. Non-object samples
/// are skipped.
pub fn infer_columns(samples: &[JsonValue], sample_size: usize) -> BTreeMap<String, ColumnType> {
    let mut observed: BTreeMap<String, Option<ColumnType>> = BTreeMap::new();

    for record in samples.iter().take(sample_size) {
        let Some(map) = record.as_object() else {
            continue;
        };

        for (key, value) in map {
            let ty = ColumnType::of_value(value);
            let entry = observed.entry(key.clone()).or_insert(None);
            *entry = match (*entry, ty) {
                (Some(a), Some(b)) => Some(a.merge_with(b)),
                (Some(a), None) => Some(a),
                (None, b) => b,
            };
        }
    }

    observed
        .into_iter()
        .map(|(key, ty)| (key, ty.unwrap_or(ColumnType::String)))
        .collect()
}

/// Detect the primary key for an inferred schema
///
/// `<entity>_id` is preferred over a bare `id`; POS payloads commonly carry
/// both and `id` is the less stable of the two.
pub fn detect_primary_key(
    entity: &str,
    columns: &BTreeMap<String, ColumnType>,
) -> Option<String> {
    let entity_key = format!("{entity}_id");
    if columns.contains_key(&entity_key) {
        return Some(entity_key);
    }
    if columns.contains_key("id") {
        return Some("id".to_string());
    }
    None
}

/// Check whether a string value looks like an ISO 8601 timestamp
///
/// Used by the extractor to pick cursor candidates out of records.
pub fn is_timestamp(s: &str) -> bool {
    static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
        vec![
            Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap(),
            Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").unwrap(),
        ]
    });

    PATTERNS.iter().any(|re| re.is_match(s))
}
