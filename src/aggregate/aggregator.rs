//! Aggregation fold

use super::types::{AggregateDef, GroupKey, Reducer};
use crate::types::{JsonObject, JsonValue};
use chrono::DateTime;
use std::collections::{BTreeMap, BTreeSet};

/// Fold enhanced records into aggregate records
///
/// Records missing a grouping dimension are skipped: a record that cannot
/// be attributed to a group would otherwise pollute every metric under a
/// synthetic key. Output order follows the sorted group keys, so equal
/// inputs produce byte-identical output regardless of input order.
pub fn aggregate(records: &[JsonObject], def: &AggregateDef) -> Vec<JsonObject> {
    let mut groups: BTreeMap<Vec<String>, Vec<Accumulator>> = BTreeMap::new();

    for record in records {
        let Some(key) = group_key(record, &def.group_by) else {
            continue;
        };

        let accumulators = groups
            .entry(key)
            .or_insert_with(|| def.metrics.iter().map(|(_, r)| Accumulator::new(r)).collect());

        for (accumulator, (_, reducer)) in accumulators.iter_mut().zip(&def.metrics) {
            accumulator.fold(record, reducer);
        }
    }

    groups
        .into_iter()
        .map(|(key, accumulators)| {
            let mut out = JsonObject::new();
            for (dimension, value) in def.group_by.iter().zip(key) {
                out.insert(dimension.output().to_string(), JsonValue::from(value));
            }
            for (accumulator, (name, _)) in accumulators.iter().zip(&def.metrics) {
                out.insert((*name).to_string(), accumulator.finish());
            }
            out
        })
        .collect()
}

/// Compute the composite group key for a record, if every dimension resolves
fn group_key(record: &JsonObject, dimensions: &[GroupKey]) -> Option<Vec<String>> {
    dimensions
        .iter()
        .map(|dimension| match dimension {
            GroupKey::Field { field, .. } => key_string(record.get(*field)?),
            GroupKey::DateDay { field, .. } => {
                truncate_to_day(record.get(*field)?.as_str()?)
            }
        })
        .collect()
}

fn key_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Truncate an RFC 3339 timestamp or bare date to its calendar day
fn truncate_to_day(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    // Already a bare date
    if raw.len() == 10 && raw.as_bytes().get(4) == Some(&b'-') {
        return Some(raw.to_string());
    }
    None
}

/// Running state for one metric within one group
#[derive(Debug)]
enum Accumulator {
    Sum { total: f64, seen: bool },
    Count(u64),
    Distinct(BTreeSet<String>),
    Average { total: f64, count: u64 },
}

impl Accumulator {
    fn new(reducer: &Reducer) -> Self {
        match reducer {
            Reducer::Sum(_) => Accumulator::Sum {
                total: 0.0,
                seen: false,
            },
            Reducer::Count => Accumulator::Count(0),
            Reducer::CountDistinct(_) => Accumulator::Distinct(BTreeSet::new()),
            Reducer::Average(_) => Accumulator::Average {
                total: 0.0,
                count: 0,
            },
        }
    }

    fn fold(&mut self, record: &JsonObject, reducer: &Reducer) {
        match (self, reducer) {
            (Accumulator::Sum { total, seen }, Reducer::Sum(field)) => {
                if let Some(v) = record.get(*field).and_then(JsonValue::as_f64) {
                    *total += v;
                    *seen = true;
                }
            }
            (Accumulator::Count(count), Reducer::Count) => {
                *count += 1;
            }
            (Accumulator::Distinct(values), Reducer::CountDistinct(field)) => {
                if let Some(v) = record.get(*field).and_then(|v| key_string(v)) {
                    values.insert(v);
                }
            }
            (Accumulator::Average { total, count }, Reducer::Average(field)) => {
                if let Some(v) = record.get(*field).and_then(JsonValue::as_f64) {
                    *total += v;
                    *count += 1;
                }
            }
            _ => unreachable!("accumulator/reducer mismatch"),
        }
    }

    fn finish(&self) -> JsonValue {
        match self {
            Accumulator::Sum { total, seen } => {
                if *seen {
                    JsonValue::from(*total)
                } else {
                    JsonValue::Null
                }
            }
            Accumulator::Count(count) => JsonValue::from(*count),
            Accumulator::Distinct(values) => JsonValue::from(values.len() as u64),
            Accumulator::Average { total, count } => {
                if *count == 0 {
                    JsonValue::Null
                } else {
                    JsonValue::from(*total / *count as f64)
                }
            }
        }
    }
}
