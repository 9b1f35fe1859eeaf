//! Enhancer implementation

use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Stock level classification, ordered from empty to plentiful
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    Low,
    Medium,
    High,
}

impl StockLevel {
    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            StockLevel::OutOfStock => "out_of_stock",
            StockLevel::Low => "low",
            StockLevel::Medium => "medium",
            StockLevel::High => "high",
        }
    }
}

/// Classify a quantity into a stock level bucket
///
/// Negative quantities classify as out of stock; the negative value itself
/// is surfaced through the `is_negative_quantity` flag, not hidden.
pub fn stock_level(quantity: i64) -> StockLevel {
    match quantity {
        q if q <= 0 => StockLevel::OutOfStock,
        1..=9 => StockLevel::Low,
        10..=49 => StockLevel::Medium,
        _ => StockLevel::High,
    }
}

/// Enhance a conformed record with the derived fields for its entity
///
/// `as_of` anchors age calculations so the output is reproducible. Records
/// for entities without entity-specific derivations pass through untouched.
pub fn enhance(record: JsonObject, entity: &str, as_of: DateTime<Utc>) -> JsonObject {
    match entity {
        "article" => enhance_article(record, as_of),
        "customer" => enhance_customer(record, as_of),
        "sale" => enhance_sale(record),
        "stock" => enhance_stock(record),
        _ => record,
    }
}

fn enhance_article(mut record: JsonObject, as_of: DateTime<Utc>) -> JsonObject {
    let purchase = number(&record, "purchase_price");
    let retail = number(&record, "retail_price");

    let margin = match (retail, purchase) {
        (Some(r), Some(p)) => Some(r - p),
        _ => None,
    };
    let margin_percent = match (margin, retail, purchase) {
        // Division-by-zero guard: a free purchase has no meaningful ratio
        (Some(_), Some(_), Some(p)) if p == 0.0 => None,
        (Some(m), Some(_), Some(p)) => Some(m / p * 100.0),
        _ => None,
    };

    record.insert("profit_margin".into(), float_or_null(margin));
    record.insert("profit_margin_percent".into(), float_or_null(margin_percent));
    record.insert(
        "age_days".into(),
        age_days(&record, "created_at", as_of),
    );
    record.insert(
        "is_missing_description".into(),
        JsonValue::Bool(is_blank(&record, "description")),
    );
    record
}

fn enhance_customer(mut record: JsonObject, as_of: DateTime<Utc>) -> JsonObject {
    let address = compose_address(&record);
    record.insert(
        "full_address".into(),
        address.map_or(JsonValue::Null, JsonValue::from),
    );
    record.insert(
        "age_days".into(),
        age_days(&record, "created_at", as_of),
    );
    record.insert(
        "is_missing_email".into(),
        JsonValue::Bool(is_blank(&record, "email")),
    );
    record
}

fn enhance_sale(mut record: JsonObject) -> JsonObject {
    let negative = integer(&record, "quantity").is_some_and(|q| q < 0);
    record.insert("is_negative_quantity".into(), JsonValue::Bool(negative));
    record.insert(
        "is_missing_article".into(),
        JsonValue::Bool(is_blank(&record, "article_id")),
    );
    record
}

fn enhance_stock(mut record: JsonObject) -> JsonObject {
    let quantity = integer(&record, "quantity");

    let level = quantity
        .map(stock_level)
        .map_or(JsonValue::Null, |l| JsonValue::from(l.as_str()));
    record.insert("stock_level".into(), level);
    record.insert(
        "is_negative_quantity".into(),
        JsonValue::Bool(quantity.is_some_and(|q| q < 0)),
    );
    record
}

// ============================================================================
// Field helpers
// ============================================================================

fn number(record: &JsonObject, field: &str) -> Option<f64> {
    record.get(field)?.as_f64()
}

fn integer(record: &JsonObject, field: &str) -> Option<i64> {
    record.get(field)?.as_i64()
}

fn string<'a>(record: &'a JsonObject, field: &str) -> Option<&'a str> {
    record.get(field)?.as_str()
}

fn is_blank(record: &JsonObject, field: &str) -> bool {
    string(record, field).map_or(true, |s| s.trim().is_empty())
}

fn float_or_null(value: Option<f64>) -> JsonValue {
    value.map_or(JsonValue::Null, JsonValue::from)
}

/// Days between a timestamp field and the as-of instant
///
/// Accepts RFC 3339 timestamps or bare dates; anything else yields null.
fn age_days(record: &JsonObject, field: &str, as_of: DateTime<Utc>) -> JsonValue {
    let Some(raw) = string(record, field) else {
        return JsonValue::Null;
    };

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
        });

    match parsed {
        Ok(when) => JsonValue::from((as_of - when).num_days()),
        Err(_) => JsonValue::Null,
    }
}

/// Compose a single address line from the component fields
///
/// Returns None when every component is absent; partial addresses keep
/// whatever components exist.
fn compose_address(record: &JsonObject) -> Option<String> {
    let street = string(record, "street").unwrap_or("").trim();
    let house = string(record, "house_number").unwrap_or("").trim();
    let zip = string(record, "zip_code").unwrap_or("").trim();
    let city = string(record, "city").unwrap_or("").trim();

    let line1 = [street, house]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let line2 = [zip, city]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let full = [line1, line2]
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    if full.is_empty() {
        None
    } else {
        Some(full)
    }
}
