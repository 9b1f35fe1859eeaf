//! Tests for the enhance module

use super::*;
use crate::types::JsonObject;
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn as_of() -> DateTime<Utc> {
    "2024-06-15T12:00:00Z".parse().unwrap()
}

fn obj(value: serde_json::Value) -> JsonObject {
    value.as_object().unwrap().clone()
}

#[test]
fn test_article_margin() {
    let record = obj(json!({
        "article_id": "a1",
        "description": "Widget",
        "purchase_price": 4.0,
        "retail_price": 10.0,
        "created_at": "2024-06-05T12:00:00Z"
    }));

    let enhanced = enhance(record, "article", as_of());
    assert_eq!(enhanced["profit_margin"], json!(6.0));
    assert_eq!(enhanced["profit_margin_percent"], json!(150.0));
    assert_eq!(enhanced["age_days"], json!(10));
    assert_eq!(enhanced["is_missing_description"], json!(false));
    // Originals untouched
    assert_eq!(enhanced["purchase_price"], json!(4.0));
    assert_eq!(enhanced["retail_price"], json!(10.0));
}

#[test]
fn test_article_zero_purchase_price_has_null_percent() {
    let record = obj(json!({
        "article_id": "a1",
        "purchase_price": 0.0,
        "retail_price": 10.0
    }));

    let enhanced = enhance(record, "article", as_of());
    assert_eq!(enhanced["profit_margin"], json!(10.0));
    assert_eq!(enhanced["profit_margin_percent"], json!(null));
}

#[test]
fn test_article_missing_prices_degrade_to_null() {
    let record = obj(json!({ "article_id": "a1", "retail_price": 10.0 }));

    let enhanced = enhance(record, "article", as_of());
    assert_eq!(enhanced["profit_margin"], json!(null));
    assert_eq!(enhanced["profit_margin_percent"], json!(null));
    assert_eq!(enhanced["age_days"], json!(null));
    assert_eq!(enhanced["is_missing_description"], json!(true));
}

#[test]
fn test_enhancement_is_pure() {
    let record = obj(json!({
        "article_id": "a1",
        "purchase_price": 2.0,
        "retail_price": 5.0,
        "created_at": "2024-01-01T00:00:00Z"
    }));

    let first = enhance(record.clone(), "article", as_of());
    let second = enhance(record, "article", as_of());
    assert_eq!(first, second);
}

#[test]
fn test_customer_full_address() {
    let record = obj(json!({
        "customer_id": "c1",
        "email": "c@example.com",
        "street": "Hauptstrasse",
        "house_number": "12",
        "zip_code": "10115",
        "city": "Berlin",
        "created_at": "2024-06-14T12:00:00Z"
    }));

    let enhanced = enhance(record, "customer", as_of());
    assert_eq!(
        enhanced["full_address"],
        json!("Hauptstrasse 12, 10115 Berlin")
    );
    assert_eq!(enhanced["age_days"], json!(1));
    assert_eq!(enhanced["is_missing_email"], json!(false));
}

#[test]
fn test_customer_partial_address() {
    let record = obj(json!({
        "customer_id": "c1",
        "city": "Berlin"
    }));

    let enhanced = enhance(record, "customer", as_of());
    assert_eq!(enhanced["full_address"], json!("Berlin"));
    assert_eq!(enhanced["is_missing_email"], json!(true));
}

#[test]
fn test_customer_no_address_components() {
    let record = obj(json!({ "customer_id": "c1" }));

    let enhanced = enhance(record, "customer", as_of());
    assert_eq!(enhanced["full_address"], json!(null));
}

#[test]
fn test_sale_negative_quantity_flag() {
    let record = obj(json!({
        "sale_id": "s1",
        "article_id": "a1",
        "quantity": -2
    }));

    let enhanced = enhance(record, "sale", as_of());
    assert_eq!(enhanced["is_negative_quantity"], json!(true));
    assert_eq!(enhanced["is_missing_article"], json!(false));
    // Original preserved alongside the flag
    assert_eq!(enhanced["quantity"], json!(-2));
}

#[test]
fn test_sale_missing_article_flag() {
    let record = obj(json!({ "sale_id": "s1", "quantity": 1 }));

    let enhanced = enhance(record, "sale", as_of());
    assert_eq!(enhanced["is_missing_article"], json!(true));
    assert_eq!(enhanced["is_negative_quantity"], json!(false));
}

#[test_case(0, "out_of_stock")]
#[test_case(-5, "out_of_stock")]
#[test_case(1, "low")]
#[test_case(9, "low")]
#[test_case(10, "medium")]
#[test_case(49, "medium")]
#[test_case(50, "high")]
#[test_case(10_000, "high")]
fn test_stock_level_buckets(quantity: i64, expected: &str) {
    assert_eq!(stock_level(quantity).as_str(), expected);
}

#[test]
fn test_stock_enhancement() {
    let record = obj(json!({
        "stock_id": "st1",
        "article_id": "a1",
        "warehouse_id": "w1",
        "quantity": 12
    }));

    let enhanced = enhance(record, "stock", as_of());
    assert_eq!(enhanced["stock_level"], json!("medium"));
    assert_eq!(enhanced["is_negative_quantity"], json!(false));
}

#[test]
fn test_stock_missing_quantity() {
    let record = obj(json!({ "stock_id": "st1" }));

    let enhanced = enhance(record, "stock", as_of());
    assert_eq!(enhanced["stock_level"], json!(null));
    assert_eq!(enhanced["is_negative_quantity"], json!(false));
}

#[test]
fn test_unknown_entity_passes_through() {
    let record = obj(json!({ "voucher_id": "v1", "amount": 3 }));

    let enhanced = enhance(record.clone(), "voucher", as_of());
    assert_eq!(enhanced, record);
}

#[test]
fn test_stock_level_ordering() {
    assert!(StockLevel::OutOfStock < StockLevel::Low);
    assert!(StockLevel::Low < StockLevel::Medium);
    assert!(StockLevel::Medium < StockLevel::High);
}

#[test]
fn test_age_days_accepts_bare_date() {
    let record = obj(json!({
        "article_id": "a1",
        "created_at": "2024-06-10"
    }));

    let enhanced = enhance(record, "article", as_of());
    assert_eq!(enhanced["age_days"], json!(5));
}
