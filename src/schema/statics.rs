//! Static schema definitions for the known POS entities
//!
//! Derived columns produced by the enhancer and the aggregate entities are
//! declared here too, so conformance and the `schema` operation cover the
//! full emitted shape, not just what the source returns.

use super::types::{ColumnType, EntitySchema};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use ColumnType::{Boolean, Float, Integer, String as Text};

static STATIC_SCHEMAS: Lazy<HashMap<&'static str, EntitySchema>> = Lazy::new(|| {
    let mut schemas = HashMap::new();

    schemas.insert(
        "article",
        EntitySchema::new_static(
            "article",
            &["article_id"],
            &[
                ("article_id", Text),
                ("article_number", Text),
                ("description", Text),
                ("purchase_price", Float),
                ("retail_price", Float),
                ("supplier_id", Text),
                ("created_at", Text),
                ("updated_at", Text),
                // Derived
                ("profit_margin", Float),
                ("profit_margin_percent", Float),
                ("age_days", Integer),
                ("is_missing_description", Boolean),
            ],
        ),
    );

    schemas.insert(
        "customer",
        EntitySchema::new_static(
            "customer",
            &["customer_id"],
            &[
                ("customer_id", Text),
                ("first_name", Text),
                ("last_name", Text),
                ("email", Text),
                ("street", Text),
                ("house_number", Text),
                ("zip_code", Text),
                ("city", Text),
                ("created_at", Text),
                ("updated_at", Text),
                // Derived
                ("full_address", Text),
                ("age_days", Integer),
                ("is_missing_email", Boolean),
            ],
        ),
    );

    schemas.insert(
        "sale",
        EntitySchema::new_static(
            "sale",
            &["sale_id"],
            &[
                ("sale_id", Text),
                ("shop_id", Text),
                ("customer_id", Text),
                ("article_id", Text),
                ("quantity", Integer),
                ("unit_price", Float),
                ("total", Float),
                ("sale_date", Text),
                ("updated_at", Text),
                // Derived
                ("is_negative_quantity", Boolean),
                ("is_missing_article", Boolean),
            ],
        ),
    );

    schemas.insert(
        "shop",
        EntitySchema::new_static(
            "shop",
            &["shop_id"],
            &[
                ("shop_id", Text),
                ("name", Text),
                ("city", Text),
                ("created_at", Text),
                ("updated_at", Text),
            ],
        ),
    );

    schemas.insert(
        "stock",
        EntitySchema::new_static(
            "stock",
            &["stock_id"],
            &[
                ("stock_id", Text),
                ("article_id", Text),
                ("warehouse_id", Text),
                ("quantity", Integer),
                ("updated_at", Text),
                // Derived
                ("stock_level", Text),
                ("is_negative_quantity", Boolean),
            ],
        ),
    );

    // Aggregate entities: recomputed in full every invocation, so they are
    // full refresh and downstream must overwrite rather than merge.
    schemas.insert(
        "daily_sales",
        EntitySchema::new_static(
            "daily_sales",
            &["sale_day"],
            &[
                ("sale_day", Text),
                ("total_revenue", Float),
                ("sale_count", Integer),
                ("distinct_articles", Integer),
                ("avg_sale_total", Float),
            ],
        )
        .full_refresh(),
    );

    schemas.insert(
        "article_sales",
        EntitySchema::new_static(
            "article_sales",
            &["article_id"],
            &[
                ("article_id", Text),
                ("total_revenue", Float),
                ("total_quantity", Integer),
                ("sale_count", Integer),
            ],
        )
        .full_refresh(),
    );

    schemas.insert(
        "location_stock",
        EntitySchema::new_static(
            "location_stock",
            &["warehouse_id"],
            &[
                ("warehouse_id", Text),
                ("total_quantity", Integer),
                ("distinct_articles", Integer),
                ("avg_quantity", Float),
            ],
        )
        .full_refresh(),
    );

    schemas
});

/// Look up the predefined schema for an entity, if one exists
pub fn static_schema(entity: &str) -> Option<&'static EntitySchema> {
    STATIC_SCHEMAS.get(entity)
}

/// Names of all entities with a predefined schema
pub fn static_entity_names() -> Vec<&'static str> {
    let mut names: Vec<_> = STATIC_SCHEMAS.keys().copied().collect();
    names.sort_unstable();
    names
}
