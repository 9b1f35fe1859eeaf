//! Aggregate definitions

use once_cell::sync::Lazy;

/// A grouping dimension of an aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// Group by a field's value verbatim
    Field {
        /// Source field
        field: &'static str,
        /// Output column name
        output: &'static str,
    },
    /// Group by a timestamp field truncated to its calendar day
    DateDay {
        /// Source field holding a timestamp or date
        field: &'static str,
        /// Output column name
        output: &'static str,
    },
}

impl GroupKey {
    /// Output column name of this dimension
    pub fn output(&self) -> &'static str {
        match self {
            GroupKey::Field { output, .. } | GroupKey::DateDay { output, .. } => output,
        }
    }
}

/// An order-independent metric reducer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reducer {
    /// Sum of a numeric field
    Sum(&'static str),
    /// Number of grouped records
    Count,
    /// Number of distinct values of a field
    CountDistinct(&'static str),
    /// Average of a numeric field
    Average(&'static str),
}

/// Definition of one aggregate entity
#[derive(Debug, Clone)]
pub struct AggregateDef {
    /// Aggregate entity name
    pub name: &'static str,
    /// Entity whose enhanced records feed this aggregate
    pub source_entity: &'static str,
    /// Grouping dimensions (the composite primary key)
    pub group_by: Vec<GroupKey>,
    /// Output column name and reducer per metric
    pub metrics: Vec<(&'static str, Reducer)>,
}

static DEFINITIONS: Lazy<Vec<AggregateDef>> = Lazy::new(|| {
    vec![
        AggregateDef {
            name: "daily_sales",
            source_entity: "sale",
            group_by: vec![GroupKey::DateDay {
                field: "sale_date",
                output: "sale_day",
            }],
            metrics: vec![
                ("total_revenue", Reducer::Sum("total")),
                ("sale_count", Reducer::Count),
                ("distinct_articles", Reducer::CountDistinct("article_id")),
                ("avg_sale_total", Reducer::Average("total")),
            ],
        },
        AggregateDef {
            name: "article_sales",
            source_entity: "sale",
            group_by: vec![GroupKey::Field {
                field: "article_id",
                output: "article_id",
            }],
            metrics: vec![
                ("total_revenue", Reducer::Sum("total")),
                ("total_quantity", Reducer::Sum("quantity")),
                ("sale_count", Reducer::Count),
            ],
        },
        AggregateDef {
            name: "location_stock",
            source_entity: "stock",
            group_by: vec![GroupKey::Field {
                field: "warehouse_id",
                output: "warehouse_id",
            }],
            metrics: vec![
                ("total_quantity", Reducer::Sum("quantity")),
                ("distinct_articles", Reducer::CountDistinct("article_id")),
                ("avg_quantity", Reducer::Average("quantity")),
            ],
        },
    ]
});

/// Look up an aggregate definition by name
pub fn definition(name: &str) -> Option<&'static AggregateDef> {
    DEFINITIONS.iter().find(|d| d.name == name)
}

/// All aggregate definitions fed by an entity
pub fn definitions_for_source(entity: &str) -> Vec<&'static AggregateDef> {
    DEFINITIONS
        .iter()
        .filter(|d| d.source_entity == entity)
        .collect()
}
