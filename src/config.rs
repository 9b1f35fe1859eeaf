//! Connector configuration
//!
//! All runtime knobs are injected from outside: API credentials, the auth
//! endpoint, the fallback data API base URL, page size, the per-invocation
//! time budget, and the entity definitions with their aggregate mapping.
//! Nothing here is hard-coded into the pipeline; the config is validated
//! once at startup and treated as immutable afterwards.

use crate::aggregate;
use crate::error::{Error, Result};
use crate::schema::DEFAULT_SAMPLE_SIZE;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

// ============================================================================
// Entity Config
// ============================================================================

/// Definition of one entity to sync
#[derive(Debug, Clone, Deserialize)]
pub struct EntityConfig {
    /// Entity name (e.g., "article")
    pub name: String,

    /// Endpoint path on the data API
    pub endpoint: String,

    /// Record field carrying the modification timestamp
    #[serde(default = "default_cursor_field")]
    pub cursor_field: String,

    /// Query parameter used for the incremental filter
    #[serde(default = "default_cursor_param")]
    pub cursor_param: String,

    /// Aggregate entities fed by this entity's records
    #[serde(default)]
    pub aggregates: Vec<String>,
}

fn default_cursor_field() -> String {
    "updated_at".to_string()
}

fn default_cursor_param() -> String {
    "since".to_string()
}

impl EntityConfig {
    /// Create an entity config with defaults
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            cursor_field: default_cursor_field(),
            cursor_param: default_cursor_param(),
            aggregates: Vec::new(),
        }
    }

    /// Attach aggregate entities fed by this entity
    #[must_use]
    pub fn with_aggregates(mut self, aggregates: &[&str]) -> Self {
        self.aggregates = aggregates.iter().map(ToString::to_string).collect();
        self
    }
}

/// The built-in POS entity set
pub fn built_in_entities() -> Vec<EntityConfig> {
    vec![
        EntityConfig::new("article", "/api/v1/articles"),
        EntityConfig::new("customer", "/api/v1/customers"),
        EntityConfig::new("sale", "/api/v1/sales")
            .with_aggregates(&["daily_sales", "article_sales"]),
        EntityConfig::new("shop", "/api/v1/shops"),
        EntityConfig::new("stock", "/api/v1/stocks").with_aggregates(&["location_stock"]),
    ]
}

// ============================================================================
// Connector Config
// ============================================================================

/// Complete connector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: Secret,

    /// Token endpoint URL
    pub auth_url: String,

    /// Fallback data API base URL, used when the auth response carries no
    /// server redirect
    pub base_url: String,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Wall-clock budget for one sync invocation, in seconds (0 = unbounded)
    #[serde(default = "default_time_budget")]
    pub time_budget_secs: u64,

    /// Sample records used for schema inference
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Local rate limit against the source API, requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Entities to sync (defaults to the built-in POS set)
    #[serde(default = "built_in_entities")]
    pub entities: Vec<EntityConfig>,
}

fn default_page_size() -> usize {
    100
}

fn default_time_budget() -> u64 {
    540
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

fn default_requests_per_second() -> u32 {
    10
}

impl ConnectorConfig {
    /// Load from a YAML or JSON file, validating on the way in
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Build from an inline JSON payload, validating on the way in
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::missing_field("client_id"));
        }
        if self.client_secret.0.is_empty() {
            return Err(Error::missing_field("client_secret"));
        }

        Url::parse(&self.auth_url).map_err(|e| Error::InvalidConfigValue {
            field: "auth_url".to_string(),
            message: e.to_string(),
        })?;
        Url::parse(&self.base_url).map_err(|e| Error::InvalidConfigValue {
            field: "base_url".to_string(),
            message: e.to_string(),
        })?;

        if self.page_size == 0 {
            return Err(Error::InvalidConfigValue {
                field: "page_size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.sample_size == 0 {
            return Err(Error::InvalidConfigValue {
                field: "sample_size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entity in &self.entities {
            if entity.name.is_empty() {
                return Err(Error::missing_field("entities[].name"));
            }
            if !entity.endpoint.starts_with('/') {
                return Err(Error::InvalidConfigValue {
                    field: format!("entities.{}.endpoint", entity.name),
                    message: "must start with '/'".to_string(),
                });
            }
            if !seen.insert(entity.name.clone()) {
                return Err(Error::InvalidConfigValue {
                    field: "entities".to_string(),
                    message: format!("duplicate entity '{}'", entity.name),
                });
            }
            for aggregate_name in &entity.aggregates {
                let def = aggregate::definition(aggregate_name).ok_or_else(|| {
                    Error::InvalidConfigValue {
                        field: format!("entities.{}.aggregates", entity.name),
                        message: format!("unknown aggregate '{aggregate_name}'"),
                    }
                })?;
                if def.source_entity != entity.name {
                    return Err(Error::InvalidConfigValue {
                        field: format!("entities.{}.aggregates", entity.name),
                        message: format!(
                            "aggregate '{aggregate_name}' is fed by '{}', not '{}'",
                            def.source_entity, entity.name
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Find an entity definition by name
    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.name == name)
    }
}

// ============================================================================
// Secret
// ============================================================================

/// A string that never appears in Debug output or logs
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secret(pub String);

impl Secret {
    /// The underlying value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Secret(value.to_string())
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(****)")
    }
}
