//! Connector orchestrator implementation

use super::Connector;
use crate::aggregate;
use crate::auth::{Credentials, TokenManager};
use crate::config::{ConnectorConfig, EntityConfig};
use crate::enhance::enhance;
use crate::error::Result;
use crate::extract::{fetch_samples, EntityExtractor};
use crate::http::{ApiClient, ApiClientConfig, RateLimiterConfig};
use crate::protocol::{
    EntityOutcome, SchemaResponse, SyncRequest, SyncResponse, SyncStats, TestResponse,
};
use crate::schema::{static_schema, SchemaRegistry};
use crate::state::{EntityState, SyncState};
use crate::types::JsonObject;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The POS ingestion connector
///
/// Constructed fresh per invocation: the token manager's session and the
/// schema registry's cache die with it, so no state leaks across
/// invocations and a crash leaves nothing stale behind.
pub struct PosConnector {
    config: ConnectorConfig,
    api: ApiClient,
    tokens: TokenManager,
    registry: SchemaRegistry,
}

impl PosConnector {
    /// Create a connector from a validated configuration
    pub fn new(config: ConnectorConfig) -> Self {
        let api = ApiClient::with_config(
            ApiClientConfig::builder()
                .rate_limit(RateLimiterConfig::new(
                    config.requests_per_second,
                    config.requests_per_second,
                ))
                .build(),
        );

        let tokens = TokenManager::new(
            Credentials::new(config.client_id.clone(), config.client_secret.expose()),
            config.auth_url.clone(),
            config.base_url.clone(),
        );

        let registry = SchemaRegistry::new(config.sample_size);

        Self {
            config,
            api,
            tokens,
            registry,
        }
    }

    /// Create a connector with a custom API client (used by tests)
    pub fn with_api_client(config: ConnectorConfig, api: ApiClient) -> Self {
        let tokens = TokenManager::new(
            Credentials::new(config.client_id.clone(), config.client_secret.expose()),
            config.auth_url.clone(),
            config.base_url.clone(),
        );
        let registry = SchemaRegistry::new(config.sample_size);

        Self {
            config,
            api,
            tokens,
            registry,
        }
    }

    /// The entity configs a request targets
    ///
    /// Unknown names produce a placeholder so the response can report them
    /// as failed instead of silently skipping them.
    fn target_entities(&self, requested: &[String]) -> Vec<TargetEntity> {
        if requested.is_empty() {
            return self
                .config
                .entities
                .iter()
                .cloned()
                .map(TargetEntity::Known)
                .collect();
        }

        requested
            .iter()
            .map(|name| match self.config.entity(name) {
                Some(entity) => TargetEntity::Known(entity.clone()),
                None => TargetEntity::Unknown(name.clone()),
            })
            .collect()
    }

    /// Resolve one entity's schema, sampling the live API when needed
    async fn resolve_schema(&mut self, entity: &EntityConfig) -> Result<()> {
        if SchemaRegistry::has_static(&entity.name) {
            self.registry.resolve(&entity.name, &[])?;
            return Ok(());
        }

        let samples = fetch_samples(
            &self.api,
            &mut self.tokens,
            entity,
            self.config.sample_size,
        )
        .await?;

        self.registry.resolve(&entity.name, &samples)?;
        Ok(())
    }

    /// Run the pipeline for one entity
    ///
    /// Returns Err only for fatal (auth) errors; everything else is folded
    /// into the outcome.
    async fn sync_entity(
        &mut self,
        entity: &EntityConfig,
        input_state: &SyncState,
        deadline: &Deadline,
        stats: &mut SyncStats,
    ) -> Result<EntityOutcome> {
        if let Err(e) = self.resolve_schema(entity).await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(entity = %entity.name, error = %e, "schema resolution failed");
            return Ok(EntityOutcome::SchemaFailed {
                reason: e.to_string(),
            });
        }
        let schema = self.registry.get(&entity.name).unwrap().clone();

        let since = input_state.cursor(&entity.name).cloned();
        let mut entity_state = input_state
            .get(&entity.name)
            .cloned()
            .unwrap_or_else(EntityState::new);

        let as_of = Utc::now();
        let mut records: Vec<JsonObject> = Vec::new();
        let mut has_more = false;

        let mut extractor = EntityExtractor::new(
            &self.api,
            &mut self.tokens,
            entity,
            &schema,
            self.config.page_size,
            since,
        );

        loop {
            // Time budget is checked at page boundaries only; a page is
            // never abandoned halfway
            if deadline.exhausted() {
                warn!(entity = %entity.name, "time budget exhausted, stopping at page boundary");
                has_more = true;
                break;
            }

            match extractor.next_page().await {
                Ok(Some(page)) => {
                    stats.add_page();
                    has_more = page.has_more;

                    let enhanced = page
                        .records
                        .into_iter()
                        .map(|r| enhance(r, &entity.name, as_of));
                    records.extend(enhanced);

                    // Commit: the page's records are fully handed over, so
                    // the cursor may advance now and not before
                    if let Some(candidate) = page.cursor_candidate {
                        entity_state.advance(candidate);
                    }

                    if !has_more {
                        break;
                    }
                }
                Ok(None) => {
                    has_more = false;
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(entity = %entity.name, error = %e, "extraction failed");
                    stats.add_records(records.len());
                    return Ok(EntityOutcome::ExtractionFailed {
                        reason: e.to_string(),
                        records,
                        state: entity_state,
                    });
                }
            }
        }

        stats.add_records(records.len());
        stats.add_entity();
        info!(
            entity = %entity.name,
            records = records.len(),
            has_more,
            "entity sync complete"
        );

        Ok(EntityOutcome::Ok {
            records,
            has_more,
            state: entity_state,
        })
    }

    /// Fold a completed entity's records into its configured aggregates
    fn compute_aggregates(
        &self,
        entity: &EntityConfig,
        records: &[JsonObject],
        outcomes: &mut BTreeMap<String, EntityOutcome>,
        stats: &mut SyncStats,
    ) {
        for name in &entity.aggregates {
            let Some(def) = aggregate::definition(name) else {
                // Unreachable for validated configs
                continue;
            };

            let rows = aggregate::aggregate(records, def);
            let conformed: Vec<JsonObject> = match static_schema(name) {
                Some(schema) => rows
                    .iter()
                    .map(|row| schema.conform(&serde_json::Value::Object(row.clone())))
                    .collect(),
                None => rows,
            };

            info!(aggregate = %name, rows = conformed.len(), "aggregate computed");
            stats.add_records(conformed.len());
            stats.add_entity();

            outcomes.insert(
                name.clone(),
                EntityOutcome::Ok {
                    records: conformed,
                    has_more: false,
                    state: EntityState::new(),
                },
            );
        }
    }
}

#[async_trait]
impl Connector for PosConnector {
    async fn test(&mut self) -> TestResponse {
        match self.tokens.authenticate().await {
            Ok(token) => TestResponse::success(format!(
                "Authenticated; data API at {}",
                token.api_base_url
            )),
            Err(e) => TestResponse::failure(e.to_string()),
        }
    }

    async fn schema(&mut self, entities: &[String]) -> Result<SchemaResponse> {
        self.tokens.ensure_valid().await?;

        let mut response = SchemaResponse::new();

        for target in self.target_entities(entities) {
            let entity = match target {
                TargetEntity::Known(entity) => entity,
                TargetEntity::Unknown(name) => {
                    response.add_failure(&name, format!("entity '{name}' is not configured"));
                    continue;
                }
            };

            match self.resolve_schema(&entity).await {
                Ok(()) => {
                    let schema = self.registry.get(&entity.name).unwrap().clone();
                    response.add_schema(schema);

                    // Aggregates fed by this entity are part of its surface
                    for name in &entity.aggregates {
                        if let Some(schema) = static_schema(name) {
                            response.add_schema(schema.clone());
                        }
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => response.add_failure(&entity.name, e.to_string()),
            }
        }

        Ok(response)
    }

    async fn sync(&mut self, request: SyncRequest) -> Result<SyncResponse> {
        let started = Instant::now();
        let deadline = Deadline::new(started, self.config.time_budget_secs);

        // Nothing can proceed without a token; auth failure aborts here
        self.tokens.ensure_valid().await?;

        let mut outcomes: BTreeMap<String, EntityOutcome> = BTreeMap::new();
        let mut state = request.state.clone();
        let mut stats = SyncStats::new();

        for target in self.target_entities(&request.entities) {
            let entity = match target {
                TargetEntity::Known(entity) => entity,
                TargetEntity::Unknown(name) => {
                    stats.add_error();
                    outcomes.insert(
                        name.clone(),
                        EntityOutcome::SchemaFailed {
                            reason: format!("entity '{name}' is not configured"),
                        },
                    );
                    continue;
                }
            };

            // Entities not reached within the budget report untouched
            // cursors and has_more so the next invocation picks them up
            if deadline.exhausted() {
                outcomes.insert(
                    entity.name.clone(),
                    EntityOutcome::Ok {
                        records: Vec::new(),
                        has_more: true,
                        state: request
                            .state
                            .get(&entity.name)
                            .cloned()
                            .unwrap_or_else(EntityState::new),
                    },
                );
                continue;
            }

            let outcome = self
                .sync_entity(&entity, &request.state, &deadline, &mut stats)
                .await?;

            if !outcome.is_ok() {
                stats.add_error();
            }

            // Aggregates only fold over a complete extraction pass
            if let EntityOutcome::Ok {
                records,
                has_more: false,
                ..
            } = &outcome
            {
                self.compute_aggregates(&entity, records, &mut outcomes, &mut stats);
            }

            if let EntityOutcome::Ok { state: committed, .. }
            | EntityOutcome::ExtractionFailed {
                state: committed, ..
            } = &outcome
            {
                if let Some(cursor) = &committed.cursor {
                    state.advance(&entity.name, cursor.clone());
                }
            }

            outcomes.insert(entity.name.clone(), outcome);
        }

        stats.set_duration(started.elapsed().as_millis() as u64);

        Ok(SyncResponse {
            entities: outcomes,
            state,
            stats,
        })
    }
}

/// A requested entity, resolved against the configuration
enum TargetEntity {
    Known(EntityConfig),
    Unknown(String),
}

/// Page-boundary time budget
struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    fn new(started: Instant, budget_secs: u64) -> Self {
        Self {
            started,
            budget: Duration::from_secs(budget_secs),
        }
    }

    fn exhausted(&self) -> bool {
        !self.budget.is_zero() && self.started.elapsed() >= self.budget
    }
}
