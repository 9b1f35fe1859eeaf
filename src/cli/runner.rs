//! CLI runner
//!
//! Builds the connector from the supplied configuration, dispatches the
//! requested operation, and prints the protocol response as JSON.

use super::commands::{Cli, Commands};
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::protocol::SyncRequest;
use crate::state::SyncState;
use crate::sync::{Connector, PosConnector};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Executes CLI commands
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the requested command
    pub async fn run(self) -> Result<()> {
        let config = self.load_config()?;
        let pretty = self.cli.pretty;

        match self.cli.command {
            Commands::Test => {
                let mut connector = PosConnector::new(config);
                let response = connector.test().await;
                print_json(&response, pretty)?;
                if !response.success {
                    return Err(Error::auth(response.message));
                }
            }

            Commands::Schema { entities } => {
                let mut connector = PosConnector::new(config);
                let response = connector.schema(&split_entities(entities)).await?;
                print_json(&response, pretty)?;
            }

            Commands::Sync {
                entities,
                state,
                state_json,
            } => {
                let state = load_state(state, state_json)?;
                info!(
                    entities = ?split_entities(entities.clone()),
                    "starting sync invocation"
                );

                let mut connector = PosConnector::new(config);
                let response = connector
                    .sync(SyncRequest {
                        entities: split_entities(entities),
                        state,
                    })
                    .await?;
                print_json(&response, pretty)?;
            }

            Commands::Entities => {
                let listing: Vec<_> = config
                    .entities
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "name": e.name,
                            "endpoint": e.endpoint,
                            "cursor_field": e.cursor_field,
                            "aggregates": e.aggregates,
                        })
                    })
                    .collect();
                print_json(&listing, pretty)?;
            }
        }

        Ok(())
    }

    /// Load the connector configuration from inline JSON or a file
    fn load_config(&self) -> Result<ConnectorConfig> {
        if let Some(json) = &self.cli.config_json {
            let value: serde_json::Value = serde_json::from_str(json)?;
            return ConnectorConfig::from_json_value(&value);
        }

        match &self.cli.config {
            Some(path) => ConnectorConfig::from_file(path),
            None => Err(Error::config(
                "no configuration supplied; pass --config or --config-json",
            )),
        }
    }
}

/// Parse a comma-separated entity list
fn split_entities(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Load cursor state from inline JSON or a file; absent means initial sync
fn load_state(path: Option<PathBuf>, inline: Option<String>) -> Result<SyncState> {
    if let Some(json) = inline {
        return Ok(serde_json::from_str(&json)?);
    }

    match path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&content)?)
        }
        Some(_) | None => Ok(SyncState::new()),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
