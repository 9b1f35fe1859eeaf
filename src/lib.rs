// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # posbridge
//!
//! Incremental ingestion connector for retail point-of-sale data.
//!
//! posbridge pulls entities (articles, customers, sales, shops, stock) from
//! a third-party POS API and hands them, enriched and typed, to an external
//! sync orchestrator through a fixed three-operation protocol:
//!
//! - `test` validates credentials against the source's token endpoint
//! - `schema` resolves one validated schema per entity (static definitions
//!   first, type inference from live samples otherwise)
//! - `sync` extracts pages incrementally against a per-entity cursor,
//!   enhances records with derived fields, folds configured aggregates, and
//!   returns records plus the updated cursor map
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Connector Protocol                          │
//! │   test() → TestResponse      schema() → SchemaResponse          │
//! │   sync(state) → records + updated cursor map                    │
//! └───────────────────────────────┬─────────────────────────────────┘
//! ┌──────────┬───────────┬────────┴──────┬───────────┬─────────────┐
//! │   Auth   │  Extract  │    Schema     │  Enhance  │  Aggregate  │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ OAuth    │ Paginate  │ Static defs   │ Margins   │ Group keys  │
//! │ Refresh  │ Since     │ Inference     │ Addresses │ Reducers    │
//! │ Base URL │ Retry     │ Conformance   │ Buckets   │ Full fold   │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```
//!
//! Every invocation is stateless: credentials, session token, and schema
//! cache live only for the invocation, and the sole cross-invocation
//! artifact - the cursor map - is owned and persisted by the external
//! orchestrator.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connector
pub mod error;

/// Common types and type aliases
pub mod types;

/// Connector configuration
pub mod config;

/// Token manager for source API authentication
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Entity schemas: static definitions, inference, conformance
pub mod schema;

/// Incremental paginated extraction
pub mod extract;

/// Derived-field enhancement
pub mod enhance;

/// Summary aggregates
pub mod aggregate;

/// Cursor and bookmark state
pub mod state;

/// Protocol payloads for the external orchestrator
pub mod protocol;

/// Sync orchestration (test / schema / sync)
pub mod sync;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::ConnectorConfig;
pub use error::{Error, Result};
pub use protocol::{SchemaResponse, SyncRequest, SyncResponse, TestResponse};
pub use sync::{Connector, PosConnector};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
