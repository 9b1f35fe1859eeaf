//! Sync orchestration
//!
//! The orchestrator implements the three operations the external
//! orchestrator invokes: `test` (authenticate only), `schema` (resolve all
//! schemas), and `sync` (the full extract/enhance/aggregate pipeline).
//!
//! Entities are processed sequentially and independently: one entity's
//! schema or extraction failure is captured into its outcome without
//! touching its siblings. Only an authentication failure aborts the whole
//! invocation, since nothing can proceed without a token. Elapsed time is
//! checked at page boundaries, never mid-page, so the committed cursor in
//! the response always reflects fully-handed-over pages.

mod orchestrator;

pub use orchestrator::PosConnector;

use crate::error::Result;
use crate::protocol::{SchemaResponse, SyncRequest, SyncResponse, TestResponse};
use async_trait::async_trait;

/// The three-operation protocol expected by the external orchestrator
#[async_trait]
pub trait Connector: Send {
    /// Validate credentials; never touches extraction
    async fn test(&mut self) -> TestResponse;

    /// Resolve schemas for the requested entities (empty = all configured)
    ///
    /// Errs only on authentication failure; per-entity resolution failures
    /// are reported inside the response.
    async fn schema(&mut self, entities: &[String]) -> Result<SchemaResponse>;

    /// Run the extraction pipeline for the requested entities
    ///
    /// Errs only on authentication failure; per-entity errors are captured
    /// in the response.
    async fn sync(&mut self, request: SyncRequest) -> Result<SyncResponse>;
}

#[cfg(test)]
mod tests;
