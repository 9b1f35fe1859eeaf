//! Incremental entity extraction
//!
//! One extractor pulls one entity, page by page, from the source data API.
//! A page is the atomic retry unit: transient failures are retried by the
//! HTTP client, a 401 triggers exactly one transparent re-authentication,
//! and nothing about a page is committed until the whole page has been
//! handed to the caller.

mod extractor;
mod types;

pub use extractor::{fetch_samples, EntityExtractor};
pub use types::Page;
