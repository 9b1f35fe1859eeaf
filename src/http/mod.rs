//! HTTP client with retry and rate limiting
//!
//! All traffic to the source's data API goes through [`ApiClient`]: bounded
//! retries with backoff for transient failures, Retry-After handling for
//! 429s, and a local token-bucket rate limit. 401 responses are never
//! retried here; the extractor owns re-authentication.

mod client;
mod rate_limit;

pub use client::{ApiClient, ApiClientConfig, ApiClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
