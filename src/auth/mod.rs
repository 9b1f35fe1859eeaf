//! Authentication against the source API
//!
//! The token manager owns the session token for one invocation: it acquires
//! a bearer token from the OAuth-style token endpoint, tracks expiry with a
//! safety skew, and re-resolves the effective data API base URL from the
//! auth response (the source can redirect callers to a regional endpoint).

mod manager;
mod types;

pub use manager::TokenManager;
pub use types::{Credentials, SessionToken};
