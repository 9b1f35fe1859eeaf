//! Auth types
//!
//! Credentials are supplied at startup and live only for the invocation;
//! the session token is owned by the token manager and never persisted.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Seconds before nominal expiry at which a token is treated as expired
pub const EXPIRY_SKEW_SECONDS: i64 = 60;

/// API credentials for the source
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"****")
            .finish()
    }
}

/// A bearer token plus the API base URL resolved from the auth response
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// The access token
    pub access_token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Effective data API base URL for this session
    pub api_base_url: String,
}

impl SessionToken {
    /// Create a new session token
    pub fn new(
        access_token: String,
        expires_at: Option<DateTime<Utc>>,
        api_base_url: String,
    ) -> Self {
        Self {
            access_token,
            expires_at,
            api_base_url,
        }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(access_token: String, seconds: i64, api_base_url: String) -> Self {
        Self {
            access_token,
            expires_at: Some(Utc::now() + Duration::seconds(seconds)),
            api_base_url,
        }
    }

    /// Check if the token is expired (with the configured skew)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(EXPIRY_SKEW_SECONDS) >= expires_at,
            None => false, // No expiration = never expires
        }
    }
}
