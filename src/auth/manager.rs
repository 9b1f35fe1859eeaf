//! Token manager implementation
//!
//! Acquires and refreshes bearer tokens against the source's token endpoint.
//! The auth response may carry a `server_url` redirecting the caller to a
//! regional data endpoint; the manager re-resolves it on every
//! authentication so all subsequent entity requests land on the right host.

use super::types::{Credentials, SessionToken};
use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Token manager for one connector invocation
///
/// Constructed fresh per invocation; never a global. Holds the current
/// session token in memory only.
pub struct TokenManager {
    credentials: Credentials,
    auth_url: String,
    fallback_base_url: String,
    http_client: Client,
    token: Option<SessionToken>,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(
        credentials: Credentials,
        auth_url: impl Into<String>,
        fallback_base_url: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            auth_url: auth_url.into(),
            fallback_base_url: fallback_base_url.into(),
            http_client: Client::new(),
            token: None,
        }
    }

    /// Create a token manager with a custom HTTP client
    pub fn with_client(
        credentials: Credentials,
        auth_url: impl Into<String>,
        fallback_base_url: impl Into<String>,
        http_client: Client,
    ) -> Self {
        Self {
            credentials,
            auth_url: auth_url.into(),
            fallback_base_url: fallback_base_url.into(),
            http_client,
            token: None,
        }
    }

    /// Authenticate against the token endpoint, replacing any cached token
    pub async fn authenticate(&mut self) -> Result<&SessionToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.auth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::auth(format!("Auth endpoint unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Malformed token response: {e}")))?;

        let base_url = token_response
            .server_url
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.fallback_base_url.clone());

        debug!(base_url = %base_url, "authenticated against source API");

        self.token = Some(token_response.into_session_token(base_url));
        Ok(self.token.as_ref().unwrap())
    }

    /// Get a valid session token, re-authenticating if expired or absent
    pub async fn ensure_valid(&mut self) -> Result<&SessionToken> {
        let needs_refresh = match &self.token {
            Some(token) => token.is_expired(),
            None => true,
        };

        if needs_refresh {
            if self.token.is_some() {
                warn!("session token expired, re-authenticating");
            }
            self.authenticate().await?;
        }

        Ok(self.token.as_ref().unwrap())
    }

    /// Drop the cached token, forcing re-authentication on next use
    ///
    /// Called by the extractor after a 401 from the data API.
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    /// The effective API base URL for the current session, if authenticated
    pub fn api_base_url(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.api_base_url.as_str())
    }

    /// Whether a (possibly expired) token is currently held
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("auth_url", &self.auth_url)
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Regional data endpoint for this account, if the source redirects
    #[serde(default)]
    server_url: Option<String>,
}

impl TokenResponse {
    fn into_session_token(self, api_base_url: String) -> SessionToken {
        match self.expires_in {
            Some(secs) => SessionToken::expires_in(self.access_token, secs, api_base_url),
            None => SessionToken::new(self.access_token, None, api_base_url),
        }
    }
}
