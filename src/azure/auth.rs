//! Azure Authentication
//!
//! Handles bearer-token acquisition for the Resource Manager API, either from
//! a pre-issued access token or via the Azure AD client-credentials flow.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default Azure AD authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;

/// Lifetime assumed for a static token we know nothing about
const STATIC_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Where tokens come from
#[derive(Clone)]
pub enum TokenSource {
    /// A token issued out of band (e.g. `az account get-access-token`)
    Static(String),
    /// Service principal with a client secret
    ClientSecret {
        authority: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Security: never print secrets
        match self {
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::ClientSecret {
                tenant_id, client_id, ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Azure AD token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    /// `expires_in` is a number on v2.0 endpoints and a string on v1.0
    fn expires_in_secs(&self) -> Option<i64> {
        match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// ARM credentials holder with token caching
#[derive(Clone, Debug)]
pub struct ArmCredentials {
    source: TokenSource,
    /// Resource Manager endpoint the token is scoped to
    scope: String,
    http: Client,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone, Debug)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

impl ArmCredentials {
    /// Create credentials for the given source, scoped to `endpoint`
    pub fn new(source: TokenSource, endpoint: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(super::http::USER_AGENT)
            .build()
            .context("Failed to create HTTP client for token requests")?;

        Ok(Self {
            source,
            scope: format!("{}/.default", endpoint.trim_end_matches('/')),
            http,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Convenience constructor for a pre-issued token
    pub fn from_token(token: impl Into<String>) -> Result<Self> {
        Self::new(TokenSource::Static(token.into()), super::client::DEFAULT_ENDPOINT)
    }

    /// Get an access token for API calls
    /// Security: Checks token expiry before returning cached token
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let (token, ttl) = match &self.source {
            TokenSource::Static(token) => (token.clone(), Duration::hours(STATIC_TOKEN_TTL_HOURS)),
            TokenSource::ClientSecret {
                authority,
                tenant_id,
                client_id,
                client_secret,
            } => {
                self.request_client_credentials(authority, tenant_id, client_id, client_secret)
                    .await?
            }
        };

        let expires_at = Utc::now() + ttl - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }

        tracing::debug!("New token cached, expires at {}", expires_at.to_rfc3339());

        Ok(token)
    }

    async fn request_client_credentials(
        &self,
        authority: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(String, Duration)> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority.trim_end_matches('/'),
            urlencoding::encode(tenant_id)
        );
        tracing::debug!("Requesting token for client {} from {}", client_id, url);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .context("Failed to send token request")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Azure AD token request failed: {}. Check ARM_TENANT_ID, ARM_CLIENT_ID and ARM_CLIENT_SECRET",
                status
            ));
        }

        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        // Default to a conservative hour when the endpoint omits expiry
        let ttl = Duration::seconds(body.expires_in_secs().unwrap_or(3600));
        Ok((body.access_token, ttl))
    }
}
