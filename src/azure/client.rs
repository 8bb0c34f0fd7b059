//! ARM Client
//!
//! Main client for interacting with Azure Resource Manager, combining
//! authentication and HTTP functionality.

use super::auth::ArmCredentials;
use super::http::{ApiError, ArmHttpClient};
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Public-cloud Resource Manager endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Main ARM client
#[derive(Clone, Debug)]
pub struct ArmClient {
    pub credentials: ArmCredentials,
    pub http: ArmHttpClient,
    pub subscription_id: String,
    endpoint: String,
}

impl ArmClient {
    /// Create a new ARM client
    ///
    /// The endpoint must be an absolute http(s) URL; plain http is only
    /// accepted for loopback hosts.
    pub fn new(credentials: ArmCredentials, subscription_id: &str, endpoint: &str) -> Result<Self> {
        let parsed = Url::parse(endpoint).context("Invalid Resource Manager endpoint")?;
        match (parsed.scheme(), parsed.host_str()) {
            ("https", Some(_)) => {}
            ("http", Some("localhost" | "127.0.0.1")) => {}
            (scheme, host) => {
                return Err(anyhow::anyhow!(
                    "Refusing Resource Manager endpoint {}://{}: use https",
                    scheme,
                    host.unwrap_or("")
                ))
            }
        }

        if subscription_id.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "No subscription configured. Set ARM_SUBSCRIPTION_ID or use --subscription"
            ));
        }

        let http = ArmHttpClient::new().context("Failed to create HTTP client")?;

        Ok(Self {
            credentials,
            http,
            subscription_id: subscription_id.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn token(&self) -> Result<String, ApiError> {
        self.credentials
            .get_token()
            .await
            .map_err(|e| ApiError::Auth(format!("{:#}", e)))
    }

    /// Make a GET request to ARM
    pub async fn get(&self, url: &str) -> Result<Value, ApiError> {
        let token = self.token().await?;
        self.http.get(url, &token).await
    }

    /// Make a PUT request to ARM
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        let token = self.token().await?;
        self.http.put(url, &token, body).await
    }

    /// Make a DELETE request to ARM
    pub async fn delete(&self, url: &str) -> Result<Option<Value>, ApiError> {
        let token = self.token().await?;
        self.http.delete(url, &token).await
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build a resource-group scoped provider URL
    ///
    /// `path` is a list of (collection, name) pairs under the provider
    /// namespace, e.g. `[("workspaces", "ws1"), ("linkedServices", "automation")]`.
    pub fn provider_url(
        &self,
        resource_group: &str,
        provider: &str,
        path: &[(&str, &str)],
        api_version: &str,
    ) -> String {
        let mut url = format!(
            "{}/subscriptions/{}/resourcegroups/{}/providers/{}",
            self.endpoint,
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(resource_group),
            provider
        );
        for (collection, name) in path {
            url.push('/');
            url.push_str(collection);
            url.push('/');
            url.push_str(&urlencoding::encode(name));
        }
        url.push_str("?api-version=");
        url.push_str(api_version);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> Result<ArmClient> {
        ArmClient::new(ArmCredentials::from_token("t")?, "00000000-0000-0000-0000-000000000000", endpoint)
    }

    #[test]
    fn test_provider_url_layout() {
        let client = client("https://management.azure.com/").unwrap();
        let url = client.provider_url(
            "rg1",
            "Microsoft.OperationalInsights",
            &[("workspaces", "ws1"), ("linkedServices", "automation")],
            "2015-11-01-preview",
        );
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/00000000-0000-0000-0000-000000000000\
             /resourcegroups/rg1/providers/Microsoft.OperationalInsights/workspaces/ws1\
             /linkedServices/automation?api-version=2015-11-01-preview"
        );
    }

    #[test]
    fn test_provider_url_encodes_segments() {
        let client = client(DEFAULT_ENDPOINT).unwrap();
        let url = client.provider_url("rg (prod)", "P", &[("things", "a/b")], "1");
        assert!(url.contains("/resourcegroups/rg%20%28prod%29/"));
        assert!(url.contains("/things/a%2Fb?"));
    }

    #[test]
    fn test_rejects_plain_http_for_remote_hosts() {
        assert!(client("http://management.azure.com").is_err());
        assert!(client("http://127.0.0.1:8080").is_ok());
        assert!(client("not a url").is_err());
    }

    #[test]
    fn test_requires_subscription() {
        let creds = ArmCredentials::from_token("t").unwrap();
        assert!(ArmClient::new(creds, " ", DEFAULT_ENDPOINT).is_err());
    }
}
