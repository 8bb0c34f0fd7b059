//! Configuration Management
//!
//! Provider settings come from `<config dir>/lals/config.json`, overridden by
//! `ARM_*` environment variables, overridden by command-line flags.

use crate::azure::auth::{TokenSource, DEFAULT_AUTHORITY};
use crate::azure::client::DEFAULT_ENDPOINT;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted provider configuration
///
/// Secrets are never read from or written to this file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Resource Manager endpoint (sovereign clouds, test servers)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Refuse to adopt existing remote objects on create
    #[serde(default)]
    pub strict_import: Option<bool>,
}

/// Environment lookup, swappable in tests
pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lals").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective subscription (env > config)
    pub fn effective_subscription(&self, env: &dyn Env) -> Option<String> {
        env.var("ARM_SUBSCRIPTION_ID")
            .or_else(|| self.subscription_id.clone())
    }

    /// Get effective endpoint (env > config > public cloud)
    pub fn effective_endpoint(&self, env: &dyn Env) -> String {
        env.var("ARM_ENDPOINT")
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    /// Strict-import policy (env > config > off)
    pub fn effective_strict_import(&self, env: &dyn Env) -> bool {
        env.var("ARM_PROVIDER_STRICT")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .or(self.strict_import)
            .unwrap_or(false)
    }

    /// Pick a token source: a pre-issued token wins over a service principal
    pub fn effective_token_source(&self, env: &dyn Env) -> Result<TokenSource> {
        if let Some(token) = env.var("ARM_ACCESS_TOKEN") {
            return Ok(TokenSource::Static(token));
        }

        let tenant_id = env.var("ARM_TENANT_ID").or_else(|| self.tenant_id.clone());
        let client_id = env.var("ARM_CLIENT_ID").or_else(|| self.client_id.clone());
        let client_secret = env.var("ARM_CLIENT_SECRET");

        match (tenant_id, client_id, client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                Ok(TokenSource::ClientSecret {
                    authority: env
                        .var("ARM_AUTHORITY")
                        .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
                    tenant_id,
                    client_id,
                    client_secret,
                })
            }
            _ => Err(anyhow::anyhow!(
                "No Azure credentials configured. Set ARM_ACCESS_TOKEN, or ARM_TENANT_ID, \
                 ARM_CLIENT_ID and ARM_CLIENT_SECRET"
            )),
        }
    }

    /// Set subscription and save
    pub fn set_subscription(&mut self, subscription_id: &str) -> Result<()> {
        self.subscription_id = Some(subscription_id.to_string());
        self.save()
    }
}
