//! Command-line host
//!
//! Plays the orchestration runtime for a single resource instance: keeps the
//! persisted state in a JSON file and drives the resource's lifecycle
//! callbacks from a plan.

use crate::resource::{Plan, RemoteState, ResourceLifecycle};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

const STATE_VERSION: u32 = 1;

/// On-disk record of one tracked resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedResource<S> {
    pub version: u32,
    pub resource_type: String,
    pub id: String,
    pub attributes: S,
    pub updated_at: DateTime<Utc>,
}

/// JSON state file holding at most one tracked resource
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default state location in the working directory
    pub fn default_path() -> PathBuf {
        PathBuf::from("lals.state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the tracked resource; `None` when nothing is tracked yet
    pub fn load<S: DeserializeOwned>(&self) -> Result<Option<TrackedResource<S>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let tracked: TrackedResource<S> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file {:?}", self.path))?;
        if tracked.version != STATE_VERSION {
            return Err(anyhow::anyhow!(
                "Unsupported state version {} in {:?}",
                tracked.version,
                self.path
            ));
        }
        Ok(Some(tracked))
    }

    pub fn save<S: Serialize>(&self, tracked: &TrackedResource<S>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(tracked)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file {:?}", self.path))?;
        Ok(())
    }

    /// Forget the tracked resource
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove state file {:?}", self.path))?;
        }
        Ok(())
    }
}

/// Result of `apply`
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome<S> {
    pub plan: Plan,
    pub state: RemoteState<S>,
}

/// Drives one resource type against one state file
pub struct Host<R> {
    resource: R,
    store: StateStore,
}

impl<R> Host<R>
where
    R: ResourceLifecycle,
    R::State: Serialize + DeserializeOwned + Clone,
{
    pub fn new(resource: R, store: StateStore) -> Self {
        Self { resource, store }
    }

    fn record(&self, state: &RemoteState<R::State>) -> Result<()> {
        tracing::debug!("Recording state in {:?}", self.store.path());
        match state {
            RemoteState::Present { id, state } => self.store.save(&TrackedResource {
                version: STATE_VERSION,
                resource_type: self.resource.schema().type_name.to_string(),
                id: id.clone(),
                attributes: state.clone(),
                updated_at: Utc::now(),
            }),
            RemoteState::Absent => self.store.clear(),
        }
    }

    /// Re-read the tracked object; `None` when nothing is tracked or it is gone
    async fn refreshed(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<TrackedResource<R::State>>> {
        let Some(prior) = self.store.load::<R::State>()? else {
            return Ok(None);
        };
        let state = self.resource.read(&prior.id, cancel).await?;
        self.record(&state)?;
        match state {
            RemoteState::Present { id, state } => Ok(Some(TrackedResource {
                id,
                attributes: state,
                updated_at: Utc::now(),
                ..prior
            })),
            RemoteState::Absent => {
                tracing::warn!("{} no longer exists, removing from state", prior.id);
                Ok(None)
            }
        }
    }

    /// Diff configuration against the refreshed state
    pub async fn plan(&self, config: &R::Config, cancel: &CancellationToken) -> Result<Plan> {
        let prior = self.refreshed(cancel).await?;
        Ok(self
            .resource
            .plan(prior.as_ref().map(|p| &p.attributes), config))
    }

    /// Converge the remote object on the configuration
    pub async fn apply(
        &self,
        config: &R::Config,
        cancel: &CancellationToken,
    ) -> Result<ApplyOutcome<R::State>> {
        let prior = self.refreshed(cancel).await?;
        let plan = self
            .resource
            .plan(prior.as_ref().map(|p| &p.attributes), config);

        tracing::info!("Applying plan {:?}", plan);

        let state = match (&plan, prior) {
            (Plan::NoOp, Some(prior)) => RemoteState::Present {
                id: prior.id,
                state: prior.attributes,
            },
            (Plan::Create, _) | (Plan::NoOp, None) => self.resource.create(config, cancel).await?,
            (Plan::Update { .. }, _) => self.resource.update(config, cancel).await?,
            (Plan::Replace { .. }, prior) => {
                if let Some(prior) = prior {
                    self.resource.delete(&prior.id, cancel).await?;
                    self.store.clear()?;
                }
                self.resource.create(config, cancel).await?
            }
        };

        self.record(&state)?;
        tracing::info!("Applied, now tracking {:?}", state.id());
        Ok(ApplyOutcome { plan, state })
    }

    /// Re-read the tracked resource; clears state when it is gone
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<RemoteState<R::State>> {
        Ok(match self.refreshed(cancel).await? {
            Some(tracked) => RemoteState::Present {
                id: tracked.id,
                state: tracked.attributes,
            },
            None => RemoteState::Absent,
        })
    }

    /// Start tracking an existing remote object
    pub async fn import(&self, id: &str, cancel: &CancellationToken) -> Result<RemoteState<R::State>> {
        if let Some(prior) = self.store.load::<R::State>()? {
            return Err(anyhow::anyhow!(
                "State already tracks {}; destroy or remove it before importing",
                prior.id
            ));
        }
        let state = self.resource.import(id, cancel).await?;
        self.record(&state)?;
        Ok(state)
    }

    /// Delete the tracked remote object and forget it
    pub async fn destroy(&self, cancel: &CancellationToken) -> Result<bool> {
        let Some(prior) = self.store.load::<R::State>()? else {
            return Ok(false);
        };
        self.resource.delete(&prior.id, cancel).await?;
        self.store.clear()?;
        Ok(true)
    }
}
