//! Resource abstraction layer
//!
//! A resource type exposes its schema and a set of lifecycle callbacks that a
//! host runtime drives. The host owns persisted state; a resource only turns
//! configuration into remote calls and remote objects back into state.
//!
//! # Architecture
//!
//! - [`schema`] - Declarative field definitions and validators
//! - [`id`] - Azure resource identifier parsing
//! - [`tags`] - Tag expand/flatten/validation helpers
//! - [`linked_service`] - The Log Analytics workspace linked-service resource
//!
//! # Example
//!
//! ```ignore
//! use lals::resource::{LinkedServiceResource, ResourceLifecycle};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn refresh(resource: &LinkedServiceResource, id: &str) -> lals::Result<()> {
//!     let state = resource.read(id, &CancellationToken::new()).await?;
//!     println!("{:?}", state);
//!     Ok(())
//! }
//! ```

pub mod id;
pub mod linked_service;
pub mod schema;
pub mod tags;

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub use linked_service::{LinkedServiceConfig, LinkedServiceResource, LinkedServiceState};
pub use schema::{FieldSchema, ResourceSchema};

/// Whether the remote object behind a persisted id still exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteState<S> {
    Present { id: String, state: S },
    Absent,
}

impl<S> RemoteState<S> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Present { id, .. } => Some(id),
            Self::Absent => None,
        }
    }

    pub fn state(&self) -> Option<&S> {
        match self {
            Self::Present { state, .. } => Some(state),
            Self::Absent => None,
        }
    }
}

/// What applying a configuration against prior state would do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    Create,
    Update { changed: Vec<&'static str> },
    /// At least one force-new field changed
    Replace { changed: Vec<&'static str> },
    NoOp,
}

/// Lifecycle callbacks a host runtime drives for one resource type
///
/// `create` and `update` share one implementation in practice; `create`
/// additionally marks the logical resource as new to the host.
#[async_trait]
pub trait ResourceLifecycle: Send + Sync {
    type Config: Send + Sync;
    type State: Send + Sync;

    fn schema(&self) -> ResourceSchema;

    /// Decode and validate loosely-typed host configuration
    ///
    /// Needs no instance, so configuration can be checked before any client
    /// is built.
    fn decode(raw: &serde_json::Value) -> Result<Self::Config>;

    /// Diff configuration against prior state without touching the remote API
    fn plan(&self, prior: Option<&Self::State>, config: &Self::Config) -> Plan;

    async fn create(
        &self,
        config: &Self::Config,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<Self::State>>;

    async fn update(
        &self,
        config: &Self::Config,
        cancel: &CancellationToken,
    ) -> Result<RemoteState<Self::State>>;

    async fn read(&self, id: &str, cancel: &CancellationToken) -> Result<RemoteState<Self::State>>;

    async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<()>;

    async fn import(&self, id: &str, cancel: &CancellationToken)
        -> Result<RemoteState<Self::State>>;
}

/// Race a remote call against the caller's cancellation token
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_state_accessors() {
        let present = RemoteState::Present {
            id: "/subscriptions/s".to_string(),
            state: 7,
        };
        assert!(present.is_present());
        assert_eq!(present.id(), Some("/subscriptions/s"));
        assert_eq!(present.state(), Some(&7));

        let absent: RemoteState<i32> = RemoteState::Absent;
        assert!(!absent.is_present());
        assert!(absent.id().is_none());
    }

    #[test]
    fn test_remote_state_serialization_is_tagged() {
        let absent: RemoteState<i32> = RemoteState::Absent;
        assert_eq!(serde_json::to_value(&absent).unwrap()["status"], "absent");
    }

    #[tokio::test]
    async fn test_cancellable_returns_cancelled_when_token_fired() {
        let token = CancellationToken::new();
        token.cancel();
        let out = cancellable(&token, std::future::pending::<()>()).await;
        assert!(matches!(out, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellable_passes_through_result() {
        let token = CancellationToken::new();
        assert_eq!(cancellable(&token, async { 5 }).await.unwrap(), 5);
    }
}
