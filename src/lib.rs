//! Declarative management of Azure Log Analytics workspace linked services.
//!
//! - [`azure`] talks to Azure Resource Manager
//! - [`resource`] holds the linked-service resource and its schema
//! - [`host`] is the state-file host the `lals` binary runs on

pub mod azure;
pub mod config;
pub mod error;
pub mod host;
pub mod resource;

pub use error::{Error, Result};
