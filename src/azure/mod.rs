//! Azure Resource Manager interaction module
//!
//! This module provides the pieces needed to talk to the ARM control plane:
//! authentication, an HTTP client, and typed access to Log Analytics
//! linked services.
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer tokens from a static token or a service principal
//! - [`client`] - Main ARM client for making API requests
//! - [`http`] - HTTP utilities and error classification
//! - [`linked_services`] - Linked service models and the remote API seam
//!
//! # Example
//!
//! ```ignore
//! use lals::azure::{auth::ArmCredentials, client::ArmClient};
//! use lals::azure::linked_services::{LinkedServicesApi, LinkedServicesClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let creds = ArmCredentials::from_token(std::env::var("ARM_ACCESS_TOKEN")?)?;
//!     let client = ArmClient::new(creds, "my-subscription", "https://management.azure.com")?;
//!     let services = LinkedServicesClient::new(client);
//!     let ls = services.get("rg1", "ws1", "automation").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod linked_services;
