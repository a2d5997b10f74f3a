//! Azure provider for pgstack
//!
//! This crate implements the CloudProvider trait for Microsoft Azure,
//! managing resource groups and PostgreSQL flexible servers.
//!
//! # Features
//!
//! - Resource groups
//! - PostgreSQL flexible servers (SKU, version, storage, availability zone)
//! - Flexible server firewall rules
//!
//! # Requirements
//!
//! - `az` CLI must be installed
//! - Authentication is managed through `az login`
//!
//! # Example
//!
//! ```ignore
//! use pgstack_cloud::CloudProvider;
//! use pgstack_cloud_azure::AzureProvider;
//!
//! let provider = AzureProvider::new();
//!
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//! ```

pub mod az;
pub mod error;
pub mod provider;

pub use az::{Az, FirewallRuleSpec, ServerInfo, ServerSpec};
pub use error::{AzureError, Result};
pub use provider::{AzureProvider, FIREWALL_RULE, FLEXIBLE_SERVER, PROVIDER_NAME, RESOURCE_GROUP};
