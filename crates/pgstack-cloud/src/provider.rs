//! Cloud provider trait definition

use crate::error::{CloudError, Result};
use crate::reference::{OutputRef, collect_refs};
use crate::state::ResourceState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cloud provider abstraction trait
///
/// Every provider (Azure, the local `random` provider, test doubles)
/// implements this trait. Providers handle one resource at a time; ordering,
/// diffing and reference resolution belong to the [`Engine`](crate::Engine).
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "azure-native", "random")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Resource types this provider manages
    fn resource_types(&self) -> &[&'static str];

    /// Input fields whose change requires delete + create
    fn replace_triggers(&self, _resource_type: &str) -> &[&'static str] {
        &[]
    }

    /// Output attributes that must be masked when displayed
    fn secret_outputs(&self, _resource_type: &str) -> &[&'static str] {
        &[]
    }

    /// Whether the engine should assign a physical name with a random suffix
    fn autonamed(&self, _resource_type: &str) -> bool {
        false
    }

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Create a resource from fully resolved inputs
    async fn create(&self, resource: &ResolvedResource) -> Result<ResourceState>;

    /// Read the live state of a resource; `None` if it no longer exists
    async fn read(&self, current: &ResourceState) -> Result<Option<ResourceState>>;

    /// Update a resource in place
    async fn update(
        &self,
        current: &ResourceState,
        resource: &ResolvedResource,
    ) -> Result<ResourceState>;

    /// Delete a resource
    async fn delete(&self, current: &ResourceState) -> Result<()>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Set of resources to be managed, plus the stack outputs they export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resources indexed by type:id
    pub resources: BTreeMap<String, ResourceConfig>,

    /// Stack outputs exported after apply
    pub exports: BTreeMap<String, OutputRef>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.key(), resource);
    }

    pub fn export(&mut self, name: impl Into<String>, output: OutputRef) {
        self.exports.insert(name.into(), output);
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<&ResourceConfig> {
        self.resources.get(&format!("{}:{}", resource_type, id))
    }

    pub fn get_by_key(&self, key: &str) -> Option<&ResourceConfig> {
        self.resources.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Configuration for a cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g., "flexible-server")
    pub resource_type: String,

    /// Logical resource name
    pub id: String,

    /// Provider name
    pub provider: String,

    /// Resource inputs; may contain output references
    pub config: serde_json::Value,

    /// Keys of resources this one depends on
    pub depends_on: Vec<String>,
}

impl ResourceConfig {
    /// Create a resource config; dependencies are taken from the references
    /// found in `config`.
    pub fn new(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        provider: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        let mut depends_on: Vec<String> =
            collect_refs(&config).into_iter().map(|r| r.resource).collect();
        depends_on.sort();
        depends_on.dedup();

        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            provider: provider.into(),
            config,
            depends_on,
        }
    }

    /// Get the full resource key (type:id)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.id)
    }

    /// Get a configuration value as a specific type
    pub fn get_config<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// A resource whose references have all been replaced with values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedResource {
    /// Resource key (type:id)
    pub key: String,

    /// Resource type
    pub resource_type: String,

    /// Physical name to create the resource under
    pub name: String,

    /// Resolved inputs
    pub inputs: serde_json::Value,
}

impl ResolvedResource {
    /// Get an optional input
    pub fn get<T: serde::de::DeserializeOwned>(&self, field: &str) -> Option<T> {
        self.inputs
            .get(field)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get a required input
    pub fn require<T: serde::de::DeserializeOwned>(&self, field: &str) -> Result<T> {
        self.get(field).ok_or_else(|| {
            CloudError::InvalidConfig(format!("{} requires input '{}'", self.key, field))
        })
    }
}

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: std::time::Duration,

    /// Maximum delay between retries
    pub max_delay: std::time::Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: std::time::Duration::ZERO,
            max_delay: std::time::Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before the attempt following `delay`
    pub fn next_delay(&self, delay: std::time::Duration) -> std::time::Duration {
        delay.mul_f64(self.backoff_multiplier).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: std::time::Duration::from_secs(1),
            max_delay: std::time::Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}
