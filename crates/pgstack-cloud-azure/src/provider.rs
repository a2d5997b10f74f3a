//! Azure provider implementation

use crate::az::{Az, FirewallRuleSpec, ServerSpec};
use crate::error::{AzureError, Result};
use async_trait::async_trait;
use pgstack_cloud::{
    AuthStatus, CloudProvider, ResolvedResource, ResourceState, ResourceStatus,
};
use serde::Deserialize;
use serde_json::json;

pub const PROVIDER_NAME: &str = "azure-native";

pub const RESOURCE_GROUP: &str = "resource-group";
pub const FLEXIBLE_SERVER: &str = "flexible-server";
pub const FIREWALL_RULE: &str = "firewall-rule";

/// Backup retention used when none is declared
const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 7;

/// Azure provider backed by the az CLI
pub struct AzureProvider {
    az: Az,
}

impl Default for AzureProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct GroupInputs {
    location: String,
}

#[derive(Debug, Deserialize)]
struct ServerInputs {
    resource_group_name: String,
    location: String,
    #[serde(default)]
    availability_zone: Option<String>,
    version: String,
    administrator_login: String,
    administrator_login_password: String,
    #[serde(default)]
    backup: Option<BackupInputs>,
    sku: SkuInputs,
    #[serde(default)]
    storage: Option<StorageInputs>,
}

#[derive(Debug, Deserialize)]
struct BackupInputs {
    backup_retention_days: u32,
}

#[derive(Debug, Deserialize)]
struct SkuInputs {
    tier: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct StorageInputs {
    storage_size_gb: u32,
}

#[derive(Debug, Deserialize)]
struct FirewallRuleInputs {
    resource_group_name: String,
    server_name: String,
    start_ip_address: String,
    end_ip_address: String,
}

impl AzureProvider {
    pub fn new() -> Self {
        Self { az: Az::new() }
    }

    pub fn with_az(az: Az) -> Self {
        Self { az }
    }

    fn server_spec(resource: &ResolvedResource) -> Result<ServerSpec> {
        let inputs: ServerInputs = serde_json::from_value(resource.inputs.clone())?;
        Ok(ServerSpec {
            name: resource.name.clone(),
            resource_group_name: inputs.resource_group_name,
            location: inputs.location,
            availability_zone: inputs.availability_zone,
            version: inputs.version,
            administrator_login: inputs.administrator_login,
            administrator_login_password: inputs.administrator_login_password,
            backup_retention_days: inputs
                .backup
                .map(|b| b.backup_retention_days)
                .unwrap_or(DEFAULT_BACKUP_RETENTION_DAYS),
            sku_tier: inputs.sku.tier,
            sku_name: inputs.sku.name,
            storage_size_gb: inputs.storage.map(|s| s.storage_size_gb),
        })
    }

    fn rule_spec(resource: &ResolvedResource) -> Result<FirewallRuleSpec> {
        let inputs: FirewallRuleInputs = serde_json::from_value(resource.inputs.clone())?;
        Ok(FirewallRuleSpec {
            name: resource.name.clone(),
            resource_group_name: inputs.resource_group_name,
            server_name: inputs.server_name,
            start_ip_address: inputs.start_ip_address,
            end_ip_address: inputs.end_ip_address,
        })
    }

    async fn create_resource(&self, resource: &ResolvedResource) -> Result<ResourceState> {
        match resource.resource_type.as_str() {
            RESOURCE_GROUP => {
                let inputs: GroupInputs = serde_json::from_value(resource.inputs.clone())?;
                tracing::info!("Creating resource group {} in {}", resource.name, inputs.location);
                let group = self.az.create_group(&resource.name, &inputs.location).await?;
                Ok(group_state(&group.name, &group.id, &group.location))
            }
            FLEXIBLE_SERVER => {
                let spec = Self::server_spec(resource)?;
                tracing::info!(
                    "Creating flexible server {} ({} / {}, PostgreSQL {})",
                    spec.name,
                    spec.sku_tier,
                    spec.sku_name,
                    spec.version
                );
                let server = self.az.create_server(&spec).await?;
                Ok(server_state(&server, &spec.resource_group_name))
            }
            FIREWALL_RULE => {
                let spec = Self::rule_spec(resource)?;
                tracing::info!(
                    "Creating firewall rule {} on {} ({} - {})",
                    spec.name,
                    spec.server_name,
                    spec.start_ip_address,
                    spec.end_ip_address
                );
                let rule = self.az.create_firewall_rule(&spec).await?;
                Ok(rule_state(&rule, &spec.resource_group_name, &spec.server_name))
            }
            other => Err(AzureError::UnsupportedResource(other.to_string())),
        }
    }

    async fn read_resource(&self, current: &ResourceState) -> Result<Option<ResourceState>> {
        match current.resource_type.as_str() {
            RESOURCE_GROUP => Ok(self
                .az
                .show_group(&current.id)
                .await?
                .map(|g| group_state(&g.name, &g.id, &g.location))),
            FLEXIBLE_SERVER => {
                let group = attribute(current, "resource_group_name")?;
                Ok(self
                    .az
                    .show_server(&group, &current.id)
                    .await?
                    .map(|s| server_state(&s, &group)))
            }
            FIREWALL_RULE => {
                let group = attribute(current, "resource_group_name")?;
                let server = attribute(current, "server_name")?;
                Ok(self
                    .az
                    .show_firewall_rule(&group, &server, &current.id)
                    .await?
                    .map(|r| rule_state(&r, &group, &server)))
            }
            other => Err(AzureError::UnsupportedResource(other.to_string())),
        }
    }

    async fn update_resource(
        &self,
        current: &ResourceState,
        resource: &ResolvedResource,
    ) -> Result<ResourceState> {
        match resource.resource_type.as_str() {
            // Only location can change, which is a replace trigger
            RESOURCE_GROUP => Ok(current.clone()),
            FLEXIBLE_SERVER => {
                let spec = Self::server_spec(resource)?;
                tracing::info!("Updating flexible server {}", spec.name);
                let server = self.az.update_server(&spec).await?;
                Ok(server_state(&server, &spec.resource_group_name))
            }
            FIREWALL_RULE => {
                let spec = Self::rule_spec(resource)?;
                tracing::info!("Updating firewall rule {}", spec.name);
                let rule = self.az.update_firewall_rule(&spec).await?;
                Ok(rule_state(&rule, &spec.resource_group_name, &spec.server_name))
            }
            other => Err(AzureError::UnsupportedResource(other.to_string())),
        }
    }

    async fn delete_resource(&self, current: &ResourceState) -> Result<()> {
        match current.resource_type.as_str() {
            RESOURCE_GROUP => {
                tracing::info!("Deleting resource group {}", current.id);
                self.az.delete_group(&current.id).await
            }
            FLEXIBLE_SERVER => {
                tracing::info!("Deleting flexible server {}", current.id);
                let group = attribute(current, "resource_group_name")?;
                self.az.delete_server(&group, &current.id).await
            }
            FIREWALL_RULE => {
                tracing::info!("Deleting firewall rule {}", current.id);
                let group = attribute(current, "resource_group_name")?;
                let server = attribute(current, "server_name")?;
                self.az
                    .delete_firewall_rule(&group, &server, &current.id)
                    .await
            }
            other => Err(AzureError::UnsupportedResource(other.to_string())),
        }
    }
}

/// A recorded attribute, falling back to the declared input of the same name
fn attribute(state: &ResourceState, key: &str) -> Result<String> {
    state
        .get_attribute::<String>(key)
        .or_else(|| state.inputs.get(key).and_then(|v| v.as_str()).map(str::to_string))
        .ok_or_else(|| {
            AzureError::CommandFailed(format!("{} has no recorded '{}'", state.id, key))
        })
}

fn group_state(name: &str, id: &str, location: &str) -> ResourceState {
    ResourceState::new(name, RESOURCE_GROUP)
        .with_status(ResourceStatus::Running)
        .with_attribute("name", json!(name))
        .with_attribute("azure_id", json!(id))
        .with_attribute("location", json!(location))
}

fn server_state(server: &crate::az::ServerInfo, group: &str) -> ResourceState {
    let status = if server.is_ready() {
        ResourceStatus::Running
    } else {
        ResourceStatus::Creating
    };
    let fqdn = server
        .fully_qualified_domain_name
        .clone()
        .unwrap_or_else(|| format!("{}.postgres.database.azure.com", server.name));

    let mut state = ResourceState::new(&server.name, FLEXIBLE_SERVER)
        .with_status(status)
        .with_attribute("name", json!(server.name))
        .with_attribute("fully_qualified_domain_name", json!(fqdn))
        .with_attribute("resource_group_name", json!(group));
    if let Some(ref id) = server.id {
        state.set_attribute("azure_id", json!(id));
    }
    if let Some(ref s) = server.state {
        state.set_attribute("state", json!(s));
    }
    state
}

fn rule_state(rule: &crate::az::FirewallRuleInfo, group: &str, server: &str) -> ResourceState {
    ResourceState::new(&rule.name, FIREWALL_RULE)
        .with_status(ResourceStatus::Running)
        .with_attribute("name", json!(rule.name))
        .with_attribute("resource_group_name", json!(group))
        .with_attribute("server_name", json!(server))
        .with_attribute("start_ip_address", json!(rule.start_ip_address))
        .with_attribute("end_ip_address", json!(rule.end_ip_address))
}

#[async_trait]
impl CloudProvider for AzureProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "Microsoft Azure"
    }

    fn resource_types(&self) -> &[&'static str] {
        &[RESOURCE_GROUP, FLEXIBLE_SERVER, FIREWALL_RULE]
    }

    fn replace_triggers(&self, resource_type: &str) -> &[&'static str] {
        match resource_type {
            RESOURCE_GROUP => &["location"],
            FLEXIBLE_SERVER => &[
                "resource_group_name",
                "location",
                "version",
                "availability_zone",
                "administrator_login",
            ],
            FIREWALL_RULE => &["resource_group_name", "server_name"],
            _ => &[],
        }
    }

    fn autonamed(&self, _resource_type: &str) -> bool {
        true
    }

    async fn check_auth(&self) -> pgstack_cloud::Result<AuthStatus> {
        match self.az.check_auth().await {
            Ok(account) => {
                let user = account
                    .user
                    .map(|u| u.name)
                    .unwrap_or_else(|| "unknown user".to_string());
                Ok(AuthStatus::ok(format!("{} ({}) as {}", account.name, account.id, user)))
            }
            Err(AzureError::AzNotFound) => Ok(AuthStatus::failed("az is not installed")),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn create(&self, resource: &ResolvedResource) -> pgstack_cloud::Result<ResourceState> {
        Ok(self.create_resource(resource).await?)
    }

    async fn read(&self, current: &ResourceState) -> pgstack_cloud::Result<Option<ResourceState>> {
        Ok(self.read_resource(current).await?)
    }

    async fn update(
        &self,
        current: &ResourceState,
        resource: &ResolvedResource,
    ) -> pgstack_cloud::Result<ResourceState> {
        Ok(self.update_resource(current, resource).await?)
    }

    async fn delete(&self, current: &ResourceState) -> pgstack_cloud::Result<()> {
        Ok(self.delete_resource(current).await?)
    }
}
