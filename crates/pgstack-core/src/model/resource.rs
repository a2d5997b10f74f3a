//! Declared resources

use crate::error::{Result, StackError};
use crate::model::Input;
use pgstack_cloud::random::{self, PasswordPolicy};
use pgstack_cloud::{OutputRef, ResourceConfig};
use pgstack_cloud_azure::{FIREWALL_RULE, FLEXIBLE_SERVER, RESOURCE_GROUP};
use serde::{Deserialize, Serialize};

/// Azure resource group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceGroup {
    pub location: Input<String>,
}

/// Generated administrator password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RandomPassword {
    pub length: usize,
    pub min_lower: usize,
    pub min_upper: usize,
    pub min_numeric: usize,
    pub min_special: usize,
}

impl RandomPassword {
    pub fn policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            length: self.length,
            min_lower: self.min_lower,
            min_upper: self.min_upper,
            min_numeric: self.min_numeric,
            min_special: self.min_special,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.policy()
            .validate()
            .map_err(StackError::InvalidCredential)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub tier: String,
    pub name: String,
}

impl Sku {
    pub fn new(tier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub storage_size_gb: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub backup_retention_days: u32,
}

/// PostgreSQL flexible server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlexibleServer {
    pub resource_group_name: Input<String>,
    pub location: Input<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    pub version: String,
    pub administrator_login: String,
    pub administrator_login_password: Input<String>,
    pub backup: Backup,
    pub sku: Sku,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
}

/// Flexible server firewall rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirewallRule {
    pub resource_group_name: Input<String>,
    pub server_name: Input<String>,
    pub start_ip_address: String,
    pub end_ip_address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    ResourceGroup(ResourceGroup),
    RandomPassword(RandomPassword),
    FlexibleServer(FlexibleServer),
    FirewallRule(FirewallRule),
}

/// A resource declaration under its logical name
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceKind,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self.kind {
            ResourceKind::ResourceGroup(_) => RESOURCE_GROUP,
            ResourceKind::RandomPassword(_) => random::RANDOM_PASSWORD,
            ResourceKind::FlexibleServer(_) => FLEXIBLE_SERVER,
            ResourceKind::FirewallRule(_) => FIREWALL_RULE,
        }
    }

    pub fn provider(&self) -> &'static str {
        match self.kind {
            ResourceKind::RandomPassword(_) => random::PROVIDER_NAME,
            _ => pgstack_cloud_azure::PROVIDER_NAME,
        }
    }

    /// Engine key (type:name)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type(), self.name)
    }

    /// Reference to one of this resource's outputs
    pub fn output(&self, name: &str) -> OutputRef {
        OutputRef::new(self.key(), name)
    }

    /// Inputs as the engine sees them
    pub fn inputs(&self) -> Result<serde_json::Value> {
        let value = match &self.kind {
            ResourceKind::ResourceGroup(r) => serde_json::to_value(r)?,
            ResourceKind::RandomPassword(r) => serde_json::to_value(r)?,
            ResourceKind::FlexibleServer(r) => serde_json::to_value(r)?,
            ResourceKind::FirewallRule(r) => serde_json::to_value(r)?,
        };
        Ok(value)
    }

    pub fn to_config(&self) -> Result<ResourceConfig> {
        Ok(ResourceConfig::new(
            self.resource_type(),
            self.name.clone(),
            self.provider(),
            self.inputs()?,
        ))
    }
}
