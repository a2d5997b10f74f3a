//! az CLI wrapper
//!
//! Wraps the `az` CLI commands for resource groups and PostgreSQL flexible
//! servers. Argument lists are built by plain functions so they can be
//! checked without the CLI installed.

use crate::error::{AzureError, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// Markers az prints on stderr when a resource does not exist
const NOT_FOUND_MARKERS: &[&str] = &[
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "could not be found",
    "was not found",
];

/// az CLI wrapper
pub struct Az {
    program: String,
}

impl Default for Az {
    fn default() -> Self {
        Self::new()
    }
}

impl Az {
    pub fn new() -> Self {
        Self::with_program("az")
    }

    /// Use a different executable (e.g. a pinned install)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check if az is installed and logged in
    pub async fn check_auth(&self) -> Result<AccountInfo> {
        let which = Command::new("which").arg(&self.program).output().await?;
        if !which.status.success() {
            return Err(AzureError::AzNotFound);
        }

        let output = self
            .run_command(&["account", "show", "--output", "json"])
            .await
            .map_err(|e| match e {
                AzureError::CommandFailed(msg) => AzureError::AuthenticationFailed(msg),
                other => other,
            })?;

        Ok(serde_json::from_str(&output)?)
    }

    /// Run an az command and return stdout
    async fn run_command<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.program, redact(&args).join(" "));

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m)) {
                return Err(AzureError::NotFound(stderr));
            }
            return Err(AzureError::CommandFailed(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a `show` command, mapping "not found" to `None`
    async fn show<T: serde::de::DeserializeOwned, S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<Option<T>> {
        match self.run_command(args).await {
            Ok(output) if output.trim().is_empty() => Ok(None),
            Ok(output) => Ok(Some(serde_json::from_str(&output)?)),
            Err(AzureError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run a `delete` command; deleting something already gone succeeds
    async fn delete<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        match self.run_command(args).await {
            Ok(_) | Err(AzureError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn create_group(&self, name: &str, location: &str) -> Result<GroupInfo> {
        let output = self
            .run_command(group_create_args(name, location).as_slice())
            .await?;
        Ok(serde_json::from_str(&output)?)
    }

    pub async fn show_group(&self, name: &str) -> Result<Option<GroupInfo>> {
        self.show(&["group", "show", "--name", name, "--output", "json"])
            .await
    }

    pub async fn delete_group(&self, name: &str) -> Result<()> {
        self.delete(&["group", "delete", "--name", name, "--yes"])
            .await
    }

    /// Create a server and read it back
    ///
    /// `create` prints a connection summary rather than the server resource,
    /// so the server is fetched with `show` afterwards.
    pub async fn create_server(&self, config: &ServerSpec) -> Result<ServerInfo> {
        self.run_command(server_create_args(config).as_slice()).await?;
        self.show_server(&config.resource_group_name, &config.name)
            .await?
            .ok_or_else(|| {
                AzureError::NotFound(format!(
                    "flexible server {} is missing after create",
                    config.name
                ))
            })
    }

    pub async fn update_server(&self, config: &ServerSpec) -> Result<ServerInfo> {
        let output = self.run_command(server_update_args(config).as_slice()).await?;
        Ok(serde_json::from_str(&output)?)
    }

    pub async fn show_server(&self, group: &str, name: &str) -> Result<Option<ServerInfo>> {
        self.show(&[
            "postgres",
            "flexible-server",
            "show",
            "--resource-group",
            group,
            "--name",
            name,
            "--output",
            "json",
        ])
        .await
    }

    pub async fn delete_server(&self, group: &str, name: &str) -> Result<()> {
        self.delete(&[
            "postgres",
            "flexible-server",
            "delete",
            "--resource-group",
            group,
            "--name",
            name,
            "--yes",
        ])
        .await
    }

    pub async fn create_firewall_rule(&self, rule: &FirewallRuleSpec) -> Result<FirewallRuleInfo> {
        let output = self
            .run_command(firewall_rule_args("create", rule).as_slice())
            .await?;
        Ok(serde_json::from_str(&output)?)
    }

    pub async fn update_firewall_rule(&self, rule: &FirewallRuleSpec) -> Result<FirewallRuleInfo> {
        let output = self
            .run_command(firewall_rule_args("update", rule).as_slice())
            .await?;
        Ok(serde_json::from_str(&output)?)
    }

    pub async fn show_firewall_rule(
        &self,
        group: &str,
        server: &str,
        rule: &str,
    ) -> Result<Option<FirewallRuleInfo>> {
        self.show(&[
            "postgres",
            "flexible-server",
            "firewall-rule",
            "show",
            "--resource-group",
            group,
            "--name",
            server,
            "--rule-name",
            rule,
            "--output",
            "json",
        ])
        .await
    }

    pub async fn delete_firewall_rule(&self, group: &str, server: &str, rule: &str) -> Result<()> {
        self.delete(&[
            "postgres",
            "flexible-server",
            "firewall-rule",
            "delete",
            "--resource-group",
            group,
            "--name",
            server,
            "--rule-name",
            rule,
            "--yes",
        ])
        .await
    }
}

/// Hide the value following `--admin-password` in logs
fn redact<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for &arg in args {
        out.push(if hide_next { "***" } else { arg });
        hide_next = arg == "--admin-password";
    }
    out
}

pub(crate) fn group_create_args(name: &str, location: &str) -> Vec<String> {
    ["group", "create", "--name", name, "--location", location, "--output", "json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub(crate) fn server_create_args(config: &ServerSpec) -> Vec<String> {
    let mut args: Vec<String> = [
        "postgres",
        "flexible-server",
        "create",
        "--resource-group",
        config.resource_group_name.as_str(),
        "--name",
        config.name.as_str(),
        "--location",
        config.location.as_str(),
        "--version",
        config.version.as_str(),
        "--admin-user",
        config.administrator_login.as_str(),
        "--admin-password",
        config.administrator_login_password.as_str(),
        "--backup-retention",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(config.backup_retention_days.to_string());
    args.extend(["--tier".to_string(), config.sku_tier.clone()]);
    args.extend(["--sku-name".to_string(), config.sku_name.clone()]);

    if let Some(size) = config.storage_size_gb {
        args.extend(["--storage-size".to_string(), size.to_string()]);
    }
    if let Some(ref zone) = config.availability_zone {
        args.extend(["--zone".to_string(), zone.clone()]);
    }

    // Network access is declared separately through firewall rules
    args.extend(
        ["--public-access", "None", "--yes", "--output", "json"]
            .iter()
            .map(|s| s.to_string()),
    );
    args
}

pub(crate) fn server_update_args(config: &ServerSpec) -> Vec<String> {
    let mut args: Vec<String> = [
        "postgres",
        "flexible-server",
        "update",
        "--resource-group",
        config.resource_group_name.as_str(),
        "--name",
        config.name.as_str(),
        "--admin-password",
        config.administrator_login_password.as_str(),
        "--backup-retention",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(config.backup_retention_days.to_string());
    args.extend(["--tier".to_string(), config.sku_tier.clone()]);
    args.extend(["--sku-name".to_string(), config.sku_name.clone()]);
    if let Some(size) = config.storage_size_gb {
        args.extend(["--storage-size".to_string(), size.to_string()]);
    }
    args.extend(["--output".to_string(), "json".to_string()]);
    args
}

pub(crate) fn firewall_rule_args(verb: &str, rule: &FirewallRuleSpec) -> Vec<String> {
    [
        "postgres",
        "flexible-server",
        "firewall-rule",
        verb,
        "--resource-group",
        rule.resource_group_name.as_str(),
        "--name",
        rule.server_name.as_str(),
        "--rule-name",
        rule.name.as_str(),
        "--start-ip-address",
        rule.start_ip_address.as_str(),
        "--end-ip-address",
        rule.end_ip_address.as_str(),
        "--output",
        "json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Account information from `az account show`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub name: String,
    pub user: Option<AccountUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountUser {
    pub name: String,
}

/// Resource group information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
    pub location: String,
}

/// Flexible server information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub id: Option<String>,
    pub name: String,
    pub fully_qualified_domain_name: Option<String>,
    pub location: Option<String>,
    pub version: Option<String>,
    pub state: Option<String>,
    pub availability_zone: Option<String>,
}

impl ServerInfo {
    pub fn is_ready(&self) -> bool {
        self.state.as_deref() == Some("Ready")
    }
}

/// Firewall rule information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleInfo {
    pub id: Option<String>,
    pub name: String,
    pub start_ip_address: String,
    pub end_ip_address: String,
}

/// Inputs of a flexible server
#[derive(Debug, Clone)]
pub struct ServerSpec {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub availability_zone: Option<String>,
    pub version: String,
    pub administrator_login: String,
    pub administrator_login_password: String,
    pub backup_retention_days: u32,
    pub sku_tier: String,
    pub sku_name: String,
    pub storage_size_gb: Option<u32>,
}

/// Inputs of a firewall rule
#[derive(Debug, Clone)]
pub struct FirewallRuleSpec {
    pub name: String,
    pub resource_group_name: String,
    pub server_name: String,
    pub start_ip_address: String,
    pub end_ip_address: String,
}
