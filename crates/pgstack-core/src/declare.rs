//! Topology declaration
//!
//! Builds the resource graph of one revision: an administrator password, a
//! resource group and a flexible server, plus an allow-all firewall rule
//! from v3 on. Nothing here touches the network or the filesystem.

use crate::error::Result;
use crate::model::{
    Backup, FirewallRule, FlexibleServer, Input, RandomPassword, Resource, ResourceGroup,
    ResourceKind, Revision, StackConfig, Topology,
};
use tracing::debug;

/// Namespace holding the availability zone
pub const EXAMPLE_NAMESPACE: &str = "example";
/// Namespace holding Azure provider settings
pub const AZURE_NAMESPACE: &str = "azure-native";
/// Region used when `azure-native:location` is not configured
pub const DEFAULT_LOCATION: &str = "eastus";

/// Configuration keys the declaration reads
pub const CONFIG_KEYS: &[(&str, &str)] = &[
    (EXAMPLE_NAMESPACE, "zone"),
    (AZURE_NAMESPACE, "location"),
];

pub const RESOURCE_GROUP_NAME: &str = "example";
pub const SERVER_NAME: &str = "postgres";
pub const PASSWORD_NAME: &str = "postgres";
pub const FIREWALL_RULE_NAME: &str = "allow-all";

pub const ADMINISTRATOR_LOGIN: &str = "postgres";
pub const BACKUP_RETENTION_DAYS: u32 = 7;

const PASSWORD: RandomPassword = RandomPassword {
    length: 16,
    min_lower: 1,
    min_upper: 1,
    min_numeric: 1,
    min_special: 1,
};

/// Declare the topology of `revision`
///
/// `example:zone` is required for every revision, including v1 which does
/// not pin the server to it.
pub fn declare_topology(config: &StackConfig, revision: Revision) -> Result<Topology> {
    let zone = config.require(EXAMPLE_NAMESPACE, "zone")?;
    let location = config
        .get(AZURE_NAMESPACE, "location")
        .unwrap_or(DEFAULT_LOCATION);
    debug!(%revision, zone, location, "Declaring topology");

    PASSWORD.validate()?;

    let mut topology = Topology::new(revision);

    let password = Resource::new(PASSWORD_NAME, ResourceKind::RandomPassword(PASSWORD));
    let password_result = password.output("result");
    topology.declare(password);

    let group = Resource::new(
        RESOURCE_GROUP_NAME,
        ResourceKind::ResourceGroup(ResourceGroup {
            location: Input::Value(location.to_string()),
        }),
    );
    let group_name = group.output("name");
    let group_location = group.output("location");
    topology.declare(group);

    let server = Resource::new(
        SERVER_NAME,
        ResourceKind::FlexibleServer(FlexibleServer {
            resource_group_name: group_name.clone().into(),
            location: group_location.into(),
            availability_zone: revision.pins_zone().then(|| zone.to_string()),
            version: revision.postgres_version().to_string(),
            administrator_login: ADMINISTRATOR_LOGIN.to_string(),
            administrator_login_password: password_result.clone().into(),
            backup: Backup {
                backup_retention_days: BACKUP_RETENTION_DAYS,
            },
            sku: revision.sku(),
            storage: revision.storage(),
        }),
    );
    let server_name = server.output("name");
    let server_fqdn = server.output("fully_qualified_domain_name");
    topology.declare(server);

    if revision.has_firewall_rule() {
        topology.declare(Resource::new(
            FIREWALL_RULE_NAME,
            ResourceKind::FirewallRule(FirewallRule {
                resource_group_name: group_name.into(),
                server_name: server_name.clone().into(),
                start_ip_address: "0.0.0.0".to_string(),
                end_ip_address: "255.255.255.255".to_string(),
            }),
        ));
    }

    topology.export("fqdn", server_fqdn);
    topology.export("host", server_name);
    topology.export("password", password_result);

    Ok(topology)
}
