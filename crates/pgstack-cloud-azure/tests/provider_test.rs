#![cfg(unix)]

use pgstack_cloud::{CloudProvider, ResolvedResource, ResourceState, ResourceStatus};
use pgstack_cloud_azure::{Az, AzureProvider, FIREWALL_RULE, FLEXIBLE_SERVER, RESOURCE_GROUP};
use serde_json::json;
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

/// Stand-in for az that answers with the CLI's documented output shapes.
/// Names containing "missing" produce az's not-found error.
const FAKE_AZ: &str = r##"#!/bin/sh
echo "$*" >> "$(dirname "$0")/calls.log"

name=""; rule=""; group=""; start=""; end=""; prev=""
for arg in "$@"; do
    case "$prev" in
        --name) name="$arg" ;;
        --rule-name) rule="$arg" ;;
        --resource-group) group="$arg" ;;
        --start-ip-address) start="$arg" ;;
        --end-ip-address) end="$arg" ;;
    esac
    prev="$arg"
done

case "$name $rule" in
    *missing*)
        echo "(ResourceNotFound) The Resource '$name' under resource group '$group' was not found." >&2
        exit 3
        ;;
esac

case "$1" in
group)
    case "$2" in
    create|show)
        cat <<EOF
{
  "id": "/subscriptions/0000/resourceGroups/$name",
  "location": "eastus",
  "managedBy": null,
  "name": "$name",
  "properties": { "provisioningState": "Succeeded" },
  "tags": null,
  "type": "Microsoft.Resources/resourceGroups"
}
EOF
        ;;
    esac
    ;;
postgres)
    case "$3" in
    create)
        cat <<EOF
{
  "connectionString": "postgresql://postgres:secret@$name.postgres.database.azure.com/postgres?sslmode=require",
  "databaseName": "flexibleserverdb",
  "host": "$name.postgres.database.azure.com",
  "id": "/subscriptions/0000/resourceGroups/$group/providers/Microsoft.DBforPostgreSQL/flexibleServers/$name",
  "location": "East US",
  "password": "secret",
  "resourceGroup": "$group",
  "skuname": "Standard_D2ds_v4",
  "username": "postgres",
  "version": "15"
}
EOF
        ;;
    show|update)
        cat <<EOF
{
  "administratorLogin": "postgres",
  "availabilityZone": "1",
  "fullyQualifiedDomainName": "$name.postgres.database.azure.com",
  "id": "/subscriptions/0000/resourceGroups/$group/providers/Microsoft.DBforPostgreSQL/flexibleServers/$name",
  "location": "East US",
  "name": "$name",
  "resourceGroup": "$group",
  "sku": { "name": "Standard_D2ds_v4", "tier": "GeneralPurpose" },
  "state": "Ready",
  "storage": { "storageSizeGb": 32 },
  "version": "15"
}
EOF
        ;;
    firewall-rule)
        case "$4" in
        create|update|show)
            cat <<EOF
{
  "endIpAddress": "${end:-255.255.255.255}",
  "id": "/subscriptions/0000/resourceGroups/$group/providers/Microsoft.DBforPostgreSQL/flexibleServers/$name/firewallRules/$rule",
  "name": "$rule",
  "resourceGroup": "$group",
  "startIpAddress": "${start:-0.0.0.0}",
  "type": "Microsoft.DBforPostgreSQL/flexibleServers/firewallRules"
}
EOF
            ;;
        esac
        ;;
    esac
    ;;
esac
"##;

/// Provider wired to a fresh copy of the fake az
fn fake_az() -> (TempDir, AzureProvider) {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("az");
    fs::write(&script, FAKE_AZ).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let az = Az::with_program(script.to_string_lossy().into_owned());
    (dir, AzureProvider::with_az(az))
}

fn calls(dir: &TempDir) -> Vec<String> {
    fs::read_to_string(dir.path().join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn server(name: &str) -> ResolvedResource {
    ResolvedResource {
        key: "flexible-server:postgres".to_string(),
        resource_type: FLEXIBLE_SERVER.to_string(),
        name: name.to_string(),
        inputs: json!({
            "resource_group_name": "example5d1e2f3a",
            "location": "eastus",
            "availability_zone": "1",
            "version": "15",
            "administrator_login": "postgres",
            "administrator_login_password": "pA5!word1234abcd",
            "backup": { "backup_retention_days": 7 },
            "sku": { "tier": "GeneralPurpose", "name": "Standard_D2ds_v4" },
            "storage": { "storage_size_gb": 32 },
        }),
    }
}

#[tokio::test]
#[serial]
async fn test_create_server_reads_the_server_back() {
    let (dir, provider) = fake_az();

    let state = provider.create(&server("postgrescb617a17")).await.unwrap();

    assert_eq!(state.id, "postgrescb617a17");
    assert_eq!(state.status, ResourceStatus::Running);
    assert_eq!(
        state.get_attribute::<String>("name").unwrap(),
        "postgrescb617a17"
    );
    assert_eq!(
        state
            .get_attribute::<String>("fully_qualified_domain_name")
            .unwrap(),
        "postgrescb617a17.postgres.database.azure.com"
    );
    assert_eq!(
        state.get_attribute::<String>("resource_group_name").unwrap(),
        "example5d1e2f3a"
    );

    let calls = calls(&dir);
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("postgres flexible-server create"));
    assert!(calls[1].starts_with("postgres flexible-server show"));
}

#[tokio::test]
#[serial]
async fn test_read_server_maps_not_found_to_none() {
    let (_dir, provider) = fake_az();

    let created = provider.create(&server("postgrescb617a17")).await.unwrap();
    let live = provider.read(&created).await.unwrap().unwrap();
    assert_eq!(live.get_attribute::<String>("state").unwrap(), "Ready");

    let gone = ResourceState::new("postgresmissing", FLEXIBLE_SERVER)
        .with_attribute("resource_group_name", json!("example5d1e2f3a"));
    assert!(provider.read(&gone).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_update_server() {
    let (dir, provider) = fake_az();

    let created = provider.create(&server("postgrescb617a17")).await.unwrap();
    let updated = provider
        .update(&created, &server("postgrescb617a17"))
        .await
        .unwrap();

    assert_eq!(updated.status, ResourceStatus::Running);
    assert_eq!(
        updated
            .get_attribute::<String>("fully_qualified_domain_name")
            .unwrap(),
        "postgrescb617a17.postgres.database.azure.com"
    );
    assert!(
        calls(&dir)
            .iter()
            .any(|c| c.starts_with("postgres flexible-server update"))
    );
}

#[tokio::test]
#[serial]
async fn test_delete_server_recorded_without_attributes() {
    let (dir, provider) = fake_az();

    // What the engine records when a create fails part way
    let mut placeholder = ResourceState::new("postgresmissing", FLEXIBLE_SERVER)
        .with_status(ResourceStatus::Error);
    placeholder.inputs = server("postgresmissing").inputs;

    provider.delete(&placeholder).await.unwrap();

    let calls = calls(&dir);
    assert!(calls[0].starts_with("postgres flexible-server delete"));
    assert!(calls[0].contains("--resource-group example5d1e2f3a"));
}

#[tokio::test]
#[serial]
async fn test_resource_group_create_and_read() {
    let (_dir, provider) = fake_az();
    let group = ResolvedResource {
        key: "resource-group:example".to_string(),
        resource_type: RESOURCE_GROUP.to_string(),
        name: "example5d1e2f3a".to_string(),
        inputs: json!({ "location": "eastus" }),
    };

    let state = provider.create(&group).await.unwrap();
    assert_eq!(state.id, "example5d1e2f3a");
    assert_eq!(state.get_attribute::<String>("name").unwrap(), "example5d1e2f3a");
    assert_eq!(state.get_attribute::<String>("location").unwrap(), "eastus");

    assert!(provider.read(&state).await.unwrap().is_some());

    let gone = ResourceState::new("examplemissing", RESOURCE_GROUP);
    assert!(provider.read(&gone).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_firewall_rule_create_and_read() {
    let (dir, provider) = fake_az();
    let rule = ResolvedResource {
        key: "firewall-rule:allow-all".to_string(),
        resource_type: FIREWALL_RULE.to_string(),
        name: "allow-all0f1e2d3c".to_string(),
        inputs: json!({
            "resource_group_name": "example5d1e2f3a",
            "server_name": "postgrescb617a17",
            "start_ip_address": "0.0.0.0",
            "end_ip_address": "255.255.255.255",
        }),
    };

    let state = provider.create(&rule).await.unwrap();
    assert_eq!(state.id, "allow-all0f1e2d3c");
    assert_eq!(
        state.get_attribute::<String>("server_name").unwrap(),
        "postgrescb617a17"
    );
    assert_eq!(
        state.get_attribute::<String>("start_ip_address").unwrap(),
        "0.0.0.0"
    );
    assert_eq!(
        state.get_attribute::<String>("end_ip_address").unwrap(),
        "255.255.255.255"
    );

    let live = provider.read(&state).await.unwrap().unwrap();
    assert_eq!(live.get_attribute::<String>("name").unwrap(), "allow-all0f1e2d3c");
    assert!(calls(&dir)[1].starts_with("postgres flexible-server firewall-rule show"));
}
