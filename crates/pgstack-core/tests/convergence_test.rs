//! Declared topologies driven through the engine against an in-memory Azure

use async_trait::async_trait;
use pgstack_cloud::{
    ActionType, AuthStatus, CloudProvider, Engine, GlobalState, RandomProvider, ResolvedResource,
    ResourceState, ResourceStatus, RetryConfig, StateManager,
};
use pgstack_core::{Revision, StackConfig, declare_topology};
use serde_json::json;
use tempfile::TempDir;

/// Stands in for `azure-native` and echoes its inputs back as outputs
struct InMemoryAzure;

#[async_trait]
impl CloudProvider for InMemoryAzure {
    fn name(&self) -> &str {
        "azure-native"
    }

    fn display_name(&self) -> &str {
        "In-memory Azure"
    }

    fn resource_types(&self) -> &[&'static str] {
        &["resource-group", "flexible-server", "firewall-rule"]
    }

    fn replace_triggers(&self, resource_type: &str) -> &[&'static str] {
        match resource_type {
            "resource-group" => &["location"],
            "flexible-server" => &["location", "version", "availability_zone"],
            _ => &["server_name"],
        }
    }

    fn autonamed(&self, _resource_type: &str) -> bool {
        true
    }

    async fn check_auth(&self) -> pgstack_cloud::Result<AuthStatus> {
        Ok(AuthStatus::ok("test"))
    }

    async fn create(&self, resource: &ResolvedResource) -> pgstack_cloud::Result<ResourceState> {
        let mut state = ResourceState::new(resource.name.clone(), resource.resource_type.clone())
            .with_status(ResourceStatus::Running)
            .with_attribute("name", json!(resource.name))
            .with_attribute(
                "fully_qualified_domain_name",
                json!(format!("{}.postgres.database.azure.com", resource.name)),
            );
        if let Some(location) = resource.get::<String>("location") {
            state.set_attribute("location", json!(location));
        }
        Ok(state)
    }

    async fn read(&self, current: &ResourceState) -> pgstack_cloud::Result<Option<ResourceState>> {
        Ok(Some(current.clone()))
    }

    async fn update(
        &self,
        current: &ResourceState,
        _resource: &ResolvedResource,
    ) -> pgstack_cloud::Result<ResourceState> {
        Ok(current.clone())
    }

    async fn delete(&self, _current: &ResourceState) -> pgstack_cloud::Result<()> {
        Ok(())
    }
}

fn engine() -> Engine {
    Engine::new()
        .with_provider(InMemoryAzure)
        .with_provider(RandomProvider::new())
        .with_retry(RetryConfig::immediate(1))
}

fn config() -> StackConfig {
    StackConfig::default().with("example", "zone", "1")
}

async fn up(engine: &Engine, revision: Revision, store: &StateManager) -> GlobalState {
    let set = declare_topology(&config(), revision)
        .unwrap()
        .to_resource_set()
        .unwrap();
    let mut state = store.load().await.unwrap();
    let plan = engine.plan(&set, &state).unwrap();
    let result = engine.apply(&set, &plan, &mut state, store).await.unwrap();
    assert!(result.is_success(), "apply failed: {:?}", result.failed);
    state
}

#[tokio::test]
async fn test_reapplying_same_revision_has_no_changes() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let engine = engine();

    for revision in Revision::all() {
        let state = up(&engine, revision, &store).await;
        let set = declare_topology(&config(), revision)
            .unwrap()
            .to_resource_set()
            .unwrap();
        let plan = engine.plan(&set, &state).unwrap();
        assert!(!plan.has_changes, "{}: {:?}", revision, plan.actions);
    }
}

#[tokio::test]
async fn test_exports_after_up() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");

    let state = up(&engine(), Revision::V3, &store).await;

    let host = state.outputs["host"].value.as_str().unwrap().to_string();
    assert!(host.starts_with("postgres"));
    assert_eq!(host.len(), "postgres".len() + 8);
    assert_eq!(
        state.outputs["fqdn"].value,
        json!(format!("{}.postgres.database.azure.com", host))
    );

    let password = &state.outputs["password"];
    assert!(password.secret);
    assert_eq!(password.value.as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn test_password_survives_revision_changes() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let engine = engine();

    let first = up(&engine, Revision::V1, &store).await;
    let second = up(&engine, Revision::V2, &store).await;
    let third = up(&engine, Revision::V3, &store).await;

    assert_eq!(first.outputs["password"], second.outputs["password"]);
    assert_eq!(second.outputs["password"], third.outputs["password"]);
}

#[tokio::test]
async fn test_v3_to_v2_deletes_only_the_firewall_rule() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let engine = engine();

    let state = up(&engine, Revision::V3, &store).await;
    let set = declare_topology(&config(), Revision::V2)
        .unwrap()
        .to_resource_set()
        .unwrap();
    let plan = engine.plan(&set, &state).unwrap();

    let summary = plan.summary();
    assert_eq!(summary.delete, 1);
    assert_eq!(plan.actions[0].resource_id, "firewall-rule:allow-all");

    // v2 and v3 differ in the engine version as well
    let server = plan.action_for("flexible-server:postgres").unwrap();
    assert_eq!(server.action_type, ActionType::Replace);
    assert_eq!(server.changed, vec!["version"]);
}

#[tokio::test]
async fn test_v2_to_v3_replaces_server_and_adds_rule() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let engine = engine();

    let state = up(&engine, Revision::V2, &store).await;
    let set = declare_topology(&config(), Revision::V3)
        .unwrap()
        .to_resource_set()
        .unwrap();
    let plan = engine.plan(&set, &state).unwrap();

    let server = plan.action_for("flexible-server:postgres").unwrap();
    assert_eq!(server.action_type, ActionType::Replace);
    assert_eq!(
        plan.action_for("firewall-rule:allow-all").unwrap().action_type,
        ActionType::Create
    );
    assert_eq!(
        plan.action_for("resource-group:example").unwrap().action_type,
        ActionType::NoOp
    );
    assert_eq!(
        plan.action_for("random-password:postgres").unwrap().action_type,
        ActionType::NoOp
    );
}
