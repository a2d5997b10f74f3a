use async_trait::async_trait;
use pgstack_cloud::{
    ActionType, AuthStatus, CloudError, CloudProvider, Engine, GlobalState, OutputRef,
    RandomProvider, ResolvedResource, ResourceConfig, ResourceSet, ResourceState, ResourceStatus,
    RetryConfig, StateManager,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// In-memory provider with a group/server/rule hierarchy
#[derive(Clone, Default)]
struct FakeProvider {
    calls: Arc<Mutex<Vec<String>>>,
    fail_create: Option<&'static str>,
    unreadable: Option<&'static str>,
}

impl FakeProvider {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CloudProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn display_name(&self) -> &str {
        "Fake"
    }

    fn resource_types(&self) -> &[&'static str] {
        &["group", "server", "rule"]
    }

    fn replace_triggers(&self, resource_type: &str) -> &[&'static str] {
        match resource_type {
            "server" => &["location", "version"],
            _ => &["location"],
        }
    }

    fn autonamed(&self, _resource_type: &str) -> bool {
        true
    }

    async fn check_auth(&self) -> pgstack_cloud::Result<AuthStatus> {
        Ok(AuthStatus::ok("fake"))
    }

    async fn create(&self, resource: &ResolvedResource) -> pgstack_cloud::Result<ResourceState> {
        self.log(format!("create {}", resource.key));
        if self.fail_create == Some(resource.resource_type.as_str()) {
            return Err(CloudError::ApiError("quota exceeded".into()));
        }
        Ok(ResourceState::new(resource.name.clone(), resource.resource_type.clone())
            .with_status(ResourceStatus::Running)
            .with_attribute("name", json!(resource.name))
            .with_attribute("fqdn", json!(format!("{}.example.test", resource.name))))
    }

    async fn read(&self, current: &ResourceState) -> pgstack_cloud::Result<Option<ResourceState>> {
        if self.unreadable == Some(current.resource_type.as_str()) {
            return Ok(None);
        }
        Ok(Some(current.clone()))
    }

    async fn update(
        &self,
        current: &ResourceState,
        resource: &ResolvedResource,
    ) -> pgstack_cloud::Result<ResourceState> {
        self.log(format!("update {}", resource.key));
        Ok(current.clone())
    }

    async fn delete(&self, current: &ResourceState) -> pgstack_cloud::Result<()> {
        self.log(format!("delete {}", current.resource_type));
        Ok(())
    }
}

fn desired(version: &str, with_rule: bool) -> ResourceSet {
    let mut set = ResourceSet::new();
    set.add(ResourceConfig::new(
        "random-password",
        "admin",
        "random",
        json!({"length": 16, "min_lower": 1, "min_upper": 1, "min_numeric": 1, "min_special": 1}),
    ));
    set.add(ResourceConfig::new("group", "example", "fake", json!({"location": "eastus"})));
    set.add(ResourceConfig::new(
        "server",
        "postgres",
        "fake",
        json!({
            "group": OutputRef::new("group:example", "name").to_value(),
            "password": OutputRef::new("random-password:admin", "result").to_value(),
            "version": version,
        }),
    ));
    if with_rule {
        set.add(ResourceConfig::new(
            "rule",
            "allow-all",
            "fake",
            json!({
                "server": OutputRef::new("server:postgres", "name").to_value(),
                "start": "0.0.0.0",
                "end": "255.255.255.255",
            }),
        ));
    }
    set.export("fqdn", OutputRef::new("server:postgres", "fqdn"));
    set.export("password", OutputRef::new("random-password:admin", "result"));
    set
}

fn engine(fake: &FakeProvider) -> Engine {
    Engine::new()
        .with_provider(fake.clone())
        .with_provider(RandomProvider::new())
        .with_retry(RetryConfig::immediate(2))
}

async fn up(engine: &Engine, set: &ResourceSet, store: &StateManager) -> GlobalState {
    let mut state = store.load().await.unwrap();
    let plan = engine.plan(set, &state).unwrap();
    let result = engine.apply(set, &plan, &mut state, store).await.unwrap();
    assert!(result.is_success(), "apply failed: {:?}", result.failed);
    state
}

#[tokio::test]
async fn test_first_plan_creates_in_dependency_order() {
    let fake = FakeProvider::default();
    let plan = engine(&fake)
        .plan(&desired("15", true), &GlobalState::new())
        .unwrap();

    let order: Vec<&str> = plan.actions.iter().map(|a| a.resource_id.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "group:example",
            "random-password:admin",
            "server:postgres",
            "rule:allow-all"
        ]
    );
    assert_eq!(plan.summary().create, 4);
}

#[tokio::test]
async fn test_second_plan_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let fake = FakeProvider::default();
    let engine = engine(&fake);
    let set = desired("15", true);

    let state = up(&engine, &set, &store).await;
    let password = state.outputs["password"].clone();
    assert!(password.secret);
    assert!(state.outputs["fqdn"].value.as_str().unwrap().starts_with("postgres"));

    let reloaded = store.load().await.unwrap();
    let plan = engine.plan(&set, &reloaded).unwrap();
    assert!(!plan.has_changes, "unexpected changes: {:?}", plan.actions);

    // Applying the empty plan keeps the generated password
    let state = up(&engine, &set, &store).await;
    assert_eq!(state.outputs["password"], password);
}

#[tokio::test]
async fn test_version_change_replaces_server_and_dependents() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let fake = FakeProvider::default();
    let engine = engine(&fake);

    let state = up(&engine, &desired("14", true), &store).await;
    let plan = engine.plan(&desired("15", true), &state).unwrap();

    let server = plan.action_for("server:postgres").unwrap();
    assert_eq!(server.action_type, ActionType::Replace);
    assert_eq!(server.changed, vec!["version"]);

    // The rule points at the server name, which is unknown until the replace
    let rule = plan.action_for("rule:allow-all").unwrap();
    assert_eq!(rule.action_type, ActionType::Update);
    assert_eq!(
        plan.action_for("group:example").unwrap().action_type,
        ActionType::NoOp
    );
}

#[tokio::test]
async fn test_removed_resource_is_deleted_first() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let fake = FakeProvider::default();
    let engine = engine(&fake);

    let state = up(&engine, &desired("15", true), &store).await;
    let plan = engine.plan(&desired("15", false), &state).unwrap();

    assert_eq!(plan.summary().delete, 1);
    assert_eq!(plan.actions[0].action_type, ActionType::Delete);
    assert_eq!(plan.actions[0].resource_id, "rule:allow-all");

    let state = up(&engine, &desired("15", false), &store).await;
    assert!(state.get_resource("rule:allow-all").is_none());
}

#[tokio::test]
async fn test_failed_create_skips_dependents() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let fake = FakeProvider {
        fail_create: Some("server"),
        ..Default::default()
    };
    let engine = engine(&fake);
    let set = desired("15", true);

    let mut state = GlobalState::new();
    let plan = engine.plan(&set, &state).unwrap();
    let result = engine.apply(&set, &plan, &mut state, &store).await.unwrap();

    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.skipped, vec!["create-rule:allow-all"]);
    assert!(!fake.calls().contains(&"create rule:allow-all".to_string()));
    assert!(state.get_resource("group:example").is_some());
    assert!(!state.outputs.contains_key("fqdn"));
}

#[tokio::test]
async fn test_failed_create_is_recorded_and_replaced() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let failing = FakeProvider {
        fail_create: Some("server"),
        ..Default::default()
    };
    let set = desired("15", false);

    let mut state = GlobalState::new();
    let plan = engine(&failing).plan(&set, &state).unwrap();
    engine(&failing)
        .apply(&set, &plan, &mut state, &store)
        .await
        .unwrap();

    let server = state.get_resource("server:postgres").unwrap();
    assert_eq!(server.status, ResourceStatus::Error);
    assert!(server.id.starts_with("postgres"));
    assert_eq!(server.inputs["version"], "15");

    // The recorded entry survives a reload and is replaced, not created again
    let reloaded = store.load().await.unwrap();
    let healthy = FakeProvider::default();
    let plan = engine(&healthy).plan(&set, &reloaded).unwrap();
    assert_eq!(
        plan.action_for("server:postgres").unwrap().action_type,
        ActionType::Replace
    );
    assert_eq!(plan.summary().create, 0);

    let state = up(&engine(&healthy), &set, &store).await;
    assert_eq!(
        state.get_resource("server:postgres").unwrap().status,
        ResourceStatus::Running
    );
    assert_eq!(
        healthy.calls(),
        vec!["delete server", "create server:postgres"]
    );
}

#[tokio::test]
async fn test_unreadable_create_is_recorded_and_replaced() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let fake = FakeProvider {
        unreadable: Some("server"),
        ..Default::default()
    };
    let engine = engine(&fake);
    let set = desired("15", false);

    let mut state = GlobalState::new();
    let plan = engine.plan(&set, &state).unwrap();
    let result = engine.apply(&set, &plan, &mut state, &store).await.unwrap();

    assert!(
        result.failed[0]
            .error
            .as_deref()
            .unwrap()
            .contains("partially created")
    );
    let server = state.get_resource("server:postgres").unwrap();
    assert_eq!(server.status, ResourceStatus::Error);

    let plan = engine.plan(&set, &state).unwrap();
    assert_eq!(
        plan.action_for("server:postgres").unwrap().action_type,
        ActionType::Replace
    );
}

#[tokio::test]
async fn test_destroy_removes_everything_in_reverse_order() {
    let dir = TempDir::new().unwrap();
    let store = StateManager::new(dir.path(), "dev");
    let fake = FakeProvider::default();
    let engine = engine(&fake);

    let mut state = up(&engine, &desired("15", true), &store).await;
    let result = engine.destroy(&mut state, &store).await.unwrap();

    assert!(result.is_success());
    assert!(state.resources.is_empty());
    assert!(state.outputs.is_empty());

    let deletes: Vec<String> = fake
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("delete"))
        .collect();
    assert_eq!(deletes, vec!["delete rule", "delete server", "delete group"]);
}

#[tokio::test]
async fn test_unknown_provider_is_rejected() {
    let mut set = ResourceSet::new();
    set.add(ResourceConfig::new("bucket", "logs", "aws", json!({})));
    assert!(matches!(
        Engine::new().plan(&set, &GlobalState::new()),
        Err(CloudError::ProviderNotFound(_))
    ));
}
