//! Plan/apply engine
//!
//! The engine diffs a desired [`ResourceSet`] against the recorded
//! [`GlobalState`], then walks the dependency graph and drives the
//! providers. References between resources are resolved from the outputs
//! recorded in state as the walk progresses.

use crate::action::{Action, ActionType, ApplyResult, Plan};
use crate::error::{CloudError, Result};
use crate::graph::topological_order;
use crate::provider::{CloudProvider, ResolvedResource, ResourceConfig, ResourceSet, RetryConfig};
use crate::reference::{OutputRef, resolve};
use crate::state::{GlobalState, OutputValue, ResourceState, ResourceStatus, StateManager};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

const NAME_SUFFIX_LEN: usize = 8;
const HEX: &[u8] = b"0123456789abcdef";

/// Physical name for an autonamed resource: logical name plus a random suffix
pub fn physical_name(logical: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..NAME_SUFFIX_LEN)
        .map(|_| char::from(HEX[rng.gen_range(0..HEX.len())]))
        .collect();
    format!("{}{}", logical, suffix)
}

/// Drives providers to converge recorded state onto a desired resource set
pub struct Engine {
    providers: HashMap<String, Arc<dyn CloudProvider>>,
    retry: RetryConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            retry: RetryConfig::default(),
        }
    }

    /// Register a provider under its name
    pub fn with_provider(mut self, provider: impl CloudProvider + 'static) -> Self {
        self.providers
            .insert(provider.name().to_string(), Arc::new(provider));
        self
    }

    /// Retry policy for the read-back after create
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn CloudProvider>> {
        self.providers.values()
    }

    fn provider(&self, name: &str) -> Result<&Arc<dyn CloudProvider>> {
        self.providers
            .get(name)
            .ok_or_else(|| CloudError::ProviderNotFound(name.to_string()))
    }

    /// Compute the actions that bring `state` to `desired`
    ///
    /// Actions are returned in execution order: deletions of resources no
    /// longer declared come first (dependents before dependencies), followed
    /// by every declared resource in dependency order.
    pub fn plan(&self, desired: &ResourceSet, state: &GlobalState) -> Result<Plan> {
        let order = desired_order(desired)?;
        for resource in desired.iter() {
            self.provider(&resource.provider)?;
        }

        let mut actions = delete_actions(desired, state)?;

        // Resources whose outputs are unknown until this plan is applied
        let mut pending: BTreeSet<String> = BTreeSet::new();

        for key in &order {
            let Some(resource) = desired.get_by_key(key) else {
                continue;
            };
            let action = match state.get_resource(key) {
                None => Action::new(
                    ActionType::Create,
                    &resource.resource_type,
                    key,
                    format!("create {}", key),
                ),
                Some(current) if current.status == ResourceStatus::Error => Action::new(
                    ActionType::Replace,
                    &resource.resource_type,
                    key,
                    format!("replace {} (left in error state by a previous run)", key),
                ),
                Some(current) => {
                    let changed = changed_fields(resource, current, state, &pending);
                    let triggers = self
                        .provider(&resource.provider)?
                        .replace_triggers(&resource.resource_type);

                    if changed.is_empty() {
                        Action::new(
                            ActionType::NoOp,
                            &resource.resource_type,
                            key,
                            format!("{} is up to date", key),
                        )
                    } else if changed.iter().any(|f| triggers.contains(&f.as_str())) {
                        Action::new(
                            ActionType::Replace,
                            &resource.resource_type,
                            key,
                            format!("replace {} ({} changed)", key, changed.join(", ")),
                        )
                        .with_changed(changed)
                    } else {
                        Action::new(
                            ActionType::Update,
                            &resource.resource_type,
                            key,
                            format!("update {} ({} changed)", key, changed.join(", ")),
                        )
                        .with_changed(changed)
                    }
                }
            };

            if action.action_type.creates() {
                pending.insert(key.clone());
            }
            actions.push(action.with_detail("provider", serde_json::json!(resource.provider)));
        }

        Ok(Plan::new(actions))
    }

    /// Execute `plan`, saving state after every action
    ///
    /// A failed action does not abort the run; resources depending on it are
    /// skipped. Stack outputs are refreshed at the end.
    pub async fn apply(
        &self,
        desired: &ResourceSet,
        plan: &Plan,
        state: &mut GlobalState,
        store: &StateManager,
    ) -> Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();
        let mut failed: BTreeSet<String> = BTreeSet::new();

        for action in &plan.actions {
            if action.action_type == ActionType::NoOp {
                continue;
            }

            let key = &action.resource_id;
            let resource = desired.get_by_key(key);

            let blocked = resource
                .map(|r| r.depends_on.iter().any(|d| failed.contains(d)))
                .unwrap_or(false);
            if blocked {
                tracing::warn!("Skipping {}: a dependency failed", key);
                failed.insert(key.clone());
                result.add_skipped(action.id.clone());
                continue;
            }

            tracing::info!("{} {}", action.action_type, key);
            let outcome = match (action.action_type, resource) {
                (ActionType::Delete, _) => self.delete(key, state).await,
                (_, None) => Err(CloudError::ResourceNotFound(key.clone())),
                (ActionType::Create, Some(resource)) => self.create(resource, state).await,
                (ActionType::Replace, Some(resource)) => {
                    match self.delete(key, state).await {
                        Ok(()) => {
                            store.save(state).await?;
                            self.create(resource, state).await
                        }
                        Err(e) => Err(e),
                    }
                }
                (ActionType::Update, Some(resource)) => self.update(resource, state).await,
                (ActionType::NoOp, Some(_)) => Ok(()),
            };

            match outcome {
                Ok(()) => {
                    result.add_success(action.id.clone(), action.description.clone());
                }
                Err(e) => {
                    tracing::error!("{} {} failed: {}", action.action_type, key, e);
                    failed.insert(key.clone());
                    result.add_failure(action.id.clone(), e.to_string());
                }
            }
            store.save(state).await?;
        }

        state.outputs = self.resolve_exports(desired, state);
        store.save(state).await?;

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Delete every resource recorded in `state`, dependents first
    pub async fn destroy(
        &self,
        state: &mut GlobalState,
        store: &StateManager,
    ) -> Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        let nodes: BTreeMap<String, Vec<String>> = state
            .resources
            .iter()
            .map(|(k, r)| (k.clone(), r.dependencies.clone()))
            .collect();
        let mut order = topological_order(&nodes, false)?;
        order.reverse();

        for key in order {
            let action_id = format!("{}-{}", ActionType::Delete, key);
            tracing::info!("delete {}", key);
            match self.delete(&key, state).await {
                Ok(()) => result.add_success(action_id, format!("deleted {}", key)),
                Err(e) => {
                    tracing::error!("delete {} failed: {}", key, e);
                    result.add_failure(action_id, e.to_string());
                }
            }
            store.save(state).await?;
        }

        if result.failed.is_empty() {
            state.outputs.clear();
            store.save(state).await?;
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Resolve every reference in `resource` against recorded outputs
    fn resolve_inputs(
        &self,
        resource: &ResourceConfig,
        state: &GlobalState,
    ) -> Result<serde_json::Value> {
        resolve(&resource.config, &|r: &OutputRef| {
            state.output_of(&r.resource, &r.output)
        })
        .map_err(|r| CloudError::UnresolvedReference {
            resource: r.resource,
            output: r.output,
        })
    }

    async fn create(&self, resource: &ResourceConfig, state: &mut GlobalState) -> Result<()> {
        let provider = self.provider(&resource.provider)?;
        let key = resource.key();
        let inputs = self.resolve_inputs(resource, state)?;

        let name = if provider.autonamed(&resource.resource_type) {
            physical_name(&resource.id)
        } else {
            resource.id.clone()
        };
        let resolved = ResolvedResource {
            key: key.clone(),
            resource_type: resource.resource_type.clone(),
            name,
            inputs: inputs.clone(),
        };

        let created = match provider.create(&resolved).await {
            Ok(created) => created,
            Err(e) => {
                // The provider may have started provisioning before failing
                let placeholder =
                    ResourceState::new(resolved.name.clone(), resource.resource_type.clone());
                state.set_resource(
                    key,
                    record(placeholder, resource, inputs, ResourceStatus::Error),
                );
                return Err(e);
            }
        };

        match self.read_back(provider.as_ref(), &created).await {
            Ok(live) => {
                state.set_resource(key, record(live, resource, inputs, ResourceStatus::Running));
                Ok(())
            }
            Err(reason) => {
                state.set_resource(
                    key.clone(),
                    record(created, resource, inputs, ResourceStatus::Error),
                );
                Err(CloudError::PartiallyCreated {
                    key,
                    reason: reason.to_string(),
                })
            }
        }
    }

    async fn update(&self, resource: &ResourceConfig, state: &mut GlobalState) -> Result<()> {
        let provider = self.provider(&resource.provider)?;
        let key = resource.key();
        let current = state
            .get_resource(&key)
            .cloned()
            .ok_or_else(|| CloudError::ResourceNotFound(key.clone()))?;
        let inputs = self.resolve_inputs(resource, state)?;

        let resolved = ResolvedResource {
            key: key.clone(),
            resource_type: resource.resource_type.clone(),
            name: current.id.clone(),
            inputs: inputs.clone(),
        };
        let mut updated = provider.update(&current, &resolved).await?;
        updated.created_at = current.created_at;

        state.set_resource(key, record(updated, resource, inputs, ResourceStatus::Running));
        Ok(())
    }

    async fn delete(&self, key: &str, state: &mut GlobalState) -> Result<()> {
        let Some(current) = state.get_resource(key).cloned() else {
            return Ok(());
        };
        let provider = self.provider(&current.provider)?;
        provider.delete(&current).await?;
        state.remove_resource(key);
        Ok(())
    }

    /// Read a freshly created resource back, retrying with backoff
    async fn read_back(
        &self,
        provider: &dyn CloudProvider,
        created: &ResourceState,
    ) -> Result<ResourceState> {
        let attempts = self.retry.max_attempts.max(1);
        let mut delay = self.retry.initial_delay;
        let mut last_error = CloudError::ResourceNotFound(created.id.clone());

        for attempt in 1..=attempts {
            match provider.read(created).await {
                Ok(Some(live)) => return Ok(live),
                Ok(None) => last_error = CloudError::ResourceNotFound(created.id.clone()),
                Err(e) => last_error = e,
            }

            if attempt < attempts {
                tracing::warn!(
                    "Read-back of {} failed (attempt {}/{}): {}",
                    created.id,
                    attempt,
                    attempts,
                    last_error
                );
                tokio::time::sleep(delay).await;
                delay = self.retry.next_delay(delay);
            }
        }

        Err(last_error)
    }

    /// Resolve stack exports from recorded outputs; unresolved exports are
    /// left out.
    fn resolve_exports(
        &self,
        desired: &ResourceSet,
        state: &GlobalState,
    ) -> BTreeMap<String, OutputValue> {
        desired
            .exports
            .iter()
            .filter_map(|(name, r)| {
                let value = state.output_of(&r.resource, &r.output)?;
                let secret = desired
                    .get_by_key(&r.resource)
                    .and_then(|res| self.provider(&res.provider).ok().map(|p| (res, p)))
                    .map(|(res, p)| {
                        p.secret_outputs(&res.resource_type)
                            .contains(&r.output.as_str())
                    })
                    .unwrap_or(false);
                Some((name.clone(), OutputValue { value, secret }))
            })
            .collect()
    }
}

/// Attach engine bookkeeping to a provider result
fn record(
    mut live: ResourceState,
    resource: &ResourceConfig,
    inputs: serde_json::Value,
    status: ResourceStatus,
) -> ResourceState {
    live.provider = resource.provider.clone();
    live.resource_type = resource.resource_type.clone();
    live.inputs = inputs;
    live.dependencies = resource.depends_on.clone();
    live.status = status;
    live
}

fn desired_order(desired: &ResourceSet) -> Result<Vec<String>> {
    let nodes: BTreeMap<String, Vec<String>> = desired
        .resources
        .iter()
        .map(|(k, r)| (k.clone(), r.depends_on.clone()))
        .collect();
    topological_order(&nodes, true)
}

/// Deletions for recorded resources that are no longer declared
fn delete_actions(desired: &ResourceSet, state: &GlobalState) -> Result<Vec<Action>> {
    let nodes: BTreeMap<String, Vec<String>> = state
        .resources
        .iter()
        .map(|(k, r)| (k.clone(), r.dependencies.clone()))
        .collect();
    let mut order = topological_order(&nodes, false)?;
    order.reverse();

    Ok(order
        .into_iter()
        .filter(|key| desired.get_by_key(key).is_none())
        .filter_map(|key| {
            let current = state.get_resource(&key)?;
            Some(
                Action::new(
                    ActionType::Delete,
                    &current.resource_type,
                    &key,
                    format!("delete {} (no longer declared)", key),
                )
                .with_detail("provider", serde_json::json!(current.provider)),
            )
        })
        .collect())
}

/// Top-level input fields of `resource` that differ from what was applied
///
/// A field referencing a resource in `pending`, or an output that is not
/// recorded, counts as changed.
fn changed_fields(
    resource: &ResourceConfig,
    current: &ResourceState,
    state: &GlobalState,
    pending: &BTreeSet<String>,
) -> Vec<String> {
    let empty = serde_json::Map::new();
    let desired = resource.config.as_object().unwrap_or(&empty);
    let applied = current.inputs.as_object().unwrap_or(&empty);

    let lookup = |r: &OutputRef| {
        if pending.contains(&r.resource) {
            None
        } else {
            state.output_of(&r.resource, &r.output)
        }
    };

    let fields: BTreeSet<&String> = desired.keys().chain(applied.keys()).collect();
    fields
        .into_iter()
        .filter(|field| {
            let want = desired.get(*field).unwrap_or(&serde_json::Value::Null);
            let have = applied.get(*field).unwrap_or(&serde_json::Value::Null);
            match resolve(want, &lookup) {
                Ok(value) => &value != have,
                Err(_) => true,
            }
        })
        .map(|field| field.to_string())
        .collect()
}
