//! Action types for cloud resource management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a planned action for a cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "resource-group", "flexible-server")
    pub resource_type: String,

    /// Resource key (type:id)
    pub resource_id: String,

    /// Description of the action
    pub description: String,

    /// Input fields that differ from the recorded state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<String>,

    /// Additional details about the action
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let resource_id = resource_id.into();
        Self {
            id: format!("{}-{}", action_type, resource_id),
            action_type,
            resource_type: resource_type.into(),
            resource_id,
            description: description.into(),
            changed: Vec::new(),
            details: HashMap::new(),
        }
    }

    pub fn with_changed(mut self, changed: Vec<String>) -> Self {
        self.changed = changed;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// Delete the existing resource and create a new one
    Replace,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl ActionType {
    /// Whether the action produces new provider outputs
    pub fn creates(&self) -> bool {
        matches!(self, ActionType::Create | ActionType::Replace)
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Actions not attempted because a dependency failed
    pub skipped: Vec<String>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }

    pub fn add_skipped(&mut self, action_id: String) {
        self.skipped.push(action_id);
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied, in execution order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Find the action planned for a resource key
    pub fn action_for(&self, resource_id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.resource_id == resource_id)
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            replace: self.actions_by_type(ActionType::Replace).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}
