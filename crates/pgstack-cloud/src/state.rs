//! State management for cloud resources
//!
//! Manages the `.pgstack/stacks/<stack>/state.json` file which tracks the
//! current state of every resource of a stack and the outputs it exports.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".pgstack";
const STACKS_DIR: &str = "stacks";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_TMP: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";

/// Age after which a lock left behind by a crashed run is taken over
pub const LOCK_TIMEOUT_HOURS: i64 = 1;

/// State of a whole stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by type:id
    pub resources: HashMap<String, ResourceState>,

    /// Exported stack outputs
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputValue>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: HashMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a resource
    pub fn set_resource(&mut self, key: String, state: ResourceState) {
        self.resources.insert(key, state);
        self.updated_at = Utc::now();
    }

    /// Remove a resource
    pub fn remove_resource(&mut self, key: &str) -> Option<ResourceState> {
        let result = self.resources.remove(key);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Get a resource by key
    pub fn get_resource(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }

    /// Look up an output attribute of a resource
    pub fn output_of(&self, key: &str, output: &str) -> Option<serde_json::Value> {
        self.resources
            .get(key)
            .and_then(|r| r.attributes.get(output))
            .cloned()
    }
}

/// An exported stack output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    pub value: serde_json::Value,

    /// Masked unless explicitly requested
    #[serde(default)]
    pub secret: bool,
}

impl OutputValue {
    /// Display form, masking secrets unless `show_secrets` is set
    pub fn display(&self, show_secrets: bool) -> String {
        if self.secret && !show_secrets {
            return "[secret]".to_string();
        }
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Provider-specific resource ID (physical name)
    pub id: String,

    /// Resource type
    pub resource_type: String,

    /// Provider that manages the resource
    #[serde(default)]
    pub provider: String,

    /// Current status
    pub status: ResourceStatus,

    /// Resolved inputs the resource was last applied with
    #[serde(default)]
    pub inputs: serde_json::Value,

    /// Resource outputs (name, FQDN, generated values, etc.)
    pub attributes: HashMap<String, serde_json::Value>,

    /// Keys of resources this one depended on when applied
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            provider: String::new(),
            status: ResourceStatus::Unknown,
            inputs: serde_json::Value::Null,
            attributes: HashMap::new(),
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Accepted by the provider but not ready yet
    Creating,
    Running,
    /// Created but could not be read back; replaced on the next apply
    Error,
    Unknown,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceStatus::Creating => "creating",
            ResourceStatus::Running => "running",
            ResourceStatus::Error => "error",
            ResourceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Reads and writes the state file of one stack
///
/// Layout under the project root:
///
/// ```text
/// .pgstack/stacks/<stack>/state.json
/// .pgstack/stacks/<stack>/state.json.backup
/// .pgstack/stacks/<stack>/lock.json
/// ```
pub struct StateManager {
    project_root: PathBuf,
    stack: String,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>, stack: impl Into<String>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            stack: stack.into(),
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.project_root
            .join(STATE_DIR)
            .join(STACKS_DIR)
            .join(&self.stack)
    }

    fn file(&self, name: &str) -> PathBuf {
        self.state_dir().join(name)
    }

    /// Load the stack state; a missing file is an empty state
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.file(STATE_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(stack = %self.stack, "No state file yet");
                return Ok(GlobalState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: GlobalState = serde_json::from_str(&content)?;
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "{} was written by a newer pgstack (state version {}, supported {})",
                path.display(),
                state.version,
                STATE_VERSION
            )));
        }

        tracing::debug!(
            stack = %self.stack,
            resources = state.resources.len(),
            "Loaded state"
        );
        Ok(state)
    }

    /// Write the state, keeping the previous file as a backup
    ///
    /// The new content goes to a temporary file first and is renamed into
    /// place, so a crash never leaves a truncated state file.
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        fs::create_dir_all(self.state_dir()).await?;

        let path = self.file(STATE_FILE);
        let tmp = self.file(STATE_TMP);
        fs::write(&tmp, serde_json::to_string_pretty(state)?).await?;

        if fs::try_exists(&path).await? {
            fs::copy(&path, self.file(STATE_BACKUP)).await?;
        }
        fs::rename(&tmp, &path).await?;

        tracing::debug!(
            stack = %self.stack,
            resources = state.resources.len(),
            "Saved state"
        );
        Ok(())
    }

    /// Take the stack lock
    ///
    /// Fails with `LockError` while another holder's lock is younger than
    /// [`LOCK_TIMEOUT_HOURS`]; older locks are taken over.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        fs::create_dir_all(self.state_dir()).await?;
        let lock_path = self.file(LOCK_FILE);

        if let Some(existing) = read_lock(&lock_path).await? {
            let age = Utc::now().signed_duration_since(existing.acquired_at);
            if age.num_hours() < LOCK_TIMEOUT_HOURS {
                return Err(CloudError::LockError(format!(
                    "stack '{}' is locked by {} (pid {}) since {}",
                    self.stack, existing.holder, existing.pid, existing.acquired_at
                )));
            }
            tracing::warn!(
                holder = %existing.holder,
                acquired_at = %existing.acquired_at,
                "Taking over stale state lock"
            );
            fs::remove_file(&lock_path).await?;
        }

        let info = LockInfo {
            holder: hostname(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CloudError::LockError(format!(
                    "stack '{}' was locked concurrently",
                    self.stack
                )));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(serde_json::to_string_pretty(&info)?.as_bytes())
            .await?;

        tracing::debug!(stack = %self.stack, "State lock acquired");
        Ok(StateLock {
            path: Some(lock_path),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    #[serde(default)]
    pid: u32,
    acquired_at: DateTime<Utc>,
}

async fn read_lock(path: &Path) -> Result<Option<LockInfo>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Held stack lock; removed on release or drop
pub struct StateLock {
    path: Option<PathBuf>,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if let Some(path) = self.path.take() {
            match fs::remove_file(&path).await {
                Ok(()) => tracing::debug!("State lock released"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
