//! Stack configuration

use crate::error::{Result, StackError};
use std::collections::BTreeMap;

/// Stack used when the file does not name one
pub const DEFAULT_STACK: &str = "dev";

/// Namespaced key/value configuration of one stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    pub name: String,
    values: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STACK)
    }
}

impl StackConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(
        mut self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set(namespace, key, value);
        self
    }

    pub fn set(
        &mut self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.values
            .entry(namespace.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Look up a value; empty strings count as absent
    pub fn get(&self, namespace: &str, key: &str) -> Option<&str> {
        self.values
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, namespace: &str, key: &str) -> Result<&str> {
        self.get(namespace, key)
            .ok_or_else(|| StackError::MissingConfig {
                namespace: namespace.to_string(),
                key: key.to_string(),
            })
    }

    /// Every (namespace, key) pair present
    pub fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .flat_map(|(ns, keys)| keys.keys().map(move |k| (ns.as_str(), k.as_str())))
    }

    /// Apply `PGSTACK_<NAMESPACE>_<KEY>` overrides for `known` keys and for
    /// every key already present
    pub fn apply_overrides<F>(&mut self, known: &[(&str, &str)], lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut targets: Vec<(String, String)> = self
            .keys()
            .map(|(ns, k)| (ns.to_string(), k.to_string()))
            .collect();
        targets.extend(known.iter().map(|(ns, k)| (ns.to_string(), k.to_string())));
        targets.sort();
        targets.dedup();

        for (namespace, key) in targets {
            if let Some(value) = lookup(&override_var(&namespace, &key)) {
                tracing::debug!(namespace = %namespace, key = %key, "Config value overridden from environment");
                self.set(namespace, key, value);
            }
        }
    }
}

/// Environment variable that overrides `namespace:key`
pub fn override_var(namespace: &str, key: &str) -> String {
    format!("PGSTACK_{}_{}", namespace, key)
        .to_ascii_uppercase()
        .replace('-', "_")
}
