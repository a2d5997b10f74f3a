//! Output references between resources
//!
//! A resource input may point at an output of another resource that does not
//! exist yet (e.g. a generated password). In resource configs such a value is
//! encoded as `{"$ref": {"resource": "<type:id>", "output": "<name>"}}` and is
//! replaced by the concrete value once the referenced resource has been
//! applied.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON key marking a reference object
pub const REF_KEY: &str = "$ref";

/// Reference to an output attribute of another resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    /// Key (type:id) of the referenced resource
    pub resource: String,

    /// Output attribute name
    pub output: String,
}

impl OutputRef {
    pub fn new(resource: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            output: output.into(),
        }
    }

    /// Encode the reference as a JSON placeholder
    pub fn to_value(&self) -> Value {
        serde_json::json!({ REF_KEY: { "resource": self.resource, "output": self.output } })
    }

    /// Decode a JSON placeholder, if `value` is one
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.len() != 1 {
            return None;
        }
        serde_json::from_value(obj.get(REF_KEY)?.clone()).ok()
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource, self.output)
    }
}

/// Collect every reference contained in `value`, in document order
pub fn collect_refs(value: &Value) -> Vec<OutputRef> {
    let mut refs = Vec::new();
    walk(value, &mut refs);
    refs
}

fn walk(value: &Value, refs: &mut Vec<OutputRef>) {
    if let Some(r) = OutputRef::from_value(value) {
        refs.push(r);
        return;
    }
    match value {
        Value::Array(items) => items.iter().for_each(|v| walk(v, refs)),
        Value::Object(map) => map.values().for_each(|v| walk(v, refs)),
        _ => {}
    }
}

/// Replace every reference in `value` using `lookup`
///
/// Returns the first reference `lookup` cannot answer as the error.
pub fn resolve<F>(value: &Value, lookup: &F) -> std::result::Result<Value, OutputRef>
where
    F: Fn(&OutputRef) -> Option<Value>,
{
    if let Some(r) = OutputRef::from_value(value) {
        return lookup(&r).ok_or(r);
    }
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| resolve(v, lookup))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (k, v) in map {
                resolved.insert(k.clone(), resolve(v, lookup)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_placeholder() {
        let r = OutputRef::new("random-password:postgres", "result");
        assert_eq!(OutputRef::from_value(&r.to_value()), Some(r));
        assert_eq!(OutputRef::from_value(&json!({"resource": "x"})), None);
    }

    #[test]
    fn test_collect_nested_refs() {
        let config = json!({
            "resource_group_name": OutputRef::new("resource-group:example", "name").to_value(),
            "backup": { "backup_retention_days": 7 },
            "administrator_login_password": OutputRef::new("random-password:postgres", "result").to_value(),
        });
        let refs = collect_refs(&config);
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&OutputRef::new("resource-group:example", "name")));
    }

    #[test]
    fn test_resolve_reports_first_unknown() {
        let config = json!({
            "name": OutputRef::new("resource-group:example", "name").to_value(),
            "tier": "Burstable",
        });

        let known = resolve(&config, &|r: &OutputRef| {
            (r.output == "name").then(|| json!("example1a2b3c4d"))
        })
        .unwrap();
        assert_eq!(known, json!({"name": "example1a2b3c4d", "tier": "Burstable"}));

        let unknown = resolve(&config, &|_: &OutputRef| None).unwrap_err();
        assert_eq!(unknown.resource, "resource-group:example");
    }
}
