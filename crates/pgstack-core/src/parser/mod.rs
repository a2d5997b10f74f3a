//! KDL parser
//!
//! Parses the stack file:
//!
//! ```kdl
//! stack "dev"
//! config "example" {
//!     zone "1"
//! }
//! config "azure-native" location="westeurope"
//! ```

use crate::error::{Result, StackError};
use crate::model::{DEFAULT_STACK, StackConfig};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::fs;
use std::path::Path;


/// Parse a stack file
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<StackConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| StackError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_stack_string(&content)
}

/// Parse stack file contents
pub fn parse_stack_string(content: &str) -> Result<StackConfig> {
    let doc: KdlDocument = content.parse()?;
    let mut config = StackConfig::new(DEFAULT_STACK);

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                config.name = first_string(node)
                    .ok_or_else(|| StackError::InvalidConfig("stack requires a name".to_string()))?
                    .to_string();
            }
            "config" => parse_config(node, &mut config)?,
            other => {
                return Err(StackError::InvalidConfig(format!(
                    "unknown node '{}' (expected stack or config)",
                    other
                )));
            }
        }
    }

    Ok(config)
}

/// Properties and child nodes of a config node both set keys
fn parse_config(node: &KdlNode, config: &mut StackConfig) -> Result<()> {
    let namespace = node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| StackError::InvalidConfig("config requires a namespace".to_string()))?
        .to_string();

    for entry in node.entries() {
        if let Some(key) = entry.name() {
            config.set(&namespace, key.value(), scalar(entry.value()));
        }
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value();
            let value = child
                .entries()
                .first()
                .map(|e| scalar(e.value()))
                .ok_or_else(|| {
                    StackError::InvalidConfig(format!("{}:{} requires a value", namespace, key))
                })?;
            config.set(&namespace, key, value);
        }
    }

    Ok(())
}

fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}

fn scalar(value: &KdlValue) -> String {
    match value {
        KdlValue::String(s) => s.clone(),
        KdlValue::Integer(i) => i.to_string(),
        KdlValue::Float(f) => f.to_string(),
        KdlValue::Bool(b) => b.to_string(),
        KdlValue::Null => String::new(),
    }
}
