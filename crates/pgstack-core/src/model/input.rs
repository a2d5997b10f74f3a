//! Resource inputs that may be known only after another resource exists

use pgstack_cloud::OutputRef;
use serde::{Serialize, Serializer};

/// A literal value or a reference to another resource's output
///
/// References serialize to the engine's `$ref` placeholder, so every
/// reference in a declaration also becomes a dependency edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Input<T> {
    Value(T),
    Ref(OutputRef),
}

impl<T> Input<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Input::Value(v) => Some(v),
            Input::Ref(_) => None,
        }
    }

    pub fn reference(&self) -> Option<&OutputRef> {
        match self {
            Input::Value(_) => None,
            Input::Ref(r) => Some(r),
        }
    }
}

impl<T> From<OutputRef> for Input<T> {
    fn from(r: OutputRef) -> Self {
        Input::Ref(r)
    }
}

impl<T: Serialize> Serialize for Input<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Input::Value(v) => v.serialize(serializer),
            Input::Ref(r) => r.to_value().serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_serializes_as_itself() {
        let input: Input<String> = Input::Value("eastus".into());
        assert_eq!(serde_json::to_value(&input).unwrap(), json!("eastus"));
    }

    #[test]
    fn test_reference_serializes_as_placeholder() {
        let input: Input<String> = OutputRef::new("resource-group:example", "name").into();
        let value = serde_json::to_value(&input).unwrap();

        assert_eq!(
            OutputRef::from_value(&value),
            Some(OutputRef::new("resource-group:example", "name"))
        );
        assert!(input.value().is_none());
    }
}
