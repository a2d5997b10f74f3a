//! Dependency ordering of resources

use crate::error::{CloudError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Order `nodes` so that every node comes after its dependencies
///
/// `nodes` maps a resource key to the keys it depends on. Ties are broken by
/// key so the order is stable between runs. Dependencies that are not part of
/// `nodes` are reported as [`CloudError::InvalidConfig`] when `strict` is set
/// and ignored otherwise.
pub fn topological_order(
    nodes: &BTreeMap<String, Vec<String>>,
    strict: bool,
) -> Result<Vec<String>> {
    let mut remaining: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for (key, deps) in nodes {
        let mut set = BTreeSet::new();
        for dep in deps {
            if nodes.contains_key(dep) {
                set.insert(dep.as_str());
            } else if strict {
                return Err(CloudError::InvalidConfig(format!(
                    "{} depends on undeclared resource {}",
                    key, dep
                )));
            }
        }
        remaining.insert(key.as_str(), set);
    }

    let mut order = Vec::with_capacity(nodes.len());
    while !remaining.is_empty() {
        let ready = remaining
            .iter()
            .find(|(_, deps)| deps.is_empty())
            .map(|(key, _)| *key);

        let Some(next) = ready else {
            let cycle: Vec<&str> = remaining.keys().copied().collect();
            return Err(CloudError::CircularDependency(cycle.join(" -> ")));
        };

        remaining.remove(next);
        for deps in remaining.values_mut() {
            deps.remove(next);
        }
        order.push(next.to_string());
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: Vec<(&str, Vec<&str>)>) -> BTreeMap<String, Vec<String>> {
        edges
            .into_iter()
            .map(|(k, deps)| (k.to_string(), deps.into_iter().map(String::from).collect()))
            .collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let nodes = graph(vec![
            (
                "firewall-rule:allow-all",
                vec!["flexible-server:postgres", "resource-group:example"],
            ),
            (
                "flexible-server:postgres",
                vec!["random-password:postgres", "resource-group:example"],
            ),
            ("random-password:postgres", vec![]),
            ("resource-group:example", vec![]),
        ]);

        let order = topological_order(&nodes, true).unwrap();
        assert_eq!(
            order,
            vec![
                "random-password:postgres",
                "resource-group:example",
                "flexible-server:postgres",
                "firewall-rule:allow-all",
            ]
        );
    }

    #[test]
    fn test_cycle_is_detected() {
        let nodes = graph(vec![("a:a", vec!["b:b"]), ("b:b", vec!["a:a"])]);
        assert!(matches!(
            topological_order(&nodes, true),
            Err(CloudError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_unknown_dependency() {
        let nodes = graph(vec![("a:a", vec!["missing:x"])]);
        assert!(matches!(
            topological_order(&nodes, true),
            Err(CloudError::InvalidConfig(_))
        ));
        assert_eq!(topological_order(&nodes, false).unwrap(), vec!["a:a"]);
    }
}
