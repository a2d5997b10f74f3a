//! Declared topology

use crate::error::Result;
use crate::model::{
    FirewallRule, FlexibleServer, RandomPassword, Resource, ResourceGroup, ResourceKind, Revision,
};
use pgstack_cloud::{OutputRef, ResourceSet};
use std::collections::BTreeMap;

/// Every resource of one revision plus its exported outputs
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub revision: Revision,
    /// Resources in declaration order
    pub resources: Vec<Resource>,
    pub exports: BTreeMap<String, OutputRef>,
}

impl Topology {
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            resources: Vec::new(),
            exports: BTreeMap::new(),
        }
    }

    pub fn declare(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn export(&mut self, name: impl Into<String>, output: OutputRef) {
        self.exports.insert(name.into(), output);
    }

    pub fn get(&self, key: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.key() == key)
    }

    pub fn resource_groups(&self) -> Vec<(&str, &ResourceGroup)> {
        self.filter(|k| match k {
            ResourceKind::ResourceGroup(r) => Some(r),
            _ => None,
        })
    }

    pub fn passwords(&self) -> Vec<(&str, &RandomPassword)> {
        self.filter(|k| match k {
            ResourceKind::RandomPassword(r) => Some(r),
            _ => None,
        })
    }

    pub fn servers(&self) -> Vec<(&str, &FlexibleServer)> {
        self.filter(|k| match k {
            ResourceKind::FlexibleServer(r) => Some(r),
            _ => None,
        })
    }

    pub fn firewall_rules(&self) -> Vec<(&str, &FirewallRule)> {
        self.filter(|k| match k {
            ResourceKind::FirewallRule(r) => Some(r),
            _ => None,
        })
    }

    fn filter<'a, T, F>(&'a self, pick: F) -> Vec<(&'a str, &'a T)>
    where
        F: Fn(&'a ResourceKind) -> Option<&'a T>,
    {
        self.resources
            .iter()
            .filter_map(|r| pick(&r.kind).map(|t| (r.name.as_str(), t)))
            .collect()
    }

    /// Convert into the engine's resource set
    pub fn to_resource_set(&self) -> Result<ResourceSet> {
        let mut set = ResourceSet::new();
        for resource in &self.resources {
            set.add(resource.to_config()?);
        }
        for (name, output) in &self.exports {
            set.export(name.clone(), output.clone());
        }
        Ok(set)
    }
}
