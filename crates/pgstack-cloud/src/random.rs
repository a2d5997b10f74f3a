//! Local `random` provider
//!
//! Generates values (passwords) that other resources consume. Nothing leaves
//! the machine: the generated value lives in the state file and is reused on
//! every run until one of its inputs changes.

use crate::error::{CloudError, Result};
use crate::provider::{AuthStatus, CloudProvider, ResolvedResource};
use crate::state::{ResourceState, ResourceStatus};
use async_trait::async_trait;
use rand::Rng;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const PROVIDER_NAME: &str = "random";
pub const RANDOM_PASSWORD: &str = "random-password";

/// Shortest password the target platform accepts
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Longest password the target platform accepts
pub const MAX_PASSWORD_LENGTH: usize = 128;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%&*()-_=+[]{}<>:?";

const PASSWORD_FIELDS: &[&str] = &["length", "min_lower", "min_upper", "min_numeric", "min_special"];

/// Composition rules for a generated password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub length: usize,
    #[serde(default)]
    pub min_lower: usize,
    #[serde(default)]
    pub min_upper: usize,
    #[serde(default)]
    pub min_numeric: usize,
    #[serde(default)]
    pub min_special: usize,
}

impl PasswordPolicy {
    /// Check the length range and that the minimums fit in the length
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&self.length) {
            return Err(format!(
                "length {} must be between {} and {}",
                self.length, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
            ));
        }
        let required = self.min_lower + self.min_upper + self.min_numeric + self.min_special;
        if required > self.length {
            return Err(format!(
                "minimum character counts add up to {} which exceeds length {}",
                required, self.length
            ));
        }
        Ok(())
    }

    /// Generate a password satisfying the policy
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Result<String> {
        self.validate().map_err(CloudError::InvalidConfig)?;

        let mut chars = Vec::with_capacity(self.length);
        for (class, min) in [
            (LOWER, self.min_lower),
            (UPPER, self.min_upper),
            (NUMERIC, self.min_numeric),
            (SPECIAL, self.min_special),
        ] {
            for _ in 0..min {
                chars.push(class[rng.gen_range(0..class.len())]);
            }
        }

        let all: Vec<u8> = [LOWER, UPPER, NUMERIC, SPECIAL].concat();
        while chars.len() < self.length {
            chars.push(all[rng.gen_range(0..all.len())]);
        }
        chars.shuffle(rng);

        Ok(chars.into_iter().map(char::from).collect())
    }
}

/// Provider for locally generated values
#[derive(Debug, Default)]
pub struct RandomProvider;

impl RandomProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CloudProvider for RandomProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "Random"
    }

    fn resource_types(&self) -> &[&'static str] {
        &[RANDOM_PASSWORD]
    }

    fn replace_triggers(&self, _resource_type: &str) -> &[&'static str] {
        PASSWORD_FIELDS
    }

    fn secret_outputs(&self, _resource_type: &str) -> &[&'static str] {
        &["result"]
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("local"))
    }

    async fn create(&self, resource: &ResolvedResource) -> Result<ResourceState> {
        if resource.resource_type != RANDOM_PASSWORD {
            return Err(CloudError::InvalidConfig(format!(
                "random provider does not manage {}",
                resource.resource_type
            )));
        }

        let policy: PasswordPolicy = serde_json::from_value(resource.inputs.clone())?;
        let password = policy.generate(&mut OsRng)?;
        tracing::debug!("Generated {} character password for {}", policy.length, resource.key);

        Ok(ResourceState::new(resource.name.clone(), RANDOM_PASSWORD)
            .with_status(ResourceStatus::Running)
            .with_attribute("result", serde_json::json!(password))
            .with_attribute("length", serde_json::json!(policy.length)))
    }

    async fn read(&self, current: &ResourceState) -> Result<Option<ResourceState>> {
        Ok(Some(current.clone()))
    }

    async fn update(
        &self,
        current: &ResourceState,
        _resource: &ResolvedResource,
    ) -> Result<ResourceState> {
        // Every input is a replace trigger; nothing can change in place
        Ok(current.clone())
    }

    async fn delete(&self, _current: &ResourceState) -> Result<()> {
        Ok(())
    }
}
