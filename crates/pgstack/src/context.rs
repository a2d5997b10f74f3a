use colored::Colorize;
use pgstack_cloud::{Engine, RandomProvider, StateManager};
use pgstack_cloud_azure::AzureProvider;
use pgstack_core::{Revision, StackConfig, Topology};
use std::path::PathBuf;

/// Everything a command needs to know about the selected stack
pub struct StackContext {
    pub stack_file: PathBuf,
    pub project_root: PathBuf,
    pub config: StackConfig,
}

impl StackContext {
    pub fn load(stack: Option<String>) -> anyhow::Result<Self> {
        let (stack_file, mut config) = pgstack_core::load_stack()?;
        if let Some(name) = stack {
            config.name = name;
        }
        let project_root = pgstack_config::project_root(&stack_file);
        tracing::debug!(
            stack_file = %stack_file.display(),
            project_root = %project_root.display(),
            stack = %config.name,
            "Stack context loaded"
        );

        Ok(Self {
            stack_file,
            project_root,
            config,
        })
    }

    pub fn store(&self) -> StateManager {
        StateManager::new(&self.project_root, self.config.name.clone())
    }

    pub fn engine(&self) -> Engine {
        Engine::new()
            .with_provider(RandomProvider::new())
            .with_provider(AzureProvider::new())
    }

    pub fn declare(&self, revision: Revision) -> anyhow::Result<Topology> {
        Ok(pgstack_core::declare_topology(&self.config, revision)?)
    }

    pub fn print_header(&self, title: &str) {
        println!("{}", title.blue().bold());
        println!("Stack file: {}", self.stack_file.display().to_string().cyan());
        println!("Stack: {}", self.config.name.cyan());
    }
}
