//! pgstack core
//!
//! Reads the stack configuration and declares the PostgreSQL flexible server
//! topology for a given revision. Declaration is pure: it produces a
//! [`Topology`] that the engine in `pgstack-cloud` turns into real resources.

pub mod declare;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;

pub use declare::{
    AZURE_NAMESPACE, CONFIG_KEYS, DEFAULT_LOCATION, EXAMPLE_NAMESPACE, declare_topology,
};
pub use error::{Result, StackError};
pub use loader::{load_stack, load_stack_from_path};
pub use model::*;
pub use parser::{parse_stack_file, parse_stack_string};
