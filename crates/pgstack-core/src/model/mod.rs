//! Model definitions
//!
//! Declarations of the resources that make up a stack, the stack
//! configuration they are declared from and the revision that selects a
//! variant of the topology.

mod input;
mod resource;
mod revision;
mod stack;
mod topology;

// Re-exports
pub use input::*;
pub use resource::*;
pub use revision::*;
pub use stack::*;
pub use topology::*;
