//! pgstack cloud engine
//!
//! This crate holds everything between a declared topology and the cloud:
//! the resource set with its dependency edges, the plan (diff) and apply
//! steps, the provider abstraction and the per-stack state file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  pgstack CLI                    │
//! │           (preview / up / destroy)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │ ResourceSet
//! ┌─────────────────▼───────────────────────────────┐
//! │                pgstack-cloud                    │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Engine       │  │  State Mgmt  │            │
//! │  │ plan / apply │  │  state.json  │            │
//! │  └──────┬───────┘  └──────────────┘            │
//! │  ┌──────▼───────────────────────────────────┐   │
//! │  │  trait CloudProvider { ... }             │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │    random     │ │ azure-native  │
//! │  (passwords)  │ │   (az CLI)    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod action;
pub mod engine;
pub mod error;
pub mod graph;
pub mod provider;
pub mod random;
pub mod reference;
pub mod state;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use engine::{Engine, physical_name};
pub use error::{CloudError, Result};
pub use provider::{
    AuthStatus, CloudProvider, ResolvedResource, ResourceConfig, ResourceSet, RetryConfig,
};
pub use random::{PasswordPolicy, RandomProvider};
pub use reference::OutputRef;
pub use state::{
    GlobalState, OutputValue, ResourceState, ResourceStatus, StateLock, StateManager,
};
