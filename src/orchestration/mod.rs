//! Orchestration module for container runtimes
//!
//! Provides the runtime capability surface used by the build engine and
//! its docker/podman CLI implementation.

mod cli_runtime;
pub mod container;
mod factory;
mod runtime;

pub use cli_runtime::{short_id, CliRuntime, RuntimeKind};
pub use container::{labels, ContainerConfig};
pub use factory::{configured_kind, create_runtime};
pub use runtime::{ContainerRuntime, OutputStream};
