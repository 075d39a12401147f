//! Containme - container-based build orchestrator
//!
//! Runs a build spec's environment, dependencies and test stages as a
//! chain of committed containers on docker or podman, reusing stage
//! checkpoints between invocations.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod spec;
pub mod state;
pub mod ui;

pub use error::{ContainmeError, ContainmeResult};
