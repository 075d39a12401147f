//! Container runtime abstraction
//!
//! The engine only needs "run an isolated command and snapshot the result".
//! This trait is that capability surface; backends implement it over the
//! docker or podman CLI, tests implement it in memory.

use crate::error::ContainmeResult;
use crate::orchestration::container::ContainerConfig;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Combined stdout/stderr of a running container
pub type OutputStream = Pin<Box<dyn AsyncRead + Send>>;

/// Abstract container runtime interface
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Fail with `RuntimeUnavailable` if the runtime cannot be reached
    async fn ensure_ready(&self) -> ContainmeResult<()>;

    /// Create (but do not start) a container, returning its ID
    async fn create_container(
        &self,
        config: &ContainerConfig,
        command: &[String],
    ) -> ContainmeResult<String>;

    /// Start a created container
    async fn start_container(&self, container_id: &str) -> ContainmeResult<()>;

    /// Stream the container's combined output until it exits
    async fn attach_output(&self, container_id: &str) -> ContainmeResult<OutputStream>;

    /// Block until the container exits, returning its exit code
    async fn wait_container(&self, container_id: &str) -> ContainmeResult<i64>;

    /// Snapshot the container's filesystem as a new image, returning its ID
    async fn commit_container(
        &self,
        container_id: &str,
        labels: &BTreeMap<String, String>,
    ) -> ContainmeResult<String>;

    /// Force-remove a container
    async fn remove_container(&self, container_id: &str) -> ContainmeResult<()>;

    /// Fail with `ImageNotFound` unless the image exists locally
    async fn inspect_image(&self, image: &str) -> ContainmeResult<()>;

    /// IDs of local images carrying every given label
    async fn list_images(&self, labels: &BTreeMap<String, String>) -> ContainmeResult<Vec<String>>;

    /// Create a volume, returning its name
    async fn create_volume(&self, labels: &BTreeMap<String, String>) -> ContainmeResult<String>;

    /// Remove a volume
    async fn remove_volume(&self, name: &str) -> ContainmeResult<()>;

    /// Human-readable runtime name for display
    fn runtime_name(&self) -> &'static str;
}
