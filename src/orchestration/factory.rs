//! Runtime factory
//!
//! Picks docker or podman from configuration, or detects one.

use crate::config::schema::RuntimeConfig;
use crate::error::{ContainmeError, ContainmeResult};
use crate::orchestration::cli_runtime::{CliRuntime, RuntimeKind};
use crate::orchestration::runtime::ContainerRuntime;
use std::sync::Arc;
use tracing::debug;

/// Decide which runtime to use without probing the system.
///
/// Returns `None` when detection is needed.
pub fn configured_kind(config: &RuntimeConfig) -> ContainmeResult<Option<RuntimeKind>> {
    if !config.binary.is_empty() {
        return RuntimeKind::from_binary(&config.binary)
            .map(Some)
            .ok_or_else(|| ContainmeError::RuntimeUnavailable {
                runtime: config.binary.clone(),
                reason: "unsupported runtime, expected docker or podman".to_string(),
            });
    }

    if std::env::var_os("DOCKER_HOST").is_some() {
        return Ok(Some(RuntimeKind::Docker));
    }

    Ok(None)
}

/// Create the container runtime for this system
pub async fn create_runtime(config: &RuntimeConfig) -> ContainmeResult<Arc<dyn ContainerRuntime>> {
    let kind = match configured_kind(config)? {
        Some(kind) => kind,
        None => detect().await?,
    };
    debug!("Using runtime: {}", kind.name());
    Ok(Arc::new(CliRuntime::new(kind)))
}

async fn detect() -> ContainmeResult<RuntimeKind> {
    for kind in [RuntimeKind::Docker, RuntimeKind::Podman] {
        if kind.is_installed().await {
            return Ok(kind);
        }
    }
    Err(ContainmeError::RuntimeUnavailable {
        runtime: "docker/podman".to_string(),
        reason: "neither docker nor podman found in PATH".to_string(),
    })
}
