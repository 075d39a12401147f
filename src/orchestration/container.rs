//! Shared container types
//!
//! Data structures passed to container runtimes. The actual execution
//! logic lives in the runtime implementations.

use std::collections::BTreeMap;

/// Label keys attached to containers, images and volumes
pub mod labels {
    /// Build identifier that created the object
    pub const BUILD: &str = "io.containme.build";
    /// Container path a cache volume is mounted at
    pub const DIR: &str = "io.containme.dir";
    /// Cache key of a cacheable step
    pub const HASH: &str = "io.containme.hash";
    /// Image a cacheable step ran on top of
    pub const PARENT: &str = "io.containme.parent";
}

/// Container configuration for one build step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Container name
    pub name: String,
    /// Image the container is created from
    pub image: String,
    /// Working directory inside the container
    pub workdir: String,
    /// Bind mounts (`source:target`), workspace first
    pub binds: Vec<String>,
    /// Environment variables
    pub env: BTreeMap<String, String>,
    /// Container labels
    pub labels: BTreeMap<String, String>,
    /// Allocate a TTY so stdout and stderr arrive as one stream
    pub tty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_config_default() {
        let config = ContainerConfig {
            name: "cme_builder_abc-0".to_string(),
            image: "alpine:3".to_string(),
            workdir: "/src".to_string(),
            binds: vec!["/home/me/app:/src".to_string()],
            tty: true,
            ..Default::default()
        };

        assert_eq!(config.binds, vec!["/home/me/app:/src"]);
        assert!(config.env.is_empty());
        assert!(config.labels.is_empty());
    }
}
