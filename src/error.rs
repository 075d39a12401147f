//! Error types for containme
//!
//! All modules use `ContainmeResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for containme operations
pub type ContainmeResult<T> = Result<T, ContainmeError>;

/// All errors that can occur in containme
#[derive(Error, Debug)]
pub enum ContainmeError {
    // Specification errors
    #[error("Failed to parse {document}: {source}")]
    SpecParse {
        document: String,
        #[source]
        source: serde_yml::Error,
    },

    #[error("Failed to parse {document}: {source}")]
    SpecEncoding {
        document: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Build spec not found: {0}")]
    SpecNotFound(PathBuf),

    #[error("{0}: profile could not be found")]
    ProfileNotFound(PathBuf),

    #[error("Could not determine profile resolution strategy for '{0}'")]
    ProfileStrategy(String),

    #[error("Invalid profile: {0}")]
    ProfileInvalid(String),

    // Runtime errors
    #[error("Container runtime unavailable ({runtime}): {reason}")]
    RuntimeUnavailable { runtime: String, reason: String },

    #[error("Failed to create container: {0}")]
    ContainerCreate(String),

    #[error("Container failed to start: {0}")]
    ContainerStart(String),

    #[error("Failed to commit container: {0}")]
    ContainerCommit(String),

    #[error("Command exited with code {code}")]
    CommandExit { code: i64 },

    #[error("Exceeded timeout of {secs}s")]
    StepTimeout { secs: u64 },

    #[error("Stage({stage}) build-step-{step} failed running ({command}): {source}")]
    StepFailed {
        stage: String,
        step: usize,
        command: String,
        #[source]
        source: Box<ContainmeError>,
    },

    #[error("Image pull failed: {0}")]
    ImagePull(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Cached image {image} could not be verified: {reason}")]
    CacheVerification { image: String, reason: String },

    #[error("Multiple cached images for hash {0}")]
    CacheAmbiguous(String),

    // Volume errors
    #[error("Failed to create volume for {path}: {reason}")]
    VolumeCreate { path: String, reason: String },

    #[error("Failed to remove volume {name}: {reason}")]
    VolumeRemove { name: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("YAML serialize error: {0}")]
    YamlSerialize(#[source] serde_yml::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContainmeError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether this error (or the step failure it wraps) is a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::StepTimeout { .. } => true,
            Self::StepFailed { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::StepFailed { source, .. } => source.hint(),
            Self::StepTimeout { .. } => Some("Raise the step's `timeout` in the build spec"),
            Self::RuntimeUnavailable { .. } => {
                Some("Start docker or podman, or set [runtime] binary in config.toml")
            }
            Self::ProfileStrategy(_) => {
                Some("Profiles must be referenced by an absolute path or a ./relative path")
            }
            Self::SpecNotFound(_) => Some("Pass the build spec with --file"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ContainmeError::ProfileNotFound(PathBuf::from("/profiles/java"));
        assert_eq!(err.to_string(), "/profiles/java: profile could not be found");
    }

    #[test]
    fn step_failure_names_stage_step_and_command() {
        let err = ContainmeError::StepFailed {
            stage: "test-override".to_string(),
            step: 3,
            command: "make test".to_string(),
            source: Box::new(ContainmeError::CommandExit { code: 2 }),
        };
        let msg = err.to_string();
        assert!(msg.contains("test-override"));
        assert!(msg.contains("build-step-3"));
        assert!(msg.contains("make test"));
        assert!(msg.contains("code 2"));
    }

    #[test]
    fn timeout_seen_through_step_failure() {
        let err = ContainmeError::StepFailed {
            stage: "dependencies-default".to_string(),
            step: 0,
            command: "mvn install".to_string(),
            source: Box::new(ContainmeError::StepTimeout { secs: 600 }),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timeout of 600s"));
        assert_eq!(err.hint(), Some("Raise the step's `timeout` in the build spec"));
        assert!(!ContainmeError::CommandExit { code: 1 }.is_timeout());
    }
}
