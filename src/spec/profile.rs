//! Profile specification
//!
//! A profile is a reusable environment template: base image, workspace,
//! cache directories and the default dependency/test steps.

use crate::error::{ContainmeError, ContainmeResult};
use crate::spec::step::{null_as_default, Step};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shell used when a profile does not name one
pub const DEFAULT_SHELL: &str = "/bin/sh";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSpec {
    /// Shell that wraps every command (`<shell> -c <command>`)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shell: String,

    /// Image the environment stage starts from
    #[serde(alias = "base_image")]
    pub image: String,

    /// Working directory inside the container
    pub workspace: String,

    /// Container paths backed by a named volume for the whole build
    #[serde(deserialize_with = "null_as_default")]
    pub cache_directories: Vec<String>,

    /// Default dependencies steps
    #[serde(deserialize_with = "null_as_default")]
    pub dependencies: Vec<Step>,

    /// Default test steps
    #[serde(deserialize_with = "null_as_default")]
    pub test: Vec<Step>,
}

impl ProfileSpec {
    /// Parse a profile document
    pub fn parse(content: &str) -> ContainmeResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(content).map_err(|e| ContainmeError::SpecParse {
            document: "profile".to_string(),
            source: e,
        })
    }

    /// Parse a profile from raw bytes
    pub fn parse_bytes(content: &[u8]) -> ContainmeResult<Self> {
        let content = std::str::from_utf8(content).map_err(|e| ContainmeError::SpecEncoding {
            document: "profile".to_string(),
            source: e,
        })?;
        Self::parse(content)
    }

    /// Read and parse a profile file
    pub async fn from_file(path: &Path) -> ContainmeResult<Self> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ContainmeError::io(format!("reading profile {}", path.display()), e))?;
        Self::parse_bytes(&content)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> ContainmeResult<String> {
        serde_yml::to_string(self).map_err(ContainmeError::YamlSerialize)
    }

    /// The configured shell, or `/bin/sh`
    pub fn shell(&self) -> &str {
        if self.shell.is_empty() {
            DEFAULT_SHELL
        } else {
            &self.shell
        }
    }

    /// Wrap a command for the profile's shell
    pub fn make_cmd(&self, command: &str) -> Vec<String> {
        vec![self.shell().to_string(), "-c".to_string(), command.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
image: foo/bar
workspace: /use/src/app
cache_directories:
  - /home/admin/.m2
dependencies:
  - mvn install
test:
  - mvn test:
      timeout: 900
"#;

    #[test]
    fn parse_profile() {
        let profile = ProfileSpec::parse(PROFILE).unwrap();

        assert_eq!(profile.image, "foo/bar");
        assert_eq!(profile.workspace, "/use/src/app");
        assert_eq!(profile.cache_directories, vec!["/home/admin/.m2"]);
        assert_eq!(profile.dependencies, vec![Step::new("mvn install")]);
        assert_eq!(profile.test, vec![Step::new("mvn test").with_timeout(900)]);
        assert_eq!(profile.shell(), "/bin/sh");
    }

    #[test]
    fn base_image_alias_and_shell() {
        let profile = ProfileSpec::parse("base_image: alpine:3\nshell: /bin/bash\n").unwrap();
        assert_eq!(profile.image, "alpine:3");
        assert_eq!(
            profile.make_cmd("echo hi"),
            vec!["/bin/bash", "-c", "echo hi"]
        );
    }

    #[test]
    fn roundtrip() {
        let profile = ProfileSpec::parse(PROFILE).unwrap();
        let yaml = profile.to_yaml().unwrap();
        assert_eq!(ProfileSpec::parse(&yaml).unwrap(), profile);
    }

    #[test]
    fn malformed_profile() {
        let err = ProfileSpec::parse("image: [").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse profile"));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let err = ProfileSpec::parse_bytes(b"image: caf\xe9:1\n").unwrap_err();
        assert!(matches!(err, ContainmeError::SpecEncoding { .. }));
        assert!(err.to_string().starts_with("Failed to parse profile"));
    }
}
