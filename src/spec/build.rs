//! Build specification (`containme.yaml`)

use crate::error::{ContainmeError, ContainmeResult};
use crate::spec::step::{null_as_default, Step};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default build spec file name
pub const DEFAULT_SPEC_FILE: &str = "containme.yaml";

/// The four ordered stages of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Environment,
    Dependencies,
    Test,
    Package,
}

impl Stage {
    /// Stage name used for labels and cache state keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Dependencies => "dependencies",
            Self::Test => "test",
            Self::Package => "package",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a planned step came from within its stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    Override,
    Default,
    After,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::Override => "override",
            Self::Default => "default",
            Self::After => "after",
        }
    }
}

/// A step scheduled for execution, tagged with its stage and phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub stage: Stage,
    pub phase: Phase,
    pub step: Step,
}

impl PlannedStep {
    /// Progress label, e.g. `dependencies-override`
    pub fn label(&self) -> String {
        format!("{}-{}", self.stage, self.phase.as_str())
    }
}

/// Before/override/after step lists shared by every executable stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStage {
    #[serde(deserialize_with = "null_as_default")]
    pub before: Vec<Step>,

    #[serde(rename = "override", deserialize_with = "null_as_default")]
    pub override_steps: Vec<Step>,

    #[serde(deserialize_with = "null_as_default")]
    pub after: Vec<Step>,
}

impl BaseStage {
    /// Compose the stage's step sequence.
    ///
    /// `before` always runs, then `override` if non-empty or `defaults`
    /// otherwise, then `after`.
    pub fn plan(&self, stage: Stage, defaults: &[Step]) -> Vec<PlannedStep> {
        let middle = if self.override_steps.is_empty() {
            (Phase::Default, defaults)
        } else {
            (Phase::Override, self.override_steps.as_slice())
        };

        [
            (Phase::Before, self.before.as_slice()),
            middle,
            (Phase::After, self.after.as_slice()),
        ]
        .into_iter()
        .flat_map(|(phase, steps)| {
            steps.iter().map(move |step| PlannedStep {
                stage,
                phase,
                step: step.clone(),
            })
        })
        .collect()
    }
}

/// Environment stage: picks the profile and the workspace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentStage {
    /// Profile reference (`./relative` or `/absolute`, extension optional)
    pub profile: String,

    /// Workspace override (absolute, or relative to the profile workspace)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub workspace: String,

    #[serde(flatten)]
    pub base: BaseStage,
}

/// Package stage metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageStage {
    #[serde(deserialize_with = "null_as_default")]
    pub docker: PackageDocker,
}

/// Docker image packaging target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageDocker {
    pub tag: String,
    pub dockerfile: String,
}

/// A complete build specification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSpec {
    #[serde(deserialize_with = "null_as_default")]
    pub environment: EnvironmentStage,

    #[serde(deserialize_with = "null_as_default")]
    pub dependencies: BaseStage,

    #[serde(deserialize_with = "null_as_default")]
    pub test: BaseStage,

    #[serde(deserialize_with = "null_as_default")]
    pub package: PackageStage,
}

impl BuildSpec {
    /// Parse a build spec document
    pub fn parse(content: &str) -> ContainmeResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(content).map_err(|e| ContainmeError::SpecParse {
            document: "build spec".to_string(),
            source: e,
        })
    }

    /// Parse a build spec from raw bytes
    pub fn parse_bytes(content: &[u8]) -> ContainmeResult<Self> {
        let content = std::str::from_utf8(content).map_err(|e| ContainmeError::SpecEncoding {
            document: "build spec".to_string(),
            source: e,
        })?;
        Self::parse(content)
    }

    /// Read and parse a build spec file
    pub async fn from_file(path: &Path) -> ContainmeResult<Self> {
        if !path.exists() {
            return Err(ContainmeError::SpecNotFound(path.to_path_buf()));
        }
        let content = tokio::fs::read(path).await.map_err(|e| {
            ContainmeError::io(format!("reading build spec {}", path.display()), e)
        })?;
        Self::parse_bytes(&content)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> ContainmeResult<String> {
        serde_yml::to_string(self).map_err(ContainmeError::YamlSerialize)
    }

    /// Stage definition for an executable stage
    pub fn stage(&self, stage: Stage) -> Option<&BaseStage> {
        match stage {
            Stage::Environment => Some(&self.environment.base),
            Stage::Dependencies => Some(&self.dependencies),
            Stage::Test => Some(&self.test),
            Stage::Package => None,
        }
    }
}
