//! Build steps
//!
//! A step is written either as a bare command string or as a single-entry
//! mapping from the command text to its options:
//!
//! ```yaml
//! - make deps
//! - bundle install:
//!     timeout: 240
//!     cache: true
//!     environment:
//!       - BUNDLE_PATH=/cache/bundle
//!     pwd: app
//! ```

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Deadline applied to a step that does not set its own `timeout`
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 600;

/// A single shell invocation plus its execution metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    /// Shell command, run as `<shell> -c <command>`
    pub command: String,
    /// Per-step options
    pub options: StepOptions,
}

/// Options carried by the mapping form of a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepOptions {
    /// Deadline in seconds (unset = process-wide default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Whether the step's committed image may be reused by later builds
    #[serde(skip_serializing_if = "is_false")]
    pub cache: bool,

    /// Environment variables for the step's container
    #[serde(
        deserialize_with = "deserialize_environment",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub environment: BTreeMap<String, String>,

    /// Working directory override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwd: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Step {
    /// Create a step with default options
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            options: StepOptions::default(),
        }
    }

    /// Set the step's timeout in seconds
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.options.timeout = Some(secs);
        self
    }

    /// Mark the step as cacheable
    pub fn cacheable(mut self) -> Self {
        self.options.cache = true;
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.environment.insert(key.into(), value.into());
        self
    }

    /// Set the working directory override
    pub fn with_pwd(mut self, pwd: impl Into<String>) -> Self {
        self.options.pwd = Some(pwd.into());
        self
    }

    /// Deadline for this step, falling back to `default`
    pub fn timeout(&self, default: Duration) -> Duration {
        self.options
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StepVisitor;

        impl<'de> Visitor<'de> for StepVisitor {
            type Value = Step;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a command string or a single-entry map of command to options")
            }

            fn visit_str<E>(self, value: &str) -> Result<Step, E>
            where
                E: de::Error,
            {
                if value.trim().is_empty() {
                    return Err(E::custom("step command must not be empty"));
                }
                Ok(Step::new(value))
            }

            fn visit_string<E>(self, value: String) -> Result<Step, E>
            where
                E: de::Error,
            {
                self.visit_str(&value)
            }

            fn visit_map<M>(self, mut map: M) -> Result<Step, M::Error>
            where
                M: MapAccess<'de>,
            {
                let command: String = map
                    .next_key()?
                    .ok_or_else(|| de::Error::custom("step map must contain a command"))?;
                if command.trim().is_empty() {
                    return Err(de::Error::custom("step command must not be empty"));
                }

                // `cmd:` with nothing under it is a command with default options
                let options: Option<StepOptions> = map.next_value()?;

                if let Some(extra) = map.next_key::<String>()? {
                    return Err(de::Error::custom(format!(
                        "step map must have exactly one command, found '{}' and '{}'",
                        command, extra
                    )));
                }

                Ok(Step {
                    command,
                    options: options.unwrap_or_default(),
                })
            }
        }

        deserializer.deserialize_any(StepVisitor)
    }
}

impl Serialize for Step {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.options == StepOptions::default() {
            return serializer.serialize_str(&self.command);
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.command, &self.options)?;
        map.end()
    }
}

/// Environment written either as a map or as a list of `KEY=VALUE` strings
#[derive(Deserialize)]
#[serde(untagged)]
enum EnvironmentForm {
    Map(BTreeMap<String, String>),
    List(Vec<String>),
}

fn deserialize_environment<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<EnvironmentForm>::deserialize(deserializer)? {
        None => Ok(BTreeMap::new()),
        Some(EnvironmentForm::Map(vars)) => Ok(vars),
        Some(EnvironmentForm::List(entries)) => entries
            .into_iter()
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
                _ => Err(de::Error::custom(format!(
                    "environment entry '{}' is not KEY=VALUE",
                    entry
                ))),
            })
            .collect(),
    }
}

/// Deserialize a value that may be written as YAML `null`, using its default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
