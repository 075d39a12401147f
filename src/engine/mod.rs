//! Stage execution engine
//!
//! Turns a build spec and its profile into a chain of container runs. Each
//! step runs in a fresh container created from the current head image; on
//! success the container is committed and the new image becomes the head.
//!
//! | Stage        | Default steps        | Cached                     |
//! |--------------|----------------------|----------------------------|
//! | environment  | none                 | whole stage, by checkpoint |
//! | dependencies | profile dependencies | whole stage, by checkpoint |
//! | test         | profile test         | never                      |
//! | package      | not executed         | -                          |
//!
//! Steps marked `cache: true` may additionally reuse an image committed by
//! an earlier build for the same command on the same parent image.

mod exec;
mod pipeline;
mod stages;


pub use pipeline::PipelineOptions;

use crate::error::{ContainmeError, ContainmeResult};
use crate::orchestration::{labels, ContainerConfig, ContainerRuntime};
use crate::spec::{BuildSpec, ProfileSpec, Step, DEFAULT_STEP_TIMEOUT_SECS};
use crate::ui::{ConsoleSink, OutputSink};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Builds one spec against one container runtime
pub struct Engine {
    runtime: Arc<dyn ContainerRuntime>,
    sink: Arc<dyn OutputSink>,

    /// Random ID namespacing this build's containers and volumes
    build_id: String,
    /// Host directory bind-mounted at the workspace
    workdir: PathBuf,

    spec: BuildSpec,
    profile: ProfileSpec,

    /// Image the next step runs on
    head_image: String,
    environment_image: Option<String>,
    dependencies_image: Option<String>,
    step_count: usize,

    /// container path -> volume name
    volumes: BTreeMap<String, String>,

    default_timeout: Duration,
}

impl Engine {
    /// Create an engine, failing if the runtime cannot be reached
    pub async fn new(
        runtime: Arc<dyn ContainerRuntime>,
        workdir: impl Into<PathBuf>,
        spec: BuildSpec,
        profile: ProfileSpec,
    ) -> ContainmeResult<Self> {
        runtime.ensure_ready().await?;

        let build_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        debug!("Build {} using {}", build_id, runtime.runtime_name());

        Ok(Self {
            runtime,
            sink: Arc::new(ConsoleSink::default()),
            build_id,
            workdir: workdir.into(),
            head_image: profile.image.clone(),
            spec,
            profile,
            environment_image: None,
            dependencies_image: None,
            step_count: 0,
            volumes: BTreeMap::new(),
            default_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
        })
    }

    /// Send progress and step output to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Deadline for steps without their own `timeout`
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    pub fn head_image(&self) -> &str {
        &self.head_image
    }

    pub fn environment_image(&self) -> Option<&str> {
        self.environment_image.as_deref()
    }

    pub fn dependencies_image(&self) -> Option<&str> {
        self.dependencies_image.as_deref()
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn volumes(&self) -> &BTreeMap<String, String> {
        &self.volumes
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Working directory of the build inside the container.
    ///
    /// The profile workspace, overridden by the environment stage's
    /// `workspace`: absolute paths verbatim, relative ones joined on.
    pub fn workspace_dir(&self) -> String {
        join_container_path(&self.profile.workspace, &self.spec.environment.workspace)
    }

    /// Container configuration for running `step` on `image`
    pub fn container_config(&self, image: &str, step: &Step) -> ContainerConfig {
        let workspace = self.workspace_dir();

        let workdir = match step.options.pwd.as_deref() {
            Some(pwd) if !pwd.is_empty() => join_container_path(&workspace, pwd),
            _ => workspace.clone(),
        };

        let mut binds = vec![format!("{}:{}", self.workdir.display(), workspace)];
        binds.extend(
            self.volumes
                .iter()
                .map(|(path, volume)| format!("{}:{}", volume, path)),
        );

        let mut container_labels = BTreeMap::new();
        container_labels.insert(labels::BUILD.to_string(), self.build_id.clone());

        ContainerConfig {
            name: format!("cme_builder_{}-{}", self.build_id, self.step_count),
            image: image.to_string(),
            workdir,
            binds,
            env: step.options.environment.clone(),
            labels: container_labels,
            tty: true,
        }
    }

    /// Cache key of a command: sha256 over profile, stage label and command
    pub fn cmd_hash(&self, stage_label: &str, command: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}.{}.{}",
            self.spec.environment.profile, stage_label, command
        ));
        hex::encode(hasher.finalize())
    }

    /// Image committed for `hash` on top of `parent`, if any
    pub async fn find_cached_image(
        &self,
        hash: &str,
        parent: &str,
    ) -> ContainmeResult<Option<String>> {
        let mut filter = BTreeMap::new();
        filter.insert(labels::HASH.to_string(), hash.to_string());
        filter.insert(labels::PARENT.to_string(), parent.to_string());

        let images = self.runtime.list_images(&filter).await?;
        match images.as_slice() {
            [] => Ok(None),
            [image] => Ok(Some(image.clone())),
            _ => Err(ContainmeError::CacheAmbiguous(hash.to_string())),
        }
    }

    /// Create one volume per profile cache directory.
    ///
    /// Directories that already have a volume in this build are skipped.
    pub async fn create_volumes(&mut self) -> ContainmeResult<()> {
        for path in &self.profile.cache_directories {
            if self.volumes.contains_key(path) {
                continue;
            }

            let mut volume_labels = BTreeMap::new();
            volume_labels.insert(labels::BUILD.to_string(), self.build_id.clone());
            volume_labels.insert(labels::DIR.to_string(), path.clone());

            let volume = self
                .runtime
                .create_volume(&volume_labels)
                .await
                .map_err(|e| ContainmeError::VolumeCreate {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

            debug!("Created volume {} for {}", volume, path);
            self.volumes.insert(path.clone(), volume);
        }
        Ok(())
    }

    /// Remove every volume created by this build
    pub async fn destroy_volumes(&mut self) -> ContainmeResult<()> {
        let paths: Vec<String> = self.volumes.keys().cloned().collect();
        for path in paths {
            if let Some(volume) = self.volumes.get(&path) {
                self.runtime.remove_volume(volume).await?;
                info!("Removed volume {} ({})", volume, path);
            }
            self.volumes.remove(&path);
        }
        Ok(())
    }
}

/// Join a container path onto a base, keeping absolute paths verbatim
fn join_container_path(base: &str, path: &str) -> String {
    let path = path.strip_prefix("./").unwrap_or(path);
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') || base.is_empty() {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path)
}
