//! CLI command implementations

pub mod config;
pub mod exec;
pub mod run;
pub mod version;

pub use config::execute as config;
pub use exec::execute as exec;
pub use run::execute as run;
pub use version::execute as version;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{ContainmeError, ContainmeResult};
use crate::orchestration::create_runtime;
use crate::spec::{resolve_reference, BuildSpec};
use crate::state::StateStore;
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Build spec and working tree an invocation operates on
#[derive(Debug, Clone)]
pub struct BuildPaths {
    pub spec_file: PathBuf,
    pub workdir: PathBuf,
}

impl BuildPaths {
    /// Resolve `--file` and `--workdir`, defaulting to the current directory
    pub fn resolve(
        file: Option<&Path>,
        workdir: Option<&Path>,
        config: &Config,
    ) -> ContainmeResult<Self> {
        let cwd = current_dir()?;

        let workdir = match workdir {
            Some(path) => path
                .canonicalize()
                .map_err(|e| ContainmeError::io(format!("resolving workdir {}", path.display()), e))?,
            None => cwd.clone(),
        };

        let spec_file = match file {
            Some(path) => cwd.join(path),
            None => cwd.join(&config.build.spec_file),
        };

        Ok(Self { spec_file, workdir })
    }

    /// State record location for this working tree
    pub fn state_store(&self, config: &Config) -> StateStore {
        StateStore::new(&self.workdir.join(&config.build.state_dir))
    }
}

/// Load the spec and its profile and connect to the runtime
pub(crate) async fn prepare_engine(
    paths: &BuildPaths,
    config: &Config,
    pb: &ProgressBar,
) -> ContainmeResult<Engine> {
    pb.set_message("Loading build spec...");
    let spec = BuildSpec::from_file(&paths.spec_file).await?;
    debug!("Loaded build spec {}", paths.spec_file.display());

    pb.set_message(format!("Resolving profile {}...", spec.environment.profile));
    let location = resolve_reference(&spec.environment.profile, &current_dir()?)?;
    let profile = location.load().await?;

    pb.set_message("Connecting to container runtime...");
    let runtime = create_runtime(&config.runtime).await?;
    debug!("Using runtime: {}", runtime.runtime_name());

    let engine = Engine::new(runtime, paths.workdir.clone(), spec, profile)
        .await?
        .with_default_timeout(config.build.default_timeout());
    Ok(engine)
}

fn current_dir() -> ContainmeResult<PathBuf> {
    env::current_dir().map_err(|e| ContainmeError::io("getting current directory", e))
}

pub(crate) fn create_progress_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
