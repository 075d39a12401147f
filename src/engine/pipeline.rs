//! The full four-stage pipeline

use super::Engine;
use crate::error::ContainmeResult;
use crate::spec::Stage;
use crate::state::{BuildState, StateStore};
use tracing::{info, warn};

/// Which stage checkpoints a pipeline run may reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub use_environment_cache: bool,
    pub use_dependencies_cache: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            use_environment_cache: true,
            use_dependencies_cache: true,
        }
    }
}

impl Engine {
    /// Run every stage in order, persisting checkpoints as they are produced.
    ///
    /// `state` is updated in place and saved after the environment and
    /// dependencies stages, so a later failure keeps earlier progress. A
    /// rebuilt environment invalidates the stored dependencies checkpoint.
    pub async fn run_pipeline(
        &mut self,
        state: &mut BuildState,
        store: &StateStore,
        options: PipelineOptions,
    ) -> ContainmeResult<()> {
        let previous_env = state.checkpoint(Stage::Environment).map(str::to_string);
        let env_image = self
            .run_environment_stage(options.use_environment_cache, previous_env.as_deref())
            .await?;
        state.set_checkpoint(Stage::Environment, env_image.as_str());
        persist(store, state).await;

        let mut use_deps_cache = options.use_dependencies_cache;
        if use_deps_cache && previous_env.as_deref() != Some(env_image.as_str()) {
            info!("Environment changed, not reusing dependencies checkpoint");
            use_deps_cache = false;
        }

        let previous_deps = state.checkpoint(Stage::Dependencies).map(str::to_string);
        let deps_image = self
            .run_dependencies_stage(use_deps_cache, previous_deps.as_deref())
            .await?;
        state.set_checkpoint(Stage::Dependencies, deps_image);
        persist(store, state).await;

        self.run_test_stage().await?;
        self.run_package_stage().await?;

        info!("Build {} finished at {}", self.build_id, self.head_image);
        Ok(())
    }
}

async fn persist(store: &StateStore, state: &BuildState) {
    if let Err(e) = store.save(state).await {
        warn!("Failed to save build state to {}: {}", store.path().display(), e);
    }
}
