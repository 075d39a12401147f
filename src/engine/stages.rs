//! Stage composition and checkpoint caching

use super::Engine;
use crate::error::{ContainmeError, ContainmeResult};
use crate::orchestration::short_id;
use crate::spec::{PlannedStep, Stage};
use tracing::{info, warn};

impl Engine {
    /// Prepare the build environment.
    ///
    /// The profile must name an image; cache volumes are created next. With `use_cache` and a verifiable
    /// `cached` checkpoint the stage is skipped entirely; otherwise the
    /// environment steps run on the profile's base image.
    pub async fn run_environment_stage(
        &mut self,
        use_cache: bool,
        cached: Option<&str>,
    ) -> ContainmeResult<String> {
        if self.profile.image.is_empty() {
            return Err(ContainmeError::ProfileInvalid(
                "profile does not name an image".to_string(),
            ));
        }

        self.create_volumes().await?;

        if let Some(image) = self.cached_checkpoint(Stage::Environment, use_cache, cached).await {
            self.environment_image = Some(image.clone());
            return Ok(image);
        }

        self.head_image = self.profile.image.clone();
        let plan = self.spec.environment.base.plan(Stage::Environment, &[]);
        self.run_plan(Stage::Environment, plan).await?;

        self.environment_image = Some(self.head_image.clone());
        Ok(self.head_image.clone())
    }

    /// Install dependencies on top of the environment.
    ///
    /// Same cache shape as the environment stage. On a miss, `before`, then
    /// `override` or the profile's dependency steps, then `after` run.
    pub async fn run_dependencies_stage(
        &mut self,
        use_cache: bool,
        cached: Option<&str>,
    ) -> ContainmeResult<String> {
        if let Some(image) = self.cached_checkpoint(Stage::Dependencies, use_cache, cached).await {
            self.dependencies_image = Some(image.clone());
            return Ok(image);
        }

        let plan = self
            .spec
            .dependencies
            .plan(Stage::Dependencies, &self.profile.dependencies);
        self.run_plan(Stage::Dependencies, plan).await?;

        self.dependencies_image = Some(self.head_image.clone());
        Ok(self.head_image.clone())
    }

    /// Run the tests. Never cached.
    pub async fn run_test_stage(&mut self) -> ContainmeResult<String> {
        let plan = self.spec.test.plan(Stage::Test, &self.profile.test);
        self.run_plan(Stage::Test, plan).await?;
        Ok(self.head_image.clone())
    }

    /// Packaging is not executed; a configured tag is reported and skipped.
    pub async fn run_package_stage(&mut self) -> ContainmeResult<()> {
        let docker = &self.spec.package.docker;
        if !docker.tag.is_empty() {
            self.sink.warn(&format!(
                "Stage(package): packaging into {} is not supported, skipping",
                docker.tag
            ));
        }
        Ok(())
    }

    async fn run_plan(&mut self, stage: Stage, plan: Vec<PlannedStep>) -> ContainmeResult<()> {
        if plan.is_empty() {
            info!("Stage({}): nothing to run", stage);
            return Ok(());
        }

        for planned in &plan {
            self.run_planned(planned).await?;
        }
        Ok(())
    }

    /// Adopt `cached` as the head if caching is on and the image still exists
    async fn cached_checkpoint(
        &mut self,
        stage: Stage,
        use_cache: bool,
        cached: Option<&str>,
    ) -> Option<String> {
        let image = cached.filter(|image| use_cache && !image.is_empty())?;

        match self.runtime.inspect_image(image).await {
            Ok(()) => {
                self.sink.progress(&format!(
                    "Stage({}): Using cached image({})",
                    stage,
                    short_id(image)
                ));
                self.head_image = image.to_string();
                Some(image.to_string())
            }
            Err(e) => {
                let err = ContainmeError::CacheVerification {
                    image: image.to_string(),
                    reason: e.to_string(),
                };
                warn!("{}", err);
                self.sink
                    .warn(&format!("Stage({}): {}, rebuilding", stage, err));
                None
            }
        }
    }
}
