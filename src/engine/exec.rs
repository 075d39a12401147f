//! Running a single step as a container

use super::Engine;
use crate::error::{ContainmeError, ContainmeResult};
use crate::orchestration::{labels, short_id, OutputStream};
use crate::spec::{PlannedStep, Step};
use crate::ui::OutputSink;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long a failed step's output drain may run after its container is gone
const DRAIN_GRACE: Duration = Duration::from_secs(5);

impl Engine {
    /// Run one command on top of the head image and commit the result.
    ///
    /// On success the committed image becomes the new head and the step
    /// counter advances. On failure the head is unchanged. The container is
    /// removed either way.
    pub async fn run_stage_command(
        &mut self,
        stage_label: &str,
        step: &Step,
    ) -> ContainmeResult<String> {
        let image = self.head_image.clone();

        let mut commit_labels = BTreeMap::new();
        commit_labels.insert(labels::BUILD.to_string(), self.build_id.clone());
        if step.options.cache {
            commit_labels.insert(
                labels::HASH.to_string(),
                self.cmd_hash(stage_label, &step.command),
            );
            commit_labels.insert(labels::PARENT.to_string(), image.clone());
        }

        let next = self
            .run_in_image(&image, stage_label, step, &commit_labels)
            .await?;

        self.head_image = next.clone();
        self.step_count += 1;
        Ok(next)
    }

    /// Run a one-off command on the environment checkpoint.
    ///
    /// The resulting image is returned but does not become the head.
    pub async fn exec_in_environment(&self, command: &str) -> ContainmeResult<String> {
        let image = self
            .environment_image
            .clone()
            .unwrap_or_else(|| self.head_image.clone());

        let mut commit_labels = BTreeMap::new();
        commit_labels.insert(labels::BUILD.to_string(), self.build_id.clone());

        self.run_in_image(&image, "environment-exec", &Step::new(command), &commit_labels)
            .await
    }

    /// Run a planned step, reusing a cached image for cacheable steps
    pub(super) async fn run_planned(&mut self, planned: &PlannedStep) -> ContainmeResult<()> {
        let label = planned.label();

        if planned.step.options.cache {
            let hash = self.cmd_hash(&label, &planned.step.command);
            let cached = self.find_cached_image(&hash, &self.head_image).await;
            match cached {
                Ok(Some(image)) => {
                    self.sink.progress(&format!(
                        "Stage({}): Using cached image({}) for ({})",
                        label,
                        short_id(&image),
                        planned.step.command
                    ));
                    self.head_image = image;
                    self.step_count += 1;
                    return Ok(());
                }
                Ok(None) => debug!("No cached image for {} ({})", planned.step.command, hash),
                Err(e) => warn!("Step cache lookup failed, running step: {}", e),
            }
        }

        self.run_stage_command(&label, &planned.step).await?;
        Ok(())
    }

    async fn run_in_image(
        &self,
        image: &str,
        stage_label: &str,
        step: &Step,
        commit_labels: &BTreeMap<String, String>,
    ) -> ContainmeResult<String> {
        let step_no = self.step_count;
        let timeout = step.timeout(self.default_timeout);
        let fail = |source: ContainmeError| ContainmeError::StepFailed {
            stage: stage_label.to_string(),
            step: step_no,
            command: step.command.clone(),
            source: Box::new(source),
        };

        self.sink.progress(&format!(
            "Stage({}): Running command ({}) for build-step-{} in image({})",
            stage_label,
            step.command,
            step_no,
            short_id(image)
        ));

        let config = self.container_config(image, step);
        let command = self.profile.make_cmd(&step.command);

        let container_id = self
            .runtime
            .create_container(&config, &command)
            .await
            .map_err(fail)?;

        let mut drain = None;
        let result = self
            .drive_container(&container_id, timeout, commit_labels, &mut drain)
            .await;

        if let Err(e) = self.runtime.remove_container(&container_id).await {
            warn!(
                "Failed to remove build-step-{} container {}: {}",
                step_no,
                short_id(&container_id),
                e
            );
        }

        // Removal closes the output stream, which ends the drain
        if let Some(handle) = drain {
            finish_drain(handle).await;
        }

        result.map_err(fail)
    }

    async fn drive_container(
        &self,
        container_id: &str,
        timeout: Duration,
        commit_labels: &BTreeMap<String, String>,
        drain: &mut Option<JoinHandle<()>>,
    ) -> ContainmeResult<String> {
        self.runtime.start_container(container_id).await?;

        match self.runtime.attach_output(container_id).await {
            Ok(stream) => *drain = Some(spawn_drain(stream, Arc::clone(&self.sink))),
            Err(e) => warn!(
                "Failed to attach to output of {}: {}",
                short_id(container_id),
                e
            ),
        }

        let code = tokio::time::timeout(timeout, self.runtime.wait_container(container_id))
            .await
            .map_err(|_| ContainmeError::StepTimeout {
                secs: timeout.as_secs(),
            })??;

        // All output must be flushed before the step is reported complete
        if let Some(handle) = drain.take() {
            if let Err(e) = handle.await {
                warn!("Output drain task failed: {}", e);
            }
        }

        if code != 0 {
            return Err(ContainmeError::CommandExit { code });
        }

        self.runtime
            .commit_container(container_id, commit_labels)
            .await
    }
}

/// Forward a container's output to the sink until the stream closes
fn spawn_drain(mut stream: OutputStream, sink: Arc<dyn OutputSink>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 8192];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => sink.write_output(&buf[..n]),
                Err(e) => {
                    debug!("Output stream closed: {}", e);
                    break;
                }
            }
        }
    })
}

async fn finish_drain(mut handle: JoinHandle<()>) {
    if tokio::time::timeout(DRAIN_GRACE, &mut handle).await.is_err() {
        debug!("Output stream still open after container removal, abandoning");
        handle.abort();
    }
}
