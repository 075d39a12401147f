//! Docker/Podman CLI container runtime
//!
//! Implements the ContainerRuntime trait by shelling out to the `docker` or
//! `podman` binary. Both accept the same subset of commands used here.

use crate::error::{ContainmeError, ContainmeResult};
use crate::orchestration::container::ContainerConfig;
use crate::orchestration::runtime::{ContainerRuntime, OutputStream};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

/// Which container CLI to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Docker,
    Podman,
}

impl RuntimeKind {
    /// Executable name
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Docker => "Docker",
            Self::Podman => "Podman",
        }
    }

    /// Parse a configured binary name
    pub fn from_binary(binary: &str) -> Option<Self> {
        match binary {
            "docker" => Some(Self::Docker),
            "podman" => Some(Self::Podman),
            _ => None,
        }
    }

    /// Check if the binary is installed
    pub async fn is_installed(&self) -> bool {
        Command::new(self.binary())
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// Container runtime driving the docker or podman CLI
pub struct CliRuntime {
    kind: RuntimeKind,
}

impl CliRuntime {
    pub fn new(kind: RuntimeKind) -> Self {
        Self { kind }
    }

    /// Execute a runtime command and return the output
    async fn exec(&self, args: &[&str]) -> ContainmeResult<std::process::Output> {
        debug!("Executing: {} {:?}", self.kind.binary(), args);

        Command::new(self.kind.binary())
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ContainmeError::command_failed(format!("{} {:?}", self.kind.binary(), args), e)
            })
    }

    /// Execute a command, mapping a non-zero exit to `CommandExecution`
    async fn exec_ok(&self, args: &[&str]) -> ContainmeResult<String> {
        let output = self.exec(args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ContainmeError::command_exec(
                format!("{} {}", self.kind.binary(), args.first().unwrap_or(&"")),
                String::from_utf8_lossy(&output.stderr).trim(),
            ))
        }
    }

    /// Pull an image
    async fn pull(&self, image: &str) -> ContainmeResult<()> {
        info!("Pulling image: {}", image);

        let output = self.exec(&["pull", image]).await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ContainmeError::ImagePull(format!("{}: {}", image, stderr.trim())))
        }
    }

    /// Arguments for `create`, excluding the command
    fn create_args(config: &ContainerConfig) -> Vec<String> {
        let mut args = vec!["create".to_string()];

        if !config.name.is_empty() {
            args.push("--name".to_string());
            args.push(config.name.clone());
        }

        if config.tty {
            args.push("-t".to_string());
        }

        args.push("-w".to_string());
        args.push(config.workdir.clone());

        for bind in &config.binds {
            args.push("-v".to_string());
            args.push(bind.clone());
        }

        for (k, v) in &config.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", k, v));
        }

        for (k, v) in &config.labels {
            args.push("--label".to_string());
            args.push(format!("{}={}", k, v));
        }

        args.push(config.image.clone());
        args
    }

    fn label_args(flag: &str, labels: &BTreeMap<String, String>) -> Vec<String> {
        labels
            .iter()
            .flat_map(|(k, v)| [flag.to_string(), format!("label={}={}", k, v)])
            .collect()
    }
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    async fn ensure_ready(&self) -> ContainmeResult<()> {
        let output = Command::new(self.kind.binary())
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ContainmeError::RuntimeUnavailable {
                runtime: self.kind.name().to_string(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ContainmeError::RuntimeUnavailable {
                runtime: self.kind.name().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
        command: &[String],
    ) -> ContainmeResult<String> {
        if self.inspect_image(&config.image).await.is_err() {
            self.pull(&config.image).await?;
        }

        let mut args = Self::create_args(config);
        args.extend(command.iter().cloned());

        let args_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.exec(&args_refs).await?;

        if output.status.success() {
            let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
            debug!("Container created: {}", short_id(&container_id));
            Ok(container_id)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ContainmeError::ContainerCreate(stderr.trim().to_string()))
        }
    }

    async fn start_container(&self, container_id: &str) -> ContainmeResult<()> {
        let output = self.exec(&["start", container_id]).await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ContainmeError::ContainerStart(stderr.trim().to_string()))
        }
    }

    async fn attach_output(&self, container_id: &str) -> ContainmeResult<OutputStream> {
        // `logs --follow` replays output from container start, so nothing
        // written before we attach is lost.
        let mut child = Command::new(self.kind.binary())
            .args(["logs", "--follow", container_id])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ContainmeError::command_failed(format!("{} logs", self.kind.binary()), e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ContainmeError::Internal("log follower stdout not piped".to_string()))?;

        Ok(Box::pin(LogFollower {
            _child: child,
            stdout,
        }))
    }

    async fn wait_container(&self, container_id: &str) -> ContainmeResult<i64> {
        let out = self.exec_ok(&["wait", container_id]).await?;
        out.lines()
            .last()
            .and_then(|line| line.trim().parse().ok())
            .ok_or_else(|| {
                ContainmeError::command_exec(
                    format!("{} wait", self.kind.binary()),
                    format!("unexpected exit status output: {}", out),
                )
            })
    }

    async fn commit_container(
        &self,
        container_id: &str,
        labels: &BTreeMap<String, String>,
    ) -> ContainmeResult<String> {
        let mut args = vec!["commit".to_string()];
        for (k, v) in labels {
            args.push("--change".to_string());
            args.push(format!("LABEL {}={}", k, v));
        }
        args.push(container_id.to_string());

        let args_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.exec(&args_refs).await?;

        if output.status.success() {
            // podman prints progress before the ID; the ID is the last line
            let stdout = String::from_utf8_lossy(&output.stdout);
            stdout
                .lines()
                .last()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ContainmeError::ContainerCommit("no image ID returned".to_string()))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ContainmeError::ContainerCommit(stderr.trim().to_string()))
        }
    }

    async fn remove_container(&self, container_id: &str) -> ContainmeResult<()> {
        debug!("Removing container: {}", short_id(container_id));

        let output = self.exec(&["rm", "-f", container_id]).await?;
        if output.status.success() {
            return Ok(());
        }

        // Ignore error if container doesn't exist
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.to_lowercase().contains("no such container") {
            Ok(())
        } else {
            Err(ContainmeError::command_exec(
                format!("{} rm", self.kind.binary()),
                stderr.trim(),
            ))
        }
    }

    async fn inspect_image(&self, image: &str) -> ContainmeResult<()> {
        let output = self.exec(&["image", "inspect", image]).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ContainmeError::ImageNotFound(image.to_string()))
        }
    }

    async fn list_images(&self, labels: &BTreeMap<String, String>) -> ContainmeResult<Vec<String>> {
        let mut args = vec!["images".to_string(), "-q".to_string(), "--no-trunc".to_string()];
        args.extend(Self::label_args("--filter", labels));

        let args_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.exec_ok(&args_refs).await?;

        let mut ids: Vec<String> = out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        // tagged images show up once per tag
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn create_volume(&self, labels: &BTreeMap<String, String>) -> ContainmeResult<String> {
        let mut args = vec!["volume".to_string(), "create".to_string()];
        for (k, v) in labels {
            args.push("--label".to_string());
            args.push(format!("{}={}", k, v));
        }

        let args_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.exec(&args_refs).await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let path = labels
                .get(crate::orchestration::container::labels::DIR)
                .cloned()
                .unwrap_or_default();
            Err(ContainmeError::VolumeCreate {
                path,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    async fn remove_volume(&self, name: &str) -> ContainmeResult<()> {
        let output = self.exec(&["volume", "rm", name]).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ContainmeError::VolumeRemove {
                name: name.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn runtime_name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Output of a `logs --follow` child; keeps the child alive while reading
struct LogFollower {
    _child: Child,
    stdout: ChildStdout,
}

impl AsyncRead for LogFollower {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

/// First 12 characters of a container or image ID
pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.char_indices().nth(12).map_or(id, |(i, _)| &id[..i])
}
