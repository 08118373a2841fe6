//! Container runtime invocation.
//!
//! Everything here shells out to the `docker` CLI: the upfront daemon
//! availability probe, image pulls, creation of the default home volume, and
//! the final `docker run` / `docker kill` dispatch. The probe is the only
//! call with a timeout; pulls and runs are user-visible and run unbounded.

use crate::cli::OutputManager;
use crate::engine::LaunchPlan;
use crate::error::{EnvironmentError, ExternalToolError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// Timeout for the daemon availability check.
/// A quick probe; a healthy daemon answers well within this.
pub const DOCKER_INFO_TIMEOUT: Duration = Duration::from_secs(5);

/// Platform-specific Docker startup instructions
#[cfg(target_os = "macos")]
const DOCKER_START_HELP: &str = "Start Docker Desktop from Applications or Spotlight.";

#[cfg(target_os = "linux")]
const DOCKER_START_HELP: &str = "Start the Docker daemon: sudo systemctl start docker";

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const DOCKER_START_HELP: &str = "Start the Docker daemon.";

/// Checks that the docker binary exists and the daemon answers.
///
/// Called once, before any credential prompting or resolution work.
pub async fn check_docker_available() -> Result<()> {
    if let Err(e) = which::which("docker") {
        return Err(EnvironmentError::DockerNotFound {
            reason: e.to_string(),
        }
        .into());
    }

    let status_result = timeout(
        DOCKER_INFO_TIMEOUT,
        Command::new("docker")
            .arg("info")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status(),
    )
    .await;

    match status_result {
        // Timeout occurred
        Err(_) => Err(EnvironmentError::DockerUnresponsive {
            reason: format!(
                "daemon check timed out after {} seconds",
                DOCKER_INFO_TIMEOUT.as_secs()
            ),
            help: DOCKER_START_HELP,
        }
        .into()),

        // Probe ran and the daemon answered
        Ok(Ok(status)) if status.success() => Ok(()),

        // Binary exists but the daemon is not answering
        Ok(Ok(status)) => Err(EnvironmentError::DockerUnresponsive {
            reason: format!(
                "docker info exited with code {}",
                status.code().unwrap_or(-1)
            ),
            help: DOCKER_START_HELP,
        }
        .into()),

        // Spawning the probe failed outright
        Ok(Err(e)) => Err(EnvironmentError::DockerNotFound {
            reason: e.to_string(),
        }
        .into()),
    }
}

/// Pulls an image, streaming progress lines. A pull failure is fatal.
pub async fn pull_image(image: &str, output: &OutputManager) -> Result<()> {
    output.progress(&format!("Pulling {image}..."));

    let mut child = Command::new("docker")
        .args(["pull", image])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ExternalToolError::ImagePull {
            image: image.to_string(),
            reason: e.to_string(),
        })?;

    // Collect stderr in the background for the failure message while stdout
    // streams in the foreground.
    let stderr_handle = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            let mut captured = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                captured.push(line);
            }
            captured
        })
    });

    if let Some(stdout) = child.stdout.take() {
        let reader = BufReader::new(stdout);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            output.indent(&line);
        }
    }

    let status = child.wait().await.map_err(|e| ExternalToolError::ImagePull {
        image: image.to_string(),
        reason: e.to_string(),
    })?;

    if !status.success() {
        let stderr_lines = match stderr_handle {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };
        let reason = if stderr_lines.is_empty() {
            format!("exit code {}", status.code().unwrap_or(-1))
        } else {
            stderr_lines.join("\n")
        };
        return Err(ExternalToolError::ImagePull {
            image: image.to_string(),
            reason,
        }
        .into());
    }

    Ok(())
}

/// Creates the named volume if it does not exist yet.
pub async fn ensure_volume(name: &str, output: &OutputManager) -> Result<()> {
    let inspect = Command::new("docker")
        .args(["volume", "inspect", name])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if inspect.success() {
        log::debug!("volume '{name}' already exists");
        return Ok(());
    }

    output.progress(&format!("Creating volume '{name}'..."));
    let create = Command::new("docker")
        .args(["volume", "create", name])
        .output()
        .await?;

    if !create.status.success() {
        return Err(ExternalToolError::VolumeCreate {
            volume: name.to_string(),
            reason: String::from_utf8_lossy(&create.stderr).trim().to_string(),
        }
        .into());
    }

    Ok(())
}

/// Runs the container in the foreground with inherited stdio and returns its
/// exit code as the launcher's own.
pub async fn run_interactive(plan: &LaunchPlan) -> Result<i32> {
    let args = plan.docker_run_args();
    log::debug!("docker {}", args.join(" "));

    let status = Command::new("docker")
        .args(&args)
        .status()
        .await
        .map_err(|e| ExternalToolError::ContainerRun {
            reason: e.to_string(),
        })?;

    Ok(status.code().unwrap_or(1))
}

/// Runs the container detached and reports the short container id.
pub async fn run_detached(plan: &LaunchPlan, output: &OutputManager) -> Result<()> {
    let args = plan.docker_run_args();
    log::debug!("docker {}", args.join(" "));

    let result = Command::new("docker")
        .args(&args)
        .output()
        .await
        .map_err(|e| ExternalToolError::ContainerRun {
            reason: e.to_string(),
        })?;

    if !result.status.success() {
        return Err(ExternalToolError::ContainerRun {
            reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        }
        .into());
    }

    let id = String::from_utf8_lossy(&result.stdout).trim().to_string();
    output.success(&format!(
        "Container started ({})",
        &id[..12.min(id.len())]
    ));
    Ok(())
}

/// Kills the named container. Returns whether anything was actually killed;
/// a missing container is the caller's business, not an error.
pub async fn kill_container(name: &str) -> Result<bool> {
    let result = Command::new("docker")
        .args(["kill", name])
        .output()
        .await?;
    Ok(result.status.success())
}
