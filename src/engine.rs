//! Run-mode decision engine.
//!
//! Turns a read-only [`LaunchConfig`] plus the host platform into one of the
//! terminal outcomes: an interactive launch, a detached RDP launch, a kill,
//! a kill-then-relaunch, or an abort with a user-facing instruction.
//! Resolution runs in stages: the identity decides the working directory,
//! the RDP mode decides the run mode, and the launch arguments are assembled
//! last. `--rdp=stop` never assembles launch arguments and never resolves an
//! image.
//!
//! The engine performs no external calls itself; display and audio wiring
//! comes in through the [`HostBridge`] trait so the decision logic stays
//! testable with a stub host.

use crate::cli::{DEFAULT_HOME_VOLUME, Identity, LaunchConfig, RdpMode};
use crate::error::{Result, ValidationError};
use crate::host::{DisplayStatus, HostBridge, HostPlatform};

/// Fixed name of the single managed container
pub const CONTAINER_NAME: &str = "wine";

/// Command used when the user supplies none
pub const DEFAULT_COMMAND: &str = "/bin/bash";

/// RDP port inside the container
const RDP_CONTAINER_PORT: u16 = 3389;

/// In-container path the host X-authority file is mounted at
const CONTAINER_XAUTHORITY: &str = "/root/.Xauthority";

/// In-container path the host PulseAudio socket is mounted at
const CONTAINER_PULSE_SOCKET: &str = "/run/pulse/native";

/// A fully assembled container launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Image reference (`name:tag`)
    pub image: String,
    /// Refresh the image before running
    pub pull: bool,
    /// Create the default named volume if it does not exist yet
    pub ensure_default_volume: bool,
    /// Volume backing the home directory (named volume or host path)
    pub home_volume: String,
    /// Foreground with a TTY (`--rm -it`) vs detached daemon (`--detach`)
    pub interactive: bool,
    /// Host/container port pair published for RDP
    pub publish: Option<(u16, u16)>,
    /// Ordered `--volume=` tokens
    pub mounts: Vec<String>,
    /// Ordered `--env=` tokens
    pub env: Vec<String>,
    /// Ordered `--device=` tokens
    pub devices: Vec<String>,
    /// In-container working directory
    pub workdir: String,
    /// In-container command; empty runs the image entrypoint
    pub command: Vec<String>,
}

impl LaunchPlan {
    /// The full argument vector for `docker run`, in launch order.
    ///
    /// Pass-through tokens appear exactly as parsed; nothing is reformatted.
    pub fn docker_run_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];

        if self.interactive {
            args.push("--rm".to_string());
            args.push("-it".to_string());
        } else {
            args.push("--detach".to_string());
        }

        args.push(format!("--name={CONTAINER_NAME}"));
        args.push(format!("--hostname={CONTAINER_NAME}"));

        if let Some((host, container)) = self.publish {
            args.push(format!("--publish={host}:{container}"));
        }

        args.extend(self.mounts.iter().cloned());
        args.extend(self.env.iter().cloned());
        args.extend(self.devices.iter().cloned());

        args.push(format!("--workdir={}", self.workdir));
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());

        args
    }
}

/// Terminal outcome of resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// Launch in the foreground and wait for the container to exit
    Interactive(LaunchPlan),
    /// Launch detached and return immediately
    Detached(LaunchPlan),
    /// Kill the named container; nothing is launched or resolved
    Kill {
        /// Container to kill
        container: String,
    },
    /// Kill the named container (best-effort), then launch detached
    Restart {
        /// Plan for the relaunch
        plan: LaunchPlan,
    },
    /// Stop the whole invocation with a message and a success exit code
    Aborted {
        /// Instruction shown to the user
        message: String,
    },
}

/// Resolve the configuration into a terminal outcome.
pub fn resolve(
    config: &LaunchConfig,
    platform: HostPlatform,
    bridge: &dyn HostBridge,
) -> Result<EngineOutcome> {
    // Commands run over X11; an RDP session has its own way of starting
    // programs.
    if config.rdp != RdpMode::Disabled && !config.command.is_empty() {
        return Err(ValidationError::RdpCommandConflict.into());
    }

    match config.rdp {
        RdpMode::Stop => Ok(EngineOutcome::Kill {
            container: CONTAINER_NAME.to_string(),
        }),
        RdpMode::Start => Ok(EngineOutcome::Detached(assemble_rdp(config, false))),
        RdpMode::Restart => Ok(EngineOutcome::Restart {
            plan: assemble_rdp(config, false),
        }),
        RdpMode::Interactive => Ok(EngineOutcome::Interactive(assemble_rdp(config, true))),
        RdpMode::Disabled => resolve_x11(config, platform, bridge),
    }
}

/// RDP branch: publish the port and let the image's entrypoint start the
/// server. Interactive RDP keeps a foreground shell; detached RDP runs the
/// entrypoint alone.
fn assemble_rdp(config: &LaunchConfig, interactive: bool) -> LaunchPlan {
    let command = if interactive {
        vec![DEFAULT_COMMAND.to_string()]
    } else {
        Vec::new()
    };

    assemble(
        config,
        interactive,
        Some((config.rdp_port, RDP_CONTAINER_PORT)),
        Vec::new(),
        vec!["--env=RDP_SERVER=yes".to_string()],
        command,
    )
}

/// X11 branch: bridge the host display (which may abort the invocation),
/// wire up audio on Linux, then launch interactively.
fn resolve_x11(
    config: &LaunchConfig,
    platform: HostPlatform,
    bridge: &dyn HostBridge,
) -> Result<EngineOutcome> {
    if platform == HostPlatform::Unsupported {
        return Err(ValidationError::UnsupportedPlatform {
            os: std::env::consts::OS.to_string(),
        }
        .into());
    }

    let access = match bridge.ensure_display(platform)? {
        DisplayStatus::Ready(access) => access,
        DisplayStatus::Abort { message } => return Ok(EngineOutcome::Aborted { message }),
    };

    let mut mounts = Vec::new();
    let mut env = vec![format!("--env=DISPLAY={}", access.display)];

    if platform == HostPlatform::Linux {
        mounts.push("--volume=/tmp/.X11-unix:/tmp/.X11-unix:ro".to_string());
    }

    if let Some(xauthority) = &access.xauthority {
        mounts.push(format!(
            "--volume={}:{CONTAINER_XAUTHORITY}:ro",
            xauthority.display()
        ));
        env.push(format!("--env=XAUTHORITY={CONTAINER_XAUTHORITY}"));
    }

    if platform == HostPlatform::Linux {
        if let Some(socket) = bridge.audio_socket() {
            mounts.push(format!(
                "--volume={}:{CONTAINER_PULSE_SOCKET}",
                socket.display()
            ));
            env.push(format!("--env=PULSE_SERVER=unix:{CONTAINER_PULSE_SOCKET}"));
        } else {
            log::debug!("no pulseaudio socket found; container runs without sound");
        }
    }

    let command = if config.command.is_empty() {
        vec![DEFAULT_COMMAND.to_string()]
    } else {
        config.command.clone()
    };

    Ok(EngineOutcome::Interactive(assemble(
        config,
        true,
        None,
        mounts,
        env,
        command,
    )))
}

/// Assemble the launch plan: home mount first, then user pass-through
/// tokens verbatim, then the engine's own contributions.
fn assemble(
    config: &LaunchConfig,
    interactive: bool,
    publish: Option<(u16, u16)>,
    bridge_mounts: Vec<String>,
    mode_env: Vec<String>,
    command: Vec<String>,
) -> LaunchPlan {
    let home_path = config.home_path();

    let mut mounts = vec![format!("--volume={}:{home_path}", config.home_volume)];
    mounts.extend(config.extra_mounts.iter().cloned());
    mounts.extend(bridge_mounts);

    let mut env = config.extra_env.clone();
    if config.home_path.is_some() {
        env.push(format!("--env=USER_HOME={home_path}"));
    }
    if config.force_owner {
        env.push("--env=FORCED_OWNERSHIP=yes".to_string());
    }
    env.extend(mode_env);

    // Root always starts at the filesystem root, whatever --workdir said.
    let workdir = match config.identity {
        Identity::Root => "/".to_string(),
        _ => config.workdir.clone().unwrap_or(home_path),
    };

    let plan = LaunchPlan {
        image: config.image.reference(),
        pull: config.pull && config.image.is_remote(),
        ensure_default_volume: config.home_volume == DEFAULT_HOME_VOLUME,
        home_volume: config.home_volume.clone(),
        interactive,
        publish,
        mounts,
        env,
        devices: config.extra_devices.clone(),
        workdir,
        command,
    };

    log::debug!("assembled launch plan: docker {}", plan.docker_run_args().join(" "));
    plan
}
