//! Command line interface for docker-wine.
//!
//! Wires the stages together: option parsing, the upfront environment check,
//! credential resolution, the run-mode decision, and finally dispatch of the
//! decided outcome against the container runtime.

mod args;
mod output;

pub use args::{
    CredentialSource, DEFAULT_HOME_VOLUME, DEFAULT_LOCAL_IMAGE, DEFAULT_RDP_PORT,
    DEFAULT_REMOTE_IMAGE, DEFAULT_TAG, DEFAULT_USER, Identity, ImageSource, LaunchConfig, Parsed,
    RdpMode, parse, usage,
};
pub use output::OutputManager;

use crate::credential;
use crate::docker;
use crate::engine::{self, EngineOutcome, LaunchPlan};
use crate::error::Result;
use crate::host::{HostPlatform, NativeBridge};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let argv = std::env::args().skip(1).collect();
    run_with_args(argv).await
}

/// Run against an explicit argument vector (without the program name)
pub async fn run_with_args(argv: Vec<String>) -> Result<i32> {
    let output = OutputManager::new();

    let mut config = match args::parse(argv) {
        Ok(Parsed::Help) => {
            output.println(args::usage());
            return Ok(0);
        }
        Ok(Parsed::Launch(config)) => config,
        Err(e) if e.is_usage() => {
            output.error(&e.to_string());
            output.println("");
            output.println(args::usage());
            return Ok(1);
        }
        Err(e) => return Err(e),
    };

    // The container runtime is needed for every remaining outcome; fail fast
    // before prompting for anything.
    docker::check_docker_available().await?;

    credential::resolve(&mut config)?;

    let platform = HostPlatform::detect();
    let bridge = NativeBridge::new(&output);
    let outcome = engine::resolve(&config, platform, &bridge)?;

    dispatch(outcome, &output).await
}

/// Execute the decided outcome against the container runtime
async fn dispatch(outcome: EngineOutcome, output: &OutputManager) -> Result<i32> {
    match outcome {
        EngineOutcome::Aborted { message } => {
            output.info(&message);
            Ok(0)
        }
        EngineOutcome::Kill { container } => {
            if docker::kill_container(&container).await? {
                output.success(&format!("Stopped container '{container}'"));
            } else {
                output.info(&format!("No running container '{container}' to stop"));
            }
            Ok(0)
        }
        EngineOutcome::Restart { plan } => {
            // Best-effort: restarting a container that is not running is
            // just a start.
            if docker::kill_container(engine::CONTAINER_NAME).await? {
                output.info(&format!(
                    "Stopped container '{}'",
                    engine::CONTAINER_NAME
                ));
            }
            launch(&plan, output).await
        }
        EngineOutcome::Detached(plan) | EngineOutcome::Interactive(plan) => {
            launch(&plan, output).await
        }
    }
}

/// Resolve the image and volume, then run the plan
async fn launch(plan: &LaunchPlan, output: &OutputManager) -> Result<i32> {
    if plan.pull {
        docker::pull_image(&plan.image, output).await?;
    }
    if plan.ensure_default_volume {
        docker::ensure_volume(&plan.home_volume, output).await?;
    }

    if plan.interactive {
        docker::run_interactive(plan).await
    } else {
        docker::run_detached(plan, output).await?;
        Ok(0)
    }
}
