//! docker-wine - launch a containerized Wine runtime with RDP or X11 forwarding.
//!
//! This binary resolves the command line into a single container invocation,
//! bridges the host display where needed, and delegates the launch to the
//! docker CLI.

use docker_wine::cli;
use docker_wine::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new();
            output.error(&format!("{e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("");
                for suggestion in suggestions {
                    output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
