//! macOS display bridging through XQuartz.
//!
//! Containers reach the host display over the loopback alias
//! `host.docker.internal`, which requires XQuartz to be running and to accept
//! connections from 127.0.0.1. When XQuartz is missing, the user is offered a
//! Homebrew installation; a fresh install only takes effect in a new login
//! session, so that path ends the invocation with an instruction instead of
//! launching.

use super::{DisplayAccess, DisplayStatus};
use crate::cli::OutputManager;
use crate::error::{ExternalToolError, Result};
use anyhow::Context;
use std::io::BufRead;
use std::path::Path;

/// Display address the container uses to reach XQuartz
pub(super) const DISPLAY_ADDRESS: &str = "host.docker.internal:0";

/// Maximum number of times the install offer is repeated
const MAX_PROMPT_ATTEMPTS: u32 = 3;

const XQUARTZ_APP: &str = "/Applications/Utilities/XQuartz.app";
const XQUARTZ_SERVER: &str = "/opt/X11/bin/Xquartz";
const XHOST: &str = "/opt/X11/bin/xhost";

/// Make sure XQuartz is present and reachable from the loopback address.
pub(super) fn ensure_display(output: &OutputManager) -> Result<DisplayStatus> {
    if !xquartz_installed() {
        return match confirm_install(std::io::stdin().lock(), output)? {
            InstallChoice::Proceed => {
                install_xquartz(output)?;
                Ok(DisplayStatus::Abort {
                    message: "XQuartz is installed. Log out and back in (or reboot) so the \
                              display server can register, then re-run docker-wine."
                        .to_string(),
                })
            }
            InstallChoice::Declined => Ok(DisplayStatus::Abort {
                message: "XQuartz is required for X11 forwarding. Nothing was launched."
                    .to_string(),
            }),
        };
    }

    whitelist_loopback(output);
    Ok(DisplayStatus::Ready(DisplayAccess {
        display: DISPLAY_ADDRESS.to_string(),
        xauthority: None,
    }))
}

fn xquartz_installed() -> bool {
    Path::new(XQUARTZ_APP).exists()
        || Path::new(XQUARTZ_SERVER).exists()
        || which::which("Xquartz").is_ok()
}

/// Answer to the install offer
#[derive(Debug, PartialEq, Eq)]
enum InstallChoice {
    Proceed,
    Declined,
}

/// Ask whether to install XQuartz, at most [`MAX_PROMPT_ATTEMPTS`] times.
///
/// An explicit decline is a successful non-answer to the launch (the caller
/// exits 0); running out of attempts is a failure.
fn confirm_install<R: BufRead>(mut input: R, output: &OutputManager) -> Result<InstallChoice> {
    output.warn("XQuartz is required for X11 forwarding but is not installed.");

    for _ in 0..MAX_PROMPT_ATTEMPTS {
        output.println("Install XQuartz with Homebrew now? [y/n]");
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // EOF: nobody is answering.
            break;
        }
        match line.trim() {
            "y" | "Y" | "yes" => return Ok(InstallChoice::Proceed),
            "n" | "N" | "no" => return Ok(InstallChoice::Declined),
            _ => {}
        }
    }

    Err(ExternalToolError::DisplayServerInstall {
        reason: format!("no answer after {MAX_PROMPT_ATTEMPTS} attempts"),
    }
    .into())
}

fn install_xquartz(output: &OutputManager) -> Result<()> {
    output.progress("Installing XQuartz (brew install --cask xquartz)...");

    let status = std::process::Command::new("brew")
        .args(["install", "--cask", "xquartz"])
        .status()
        .context("failed to invoke brew")?;

    if !status.success() {
        return Err(ExternalToolError::DisplayServerInstall {
            reason: format!("brew install --cask xquartz exited with {status}"),
        }
        .into());
    }

    output.success("XQuartz installed");
    Ok(())
}

/// Allow X connections from the loopback address. Best-effort: when the
/// display server is not up yet the whitelist call fails, which the launch
/// reports but survives.
fn whitelist_loopback(output: &OutputManager) {
    match std::process::Command::new(XHOST).arg("+127.0.0.1").output() {
        Ok(result) if result.status.success() => {}
        Ok(result) => {
            let stderr = String::from_utf8_lossy(&result.stderr);
            output.warn(&format!(
                "Could not whitelist 127.0.0.1 with xhost: {}",
                stderr.trim()
            ));
        }
        Err(e) => {
            output.warn(&format!("Could not run {XHOST}: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;
    use std::io::Cursor;

    #[test]
    fn first_valid_answer_wins() {
        let output = OutputManager::new();
        let choice = confirm_install(Cursor::new("y\n"), &output).unwrap();
        assert_eq!(choice, InstallChoice::Proceed);

        let choice = confirm_install(Cursor::new("no\n"), &output).unwrap();
        assert_eq!(choice, InstallChoice::Declined);
    }

    #[test]
    fn garbage_answers_are_retried_until_a_valid_one() {
        let output = OutputManager::new();
        let choice = confirm_install(Cursor::new("maybe\nY\n"), &output).unwrap();
        assert_eq!(choice, InstallChoice::Proceed);
    }

    #[test]
    fn exhausting_the_attempts_is_a_failure() {
        let output = OutputManager::new();
        let err = confirm_install(Cursor::new("a\nb\nc\nd\n"), &output).unwrap_err();
        assert!(matches!(
            err,
            LaunchError::ExternalTool(ExternalToolError::DisplayServerInstall { .. })
        ));
    }

    #[test]
    fn eof_counts_as_exhausted() {
        let output = OutputManager::new();
        let err = confirm_install(Cursor::new(""), &output).unwrap_err();
        assert!(matches!(
            err,
            LaunchError::ExternalTool(ExternalToolError::DisplayServerInstall { .. })
        ));
    }
}
