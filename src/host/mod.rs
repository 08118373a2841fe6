//! Host platform detection and the display/audio bridge.
//!
//! The launched container needs a reachable display server on the host (and,
//! on Linux, optionally an audio socket). How that is arranged is entirely
//! host-specific, so it sits behind the [`HostBridge`] trait: the decision
//! engine consumes the trait, the [`NativeBridge`] implements it against the
//! real host, and tests substitute a stub.

mod linux;
mod macos;

use crate::cli::OutputManager;
use crate::error::{Result, ValidationError};
use std::path::PathBuf;

pub use linux::audio_socket;

/// The host operating system, as far as display bridging is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    /// macOS, bridged through XQuartz
    MacOs,
    /// Linux, bridged through the host X server
    Linux,
    /// Anything else; launching is refused
    Unsupported,
}

impl HostPlatform {
    /// Detect the platform of the running host
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    fn from_os(os: &str) -> Self {
        match os {
            "macos" => HostPlatform::MacOs,
            "linux" => HostPlatform::Linux,
            _ => HostPlatform::Unsupported,
        }
    }
}

/// What the container needs to reach the host display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayAccess {
    /// Value for the in-container `DISPLAY` variable
    pub display: String,
    /// Host X-authority file to mount read-only, when the platform uses one
    pub xauthority: Option<PathBuf>,
}

/// Outcome of making the display reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayStatus {
    /// The display is reachable; launch can proceed
    Ready(DisplayAccess),
    /// The whole invocation must stop with this user-facing message and a
    /// success exit code (e.g. a display server was just installed and the
    /// host needs a new login session first)
    Abort {
        /// Instruction shown to the user
        message: String,
    },
}

/// Host capabilities the decision engine depends on
pub trait HostBridge {
    /// Make sure a display server is reachable for the given platform.
    ///
    /// May interact with the user (e.g. offering an installation) and may
    /// decide the whole invocation has to stop without launching anything.
    fn ensure_display(&self, platform: HostPlatform) -> Result<DisplayStatus>;

    /// Best-effort probe for a host audio socket. `None` means the container
    /// runs without sound; it is never an error.
    fn audio_socket(&self) -> Option<PathBuf>;
}

/// The real host bridge used by the CLI
pub struct NativeBridge<'a> {
    output: &'a OutputManager,
}

impl<'a> NativeBridge<'a> {
    /// Create a bridge reporting through the given output manager
    pub fn new(output: &'a OutputManager) -> Self {
        Self { output }
    }
}

impl HostBridge for NativeBridge<'_> {
    fn ensure_display(&self, platform: HostPlatform) -> Result<DisplayStatus> {
        match platform {
            HostPlatform::MacOs => macos::ensure_display(self.output),
            HostPlatform::Linux => linux::ensure_display(),
            HostPlatform::Unsupported => Err(ValidationError::UnsupportedPlatform {
                os: std::env::consts::OS.to_string(),
            }
            .into()),
        }
    }

    fn audio_socket(&self) -> Option<PathBuf> {
        linux::audio_socket()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_classification_is_closed() {
        assert_eq!(HostPlatform::from_os("macos"), HostPlatform::MacOs);
        assert_eq!(HostPlatform::from_os("linux"), HostPlatform::Linux);
        assert_eq!(HostPlatform::from_os("windows"), HostPlatform::Unsupported);
        assert_eq!(HostPlatform::from_os("freebsd"), HostPlatform::Unsupported);
        assert_eq!(HostPlatform::from_os(""), HostPlatform::Unsupported);
    }
}
