//! Linux display and audio bridging.
//!
//! X11 forwarding on Linux only needs the host's X socket and an X-authority
//! file the container can read. Audio rides on the PulseAudio native socket
//! when one is present.

use super::{DisplayAccess, DisplayStatus};
use crate::error::{Result, ValidationError};
use std::ffi::OsString;
use std::path::PathBuf;

/// Resolve the display access for the running X session.
pub(super) fn ensure_display() -> Result<DisplayStatus> {
    let xauthority = resolve_xauthority(std::env::var_os("XAUTHORITY"), dirs::home_dir())?;
    let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string());
    Ok(DisplayStatus::Ready(DisplayAccess {
        display,
        xauthority: Some(xauthority),
    }))
}

/// X-authority path: `XAUTHORITY` when set, `~/.Xauthority` otherwise. The
/// file must exist; X11 forwarding cannot work without the cookie.
fn resolve_xauthority(env_value: Option<OsString>, home: Option<PathBuf>) -> Result<PathBuf> {
    let path = match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => home
            .unwrap_or_else(|| PathBuf::from("/root"))
            .join(".Xauthority"),
    };
    if !path.is_file() {
        return Err(ValidationError::MissingXAuthority { path }.into());
    }
    Ok(path)
}

/// Probe for the PulseAudio native socket. Absence degrades to a silent
/// container, never to a failure.
pub fn audio_socket() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_RUNTIME_DIR") {
        let path = PathBuf::from(dir).join("pulse/native");
        if path.exists() {
            return Some(path);
        }
    }

    #[cfg(unix)]
    {
        let path = PathBuf::from(format!(
            "/run/user/{}/pulse/native",
            users::get_current_uid()
        ));
        if path.exists() {
            return Some(path);
        }
    }

    None
}
