//! # docker-wine
//!
//! Launcher for a containerized Wine runtime.
//!
//! This crate resolves command-line options into a concrete `docker run`
//! invocation for a Wine container, exposed either through RDP or through
//! X11 forwarding on the host display.
//!
//! ## Features
//!
//! - **Run modes**: interactive X11 session, detached RDP server, stop and
//!   restart of the single named container
//! - **Identity mapping**: run as root, as the impersonated host user, or as
//!   the image's built-in user
//! - **Persistent home**: a named volume (created on first use) or a host
//!   path mounted as the container user's home directory
//! - **Credentials**: plaintext, prompted, or pre-encrypted passwords,
//!   hashed in the format the container's authentication expects
//! - **Host bridging**: XQuartz setup on macOS, X-authority and PulseAudio
//!   wiring on Linux
//!
//! ## Usage
//!
//! ```bash
//! docker-wine                          # interactive shell with X11 forwarding
//! docker-wine notepad                  # run a program in the container
//! docker-wine --rdp=start             # detached RDP server on port 3389
//! docker-wine --as-me --password-prompt --rdp
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod cli;
pub mod credential;
pub mod docker;
pub mod engine;
pub mod error;
pub mod host;

// Re-export main types for public API
pub use cli::{CredentialSource, Identity, ImageSource, LaunchConfig, Parsed, RdpMode};
pub use engine::{CONTAINER_NAME, EngineOutcome, LaunchPlan};
pub use error::{
    CredentialError, EnvironmentError, ExternalToolError, LaunchError, Result, UsageError,
    ValidationError,
};
pub use host::{DisplayAccess, DisplayStatus, HostBridge, HostPlatform};
