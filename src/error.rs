//! Error types for launcher operations.
//!
//! This module defines all error types with actionable error messages and
//! recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for launcher operations
pub type Result<T> = std::result::Result<T, LaunchError>;

/// Main error type for all launcher operations
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Command-line usage errors
    #[error("{0}")]
    Usage(#[from] UsageError),

    /// Option and configuration validation errors
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Credential resolution errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Host environment errors
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// External tool errors
    #[error("{0}")]
    ExternalTool(#[from] ExternalToolError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Command-line usage errors
#[derive(Error, Debug)]
pub enum UsageError {
    /// An option that is not part of the CLI surface
    #[error("Unknown option '{flag}'")]
    UnknownFlag {
        /// The offending token, verbatim
        flag: String,
    },
}

/// Option and configuration validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    /// RDP mode value outside the accepted set
    #[error("Invalid RDP mode '{value}'. Valid modes: no, start, stop, restart, interactive")]
    InvalidRdpMode {
        /// The rejected value
        value: String,
    },

    /// RDP port that does not parse as a TCP port number
    #[error("Invalid RDP port '{value}'. Expected a number between 1 and 65535")]
    InvalidRdpPort {
        /// The rejected value
        value: String,
    },

    /// A value-bearing flag given an empty value
    #[error("Option '{flag}' requires a non-empty value")]
    EmptyFlagValue {
        /// Flag name including leading dashes
        flag: String,
    },

    /// A trailing command combined with an RDP mode
    #[error("A command cannot be used together with --rdp. Run it in a separate invocation.")]
    RdpCommandConflict,

    /// Host OS with no display bridging support
    #[error("Unsupported host platform '{os}'. Only macOS and Linux are supported.")]
    UnsupportedPlatform {
        /// Value of `std::env::consts::OS`
        os: String,
    },

    /// No usable X-authority file for X11 forwarding
    #[error(
        "No X-authority file found at {path}.\n\
         X11 forwarding requires a running X session.\n\
         Set XAUTHORITY to the correct location if your session keeps it elsewhere."
    )]
    MissingXAuthority {
        /// Path that was probed
        path: PathBuf,
    },
}

/// Credential resolution errors
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Empty plaintext or prompted password
    #[error("Password must not be empty")]
    EmptyCredential,

    /// Password hashing failed
    #[error("Failed to encrypt password: {reason}")]
    HashingFailed {
        /// Reason for the error
        reason: String,
    },

    /// Terminal prompt could not be read
    #[error("Failed to read password from terminal: {source}")]
    PromptFailed {
        /// Underlying terminal error
        #[source]
        source: std::io::Error,
    },
}

/// Host environment errors
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The docker binary is not on PATH
    #[error(
        "Docker command not found: {reason}\n\
         \n\
         Docker does not appear to be installed.\n\
         Install from: https://docs.docker.com/get-docker/"
    )]
    DockerNotFound {
        /// Lookup failure detail
        reason: String,
    },

    /// The docker daemon did not answer the availability probe
    #[error(
        "Docker daemon is not responding: {reason}\n\
         \n\
         {help}\n\
         If Docker is running, check: docker ps"
    )]
    DockerUnresponsive {
        /// Probe failure detail
        reason: String,
        /// Platform-specific startup instructions
        help: &'static str,
    },
}

/// External tool errors
#[derive(Error, Debug)]
pub enum ExternalToolError {
    /// `docker pull` failed
    #[error("Failed to pull image '{image}': {reason}")]
    ImagePull {
        /// Image reference that was pulled
        image: String,
        /// Failure detail
        reason: String,
    },

    /// `docker volume create` failed
    #[error("Failed to create volume '{volume}': {reason}")]
    VolumeCreate {
        /// Volume name
        volume: String,
        /// Failure detail
        reason: String,
    },

    /// `docker run` failed before the container produced an exit code
    #[error("Failed to run container: {reason}")]
    ContainerRun {
        /// Failure detail
        reason: String,
    },

    /// Display server installation failed or was never confirmed
    #[error("Display server setup failed: {reason}")]
    DisplayServerInstall {
        /// Failure detail
        reason: String,
    },
}

impl LaunchError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            LaunchError::Usage(UsageError::UnknownFlag { .. }) => vec![
                "Run 'docker-wine --help' for the full option list".to_string(),
                "Value-bearing options use '=', e.g. --tag=stable".to_string(),
            ],
            LaunchError::Validation(ValidationError::RdpCommandConflict) => vec![
                "Start the RDP server first: docker-wine --rdp=start".to_string(),
                "Then run programs through your RDP client session".to_string(),
            ],
            LaunchError::Validation(ValidationError::MissingXAuthority { .. }) => vec![
                "Log in to a graphical X session before launching".to_string(),
                "Or export XAUTHORITY=/path/to/.Xauthority".to_string(),
            ],
            LaunchError::Environment(_) => vec![
                "Verify the installation with: docker info".to_string(),
            ],
            LaunchError::ExternalTool(ExternalToolError::ImagePull { .. }) => vec![
                "Check network connectivity to the registry".to_string(),
                "Use --cache to run from the locally cached image".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Whether this error should reprint the usage text
    pub fn is_usage(&self) -> bool {
        matches!(self, LaunchError::Usage(_))
    }
}
