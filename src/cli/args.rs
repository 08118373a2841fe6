//! Command line option parsing and the launch configuration record.
//!
//! The parser is a single left-to-right fold over the argument vector. Every
//! option is either a bare flag (`--cache`) or a value flag in `=` form
//! (`--tag=stable`); a value flag without `=` is not recognized and falls
//! through to the unknown-option error. The first token that is not a flag
//! ends option parsing and the remainder becomes the in-container command.
//!
//! Some flags have parse-time side effects: `--as-me` snapshots the current
//! host user (name, uid, gid) at the moment it is consumed and appends the
//! matching `--env=` tokens, and `--home-volume=` with a non-default value
//! does the same. Later flags overwrite earlier scalar values, so option
//! order is part of the CLI contract.

use crate::error::{Result, UsageError, ValidationError};

/// Default remote image pulled from the registry
pub const DEFAULT_REMOTE_IMAGE: &str = "scottyhardy/docker-wine";

/// Default image name for `--local` without a value
pub const DEFAULT_LOCAL_IMAGE: &str = "docker-wine";

/// Default image tag
pub const DEFAULT_TAG: &str = "latest";

/// Default named volume holding the container user's home directory
pub const DEFAULT_HOME_VOLUME: &str = "winehome";

/// Username baked into the image
pub const DEFAULT_USER: &str = "wineuser";

/// Default host port published for RDP
pub const DEFAULT_RDP_PORT: u16 = 3389;

/// Where the container image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Image pulled from (or cached from) a registry
    Remote {
        /// Registry image name
        name: String,
        /// Image tag
        tag: String,
    },
    /// Locally built image, never pulled
    Local {
        /// Local image name
        name: String,
        /// Image tag
        tag: String,
    },
}

impl ImageSource {
    /// Image name without the tag
    pub fn name(&self) -> &str {
        match self {
            ImageSource::Remote { name, .. } | ImageSource::Local { name, .. } => name,
        }
    }

    /// Image tag
    pub fn tag(&self) -> &str {
        match self {
            ImageSource::Remote { tag, .. } | ImageSource::Local { tag, .. } => tag,
        }
    }

    /// Full `name:tag` reference passed to docker
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name(), self.tag())
    }

    /// Whether the image can be refreshed from a registry
    pub fn is_remote(&self) -> bool {
        matches!(self, ImageSource::Remote { .. })
    }

    fn set_tag(&mut self, new_tag: String) {
        match self {
            ImageSource::Remote { tag, .. } | ImageSource::Local { tag, .. } => *tag = new_tag,
        }
    }
}

/// The in-container user context for the launched process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The user baked into the image
    DefaultImageUser,
    /// Root inside the container
    Root,
    /// The host user, impersonated inside the container
    CurrentUser {
        /// Host username, captured at parse time
        name: String,
        /// Host uid, captured at parse time
        uid: u32,
        /// Host gid, captured at parse time
        gid: u32,
    },
}

/// Whether and how the container exposes an RDP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdpMode {
    /// No RDP; the session uses X11 forwarding
    Disabled,
    /// Start a detached RDP server
    Start,
    /// Kill the running container
    Stop,
    /// Kill the running container, then start a detached RDP server
    Restart,
    /// RDP server in the foreground with an interactive shell
    Interactive,
}

impl RdpMode {
    /// Parse an `--rdp=` value. Values are matched exactly; case variants
    /// are rejected.
    fn parse(value: &str) -> Option<Self> {
        match value {
            "no" => Some(RdpMode::Disabled),
            "start" => Some(RdpMode::Start),
            "stop" => Some(RdpMode::Stop),
            "restart" => Some(RdpMode::Restart),
            "interactive" => Some(RdpMode::Interactive),
            _ => None,
        }
    }
}

/// Where the container user's password comes from.
///
/// The sources are mutually exclusive; the last credential flag on the
/// command line wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// `--password=VALUE`, encrypted before use
    Plaintext(String),
    /// `--password-prompt`, read from the terminal without echo
    Prompt,
    /// `--secure-password=HASH`, forwarded verbatim
    PreEncrypted(String),
}

/// The fully resolved set of parameters describing one container invocation.
///
/// Built once per process from the argument vector and consumed read-only by
/// the decision engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Container image to run
    pub image: ImageSource,
    /// Refresh the image before running (remote images only)
    pub pull: bool,
    /// In-container user context
    pub identity: Identity,
    /// Named volume or host path mounted as the home directory
    pub home_volume: String,
    /// Explicit in-container home path (`--home=`); derived from the
    /// identity when unset
    pub home_path: Option<String>,
    /// Explicit working directory (`--workdir=`); forced to "/" for root
    pub workdir: Option<String>,
    /// Pending credential source, resolved after parsing
    pub credential: Option<CredentialSource>,
    /// Pass-through `--volume=` tokens, verbatim, in parse order
    pub extra_mounts: Vec<String>,
    /// Pass-through and side-effect `--env=` tokens, verbatim, in parse order
    pub extra_env: Vec<String>,
    /// Pass-through `--device=` tokens, verbatim, in parse order
    pub extra_devices: Vec<String>,
    /// RDP run mode
    pub rdp: RdpMode,
    /// Host port published for RDP
    pub rdp_port: u16,
    /// Force ownership of the home directory contents
    pub force_owner: bool,
    /// Trailing in-container command, empty unless positional args were given
    pub command: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            image: ImageSource::Remote {
                name: DEFAULT_REMOTE_IMAGE.to_string(),
                tag: DEFAULT_TAG.to_string(),
            },
            pull: true,
            identity: Identity::DefaultImageUser,
            home_volume: DEFAULT_HOME_VOLUME.to_string(),
            home_path: None,
            workdir: None,
            credential: None,
            extra_mounts: Vec::new(),
            extra_env: Vec::new(),
            extra_devices: Vec::new(),
            rdp: RdpMode::Disabled,
            rdp_port: DEFAULT_RDP_PORT,
            force_owner: false,
            command: Vec::new(),
        }
    }
}

impl LaunchConfig {
    /// The in-container home directory: the explicit `--home=` override, or
    /// a path derived from the effective username.
    pub fn home_path(&self) -> String {
        if let Some(path) = &self.home_path {
            return path.clone();
        }
        match &self.identity {
            Identity::CurrentUser { name, .. } => format!("/home/{name}"),
            _ => format!("/home/{DEFAULT_USER}"),
        }
    }
}

/// Result of parsing the argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// `--help` was seen; print usage and exit successfully
    Help,
    /// A populated configuration ready for resolution
    Launch(LaunchConfig),
}

/// Parse the argument vector (without the program name) into a launch
/// configuration.
///
/// This is a pure fold: each token merges a delta into the accumulator and
/// no state outside the accumulator is touched, except for the documented
/// parse-time user snapshot of `--as-me` / `--home-volume=`.
pub fn parse(args: Vec<String>) -> Result<Parsed> {
    let mut config = LaunchConfig::default();
    let mut iter = args.into_iter();

    while let Some(token) = iter.next() {
        if token == "--help" {
            return Ok(Parsed::Help);
        } else if token == "--cache" {
            config.pull = false;
        } else if token == "--local" {
            config.image = ImageSource::Local {
                name: DEFAULT_LOCAL_IMAGE.to_string(),
                tag: config.image.tag().to_string(),
            };
        } else if token == "--as-root" {
            config.identity = Identity::Root;
            config.extra_env.push("--env=RUN_AS_ROOT=yes".to_string());
        } else if token == "--as-me" {
            apply_current_user(&mut config);
        } else if token == "--rdp" {
            config.rdp = RdpMode::Interactive;
        } else if token == "--force-owner" {
            config.force_owner = true;
        } else if token == "--password-prompt" {
            config.credential = Some(CredentialSource::Prompt);
        } else if let Some(value) = value_of(&token, "--local=") {
            require_non_empty("--local", &value)?;
            config.image = ImageSource::Local {
                name: value,
                tag: config.image.tag().to_string(),
            };
        } else if let Some(value) = value_of(&token, "--tag=") {
            require_non_empty("--tag", &value)?;
            config.image.set_tag(value);
        } else if let Some(value) = value_of(&token, "--rdp=") {
            config.rdp =
                RdpMode::parse(&value).ok_or(ValidationError::InvalidRdpMode { value })?;
        } else if let Some(value) = value_of(&token, "--rdp-port=") {
            config.rdp_port = value
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or(ValidationError::InvalidRdpPort { value })?;
        } else if let Some(value) = value_of(&token, "--home-volume=") {
            require_non_empty("--home-volume", &value)?;
            // A caller-supplied volume or host path must not end up owned by
            // the image user; impersonate the host user unless an identity
            // snapshot already happened.
            if value != DEFAULT_HOME_VOLUME
                && !matches!(config.identity, Identity::CurrentUser { .. })
            {
                apply_current_user(&mut config);
            }
            config.home_volume = value;
        } else if let Some(value) = value_of(&token, "--home=") {
            require_non_empty("--home", &value)?;
            config.home_path = Some(value);
        } else if let Some(value) = value_of(&token, "--workdir=") {
            require_non_empty("--workdir", &value)?;
            config.workdir = Some(value);
        } else if let Some(value) = value_of(&token, "--password=") {
            config.credential = Some(CredentialSource::Plaintext(value));
        } else if let Some(value) = value_of(&token, "--secure-password=") {
            config.credential = Some(CredentialSource::PreEncrypted(value));
        } else if let Some(value) = value_of(&token, "--volume=") {
            require_non_empty("--volume", &value)?;
            config.extra_mounts.push(token);
        } else if let Some(value) = value_of(&token, "--env=") {
            require_non_empty("--env", &value)?;
            config.extra_env.push(token);
        } else if let Some(value) = value_of(&token, "--device=") {
            require_non_empty("--device", &value)?;
            config.extra_devices.push(token);
        } else if token.starts_with('-') {
            return Err(UsageError::UnknownFlag { flag: token }.into());
        } else {
            // First non-flag token: everything from here on is the
            // in-container command, verbatim.
            let mut command = vec![token];
            command.extend(iter);
            config.command = command;
            break;
        }
    }

    Ok(Parsed::Launch(config))
}

fn value_of(token: &str, prefix: &str) -> Option<String> {
    token.strip_prefix(prefix).map(str::to_owned)
}

fn require_non_empty(flag: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ValidationError::EmptyFlagValue {
            flag: flag.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Snapshot the current host user and merge it into the configuration.
///
/// The snapshot happens the moment the triggering flag is consumed, not at
/// launch time, and appends the matching environment tokens as a parse-time
/// side effect.
fn apply_current_user(config: &mut LaunchConfig) {
    let (name, uid, gid) = current_user_snapshot();
    config.extra_env.push(format!("--env=USER_NAME={name}"));
    config.extra_env.push(format!("--env=USER_UID={uid}"));
    config.extra_env.push(format!("--env=USER_GID={gid}"));
    config.identity = Identity::CurrentUser { name, uid, gid };
}

#[cfg(unix)]
fn current_user_snapshot() -> (String, u32, u32) {
    let name = users::get_current_username()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_USER.to_string());
    (name, users::get_current_uid(), users::get_current_gid())
}

#[cfg(not(unix))]
fn current_user_snapshot() -> (String, u32, u32) {
    // Identity mapping is meaningless off unix; the engine rejects the
    // platform before anything is launched.
    (DEFAULT_USER.to_string(), 0, 0)
}

/// The usage text printed by `--help` and after usage errors
pub fn usage() -> &'static str {
    "\
Usage: docker-wine [OPTIONS] [COMMAND...]

Run a containerized Wine environment with X11 forwarding or RDP.

Options use --name or --name=value syntax. The first token that is not an
option ends option parsing; the remainder is executed inside the container.

  --cache                 Use the locally cached image (skip the pull)
  --local[=IMAGE]         Use a locally built image (default \"docker-wine\")
  --tag=TAG               Image tag (default \"latest\")
  --as-root               Run as root inside the container
  --as-me                 Run as the current host user (captured immediately)
  --rdp[=MODE]            RDP server mode: no|start|stop|restart|interactive
                          (bare --rdp means interactive)
  --rdp-port=PORT         Host port published for RDP (default 3389)
  --home-volume=VALUE     Named volume or host path for the home directory
                          (default \"winehome\"; non-default implies --as-me)
  --home=PATH             Home directory path inside the container
  --force-owner           Force ownership of the home directory contents
  --password=VALUE        Password for the container user (encrypted locally)
  --password-prompt       Prompt for the password without echoing
  --secure-password=HASH  Pre-encrypted password, forwarded as-is
  --volume=VALUE          Extra volume mount, passed through verbatim (repeatable)
  --env=VALUE             Extra environment variable, passed through verbatim (repeatable)
  --device=VALUE          Extra device, passed through verbatim (repeatable)
  --workdir=PATH          Working directory inside the container
  --help                  Show this help and exit"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn parse_config(list: &[&str]) -> LaunchConfig {
        match parse(args(list)).expect("parse should succeed") {
            Parsed::Launch(config) => config,
            Parsed::Help => panic!("unexpected help short-circuit"),
        }
    }

    #[test]
    fn defaults() {
        let config = parse_config(&[]);
        assert_eq!(
            config.image,
            ImageSource::Remote {
                name: DEFAULT_REMOTE_IMAGE.to_string(),
                tag: DEFAULT_TAG.to_string(),
            }
        );
        assert!(config.pull);
        assert_eq!(config.identity, Identity::DefaultImageUser);
        assert_eq!(config.home_volume, DEFAULT_HOME_VOLUME);
        assert_eq!(config.rdp, RdpMode::Disabled);
        assert_eq!(config.rdp_port, DEFAULT_RDP_PORT);
        assert!(config.command.is_empty());
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse(args(&["--help"])).unwrap(), Parsed::Help);
        // Even in front of tokens that would otherwise be errors.
        assert_eq!(parse(args(&["--help", "--bogus"])).unwrap(), Parsed::Help);
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        let err = parse(args(&["--bogus"])).unwrap_err();
        assert!(matches!(err, LaunchError::Usage(_)));
    }

    #[test]
    fn bare_value_flag_falls_through_to_unknown() {
        // Value flags require the = form; a bare --tag is not recognized.
        let err = parse(args(&["--tag", "latest"])).unwrap_err();
        assert!(matches!(
            err,
            LaunchError::Usage(UsageError::UnknownFlag { ref flag }) if flag == "--tag"
        ));
    }

    #[test]
    fn local_image_with_passthrough_and_command() {
        let config = parse_config(&["--local", "--volume=my_vol:/data:ro", "notepad"]);
        assert_eq!(
            config.image,
            ImageSource::Local {
                name: DEFAULT_LOCAL_IMAGE.to_string(),
                tag: DEFAULT_TAG.to_string(),
            }
        );
        assert_eq!(config.extra_mounts, vec!["--volume=my_vol:/data:ro"]);
        assert_eq!(config.command, vec!["notepad"]);
        assert_eq!(config.rdp, RdpMode::Disabled);
    }

    #[test]
    fn tag_applies_to_either_image_source() {
        let config = parse_config(&["--tag=stable", "--local=my-wine"]);
        assert_eq!(
            config.image,
            ImageSource::Local {
                name: "my-wine".to_string(),
                tag: "stable".to_string(),
            }
        );

        let config = parse_config(&["--local=my-wine", "--tag=stable"]);
        assert_eq!(config.image.reference(), "my-wine:stable");
    }

    #[test]
    fn rdp_modes() {
        assert_eq!(parse_config(&["--rdp"]).rdp, RdpMode::Interactive);
        assert_eq!(parse_config(&["--rdp=no"]).rdp, RdpMode::Disabled);
        assert_eq!(parse_config(&["--rdp=start"]).rdp, RdpMode::Start);
        assert_eq!(parse_config(&["--rdp=stop"]).rdp, RdpMode::Stop);
        assert_eq!(parse_config(&["--rdp=restart"]).rdp, RdpMode::Restart);
        assert_eq!(parse_config(&["--rdp=interactive"]).rdp, RdpMode::Interactive);
    }

    #[test]
    fn invalid_rdp_mode_rejected_regardless_of_case_or_position() {
        for list in [
            &["--rdp=yes"][..],
            &["--rdp=START"][..],
            &["--rdp=Interactive"][..],
            &["--cache", "--rdp=sideways", "--tag=latest"][..],
        ] {
            let err = parse(args(list)).unwrap_err();
            assert!(
                matches!(
                    err,
                    LaunchError::Validation(ValidationError::InvalidRdpMode { .. })
                ),
                "expected invalid mode error for {list:?}"
            );
        }
    }

    #[test]
    fn invalid_rdp_port_rejected() {
        for value in ["0", "65536", "rdp", ""] {
            let err = parse(vec![format!("--rdp-port={value}")]).unwrap_err();
            assert!(matches!(
                err,
                LaunchError::Validation(ValidationError::InvalidRdpPort { .. })
            ));
        }
        assert_eq!(parse_config(&["--rdp-port=13389"]).rdp_port, 13389);
    }

    #[test]
    fn as_root_sets_marker_env_at_parse_time() {
        let config = parse_config(&["--as-root"]);
        assert_eq!(config.identity, Identity::Root);
        assert_eq!(config.extra_env, vec!["--env=RUN_AS_ROOT=yes"]);
    }

    #[test]
    fn as_me_snapshots_identity_at_parse_time() {
        let config = parse_config(&["--as-me"]);
        let Identity::CurrentUser { name, uid, gid } = &config.identity else {
            panic!("expected CurrentUser identity");
        };
        assert_eq!(
            config.extra_env,
            vec![
                format!("--env=USER_NAME={name}"),
                format!("--env=USER_UID={uid}"),
                format!("--env=USER_GID={gid}"),
            ]
        );
    }

    #[test]
    fn non_default_home_volume_implies_current_user() {
        let config = parse_config(&["--home-volume=/mnt/wine"]);
        assert!(matches!(config.identity, Identity::CurrentUser { .. }));
        assert_eq!(config.home_volume, "/mnt/wine");

        // The default name does not force impersonation.
        let config = parse_config(&["--home-volume=winehome"]);
        assert_eq!(config.identity, Identity::DefaultImageUser);
    }

    #[test]
    fn flag_order_is_part_of_the_contract() {
        // --as-root after the home-volume snapshot wins.
        let config = parse_config(&["--home-volume=/mnt/wine", "--as-root"]);
        assert_eq!(config.identity, Identity::Root);

        // Reversed, the snapshot wins, but the root marker token captured
        // earlier stays in the environment.
        let config = parse_config(&["--as-root", "--home-volume=/mnt/wine"]);
        assert!(matches!(config.identity, Identity::CurrentUser { .. }));
        assert_eq!(config.extra_env[0], "--env=RUN_AS_ROOT=yes");
    }

    #[test]
    fn credential_source_is_last_wins() {
        let config = parse_config(&["--password=a", "--secure-password=b"]);
        assert_eq!(
            config.credential,
            Some(CredentialSource::PreEncrypted("b".to_string()))
        );

        let config = parse_config(&["--secure-password=b", "--password-prompt"]);
        assert_eq!(config.credential, Some(CredentialSource::Prompt));
    }

    #[test]
    fn passthrough_tokens_keep_order_and_content() {
        let config = parse_config(&[
            "--volume=a:/a",
            "--env=ONE=1",
            "--device=/dev/snd",
            "--volume=b:/b:ro",
            "--env=TWO=2",
        ]);
        assert_eq!(config.extra_mounts, vec!["--volume=a:/a", "--volume=b:/b:ro"]);
        assert_eq!(config.extra_env, vec!["--env=ONE=1", "--env=TWO=2"]);
        assert_eq!(config.extra_devices, vec!["--device=/dev/snd"]);
    }

    #[test]
    fn empty_passthrough_value_rejected() {
        for flag in ["--volume=", "--env=", "--device=", "--tag=", "--home="] {
            let err = parse(args(&[flag])).unwrap_err();
            assert!(
                matches!(
                    err,
                    LaunchError::Validation(ValidationError::EmptyFlagValue { .. })
                ),
                "expected empty-value error for {flag}"
            );
        }
    }

    #[test]
    fn first_positional_ends_option_parsing() {
        let config = parse_config(&["--cache", "wine", "cmd", "--tag=ignored"]);
        assert_eq!(config.command, vec!["wine", "cmd", "--tag=ignored"]);
        // --tag=ignored was part of the command, not an option.
        assert_eq!(config.image.tag(), DEFAULT_TAG);
    }

    #[test]
    fn home_path_derivation() {
        assert_eq!(parse_config(&[]).home_path(), "/home/wineuser");
        assert_eq!(
            parse_config(&["--home=/data/home"]).home_path(),
            "/data/home"
        );
        let config = parse_config(&["--as-me"]);
        let Identity::CurrentUser { name, .. } = &config.identity else {
            panic!("expected CurrentUser identity");
        };
        assert_eq!(config.home_path(), format!("/home/{name}"));
    }

    #[test]
    fn scalar_flags_are_last_wins() {
        let config = parse_config(&["--workdir=/one", "--workdir=/two"]);
        assert_eq!(config.workdir.as_deref(), Some("/two"));

        let config = parse_config(&["--rdp=start", "--rdp=no"]);
        assert_eq!(config.rdp, RdpMode::Disabled);
    }
}
