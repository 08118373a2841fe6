//! Credential resolution for the container user.
//!
//! Exactly one credential source survives parsing (plaintext, prompted, or
//! pre-encrypted). Plaintext and prompted passwords are hashed with
//! SHA-512-crypt, the scheme the container's shadow-file authentication
//! consumes, so the resulting value can be handed to the image verbatim.
//! Pre-encrypted values are forwarded untouched.

use crate::cli::{CredentialSource, LaunchConfig};
use crate::error::{CredentialError, Result};
use sha_crypt::{Sha512Params, sha512_check, sha512_simple};

/// Environment variable the image reads the encrypted password from
pub const PASSWORD_ENV_KEY: &str = "USER_PASSWD";

/// SHA-crypt rounds. 5000 is the scheme default, which keeps the canonical
/// `$6$salt$digest` rendering the image's shadow file expects.
const CRYPT_ROUNDS: usize = 5_000;

/// Resolve the configuration's pending credential source into a single
/// `--env=USER_PASSWD=…` token appended to the environment list.
///
/// A configuration without a credential source is left untouched.
pub fn resolve(config: &mut LaunchConfig) -> Result<()> {
    let Some(source) = config.credential.clone() else {
        return Ok(());
    };

    let value = match source {
        CredentialSource::Plaintext(password) => encrypt(&password)?,
        CredentialSource::Prompt => {
            let password = rpassword::prompt_password("Password: ")
                .map_err(|source| CredentialError::PromptFailed { source })?;
            encrypt(&password)?
        }
        // Already in the expected digest format; no hashing.
        CredentialSource::PreEncrypted(hash) => hash,
    };

    config
        .extra_env
        .push(format!("--env={PASSWORD_ENV_KEY}={value}"));
    Ok(())
}

/// Hash a plaintext password with SHA-512-crypt and a fresh random salt.
pub fn encrypt(password: &str) -> std::result::Result<String, CredentialError> {
    if password.is_empty() {
        return Err(CredentialError::EmptyCredential);
    }

    let params = Sha512Params::new(CRYPT_ROUNDS).map_err(|e| CredentialError::HashingFailed {
        reason: format!("{e:?}"),
    })?;
    sha512_simple(password, &params).map_err(|e| CredentialError::HashingFailed {
        reason: format!("{e:?}"),
    })
}

/// Check a plaintext password against a SHA-512-crypt hash.
pub fn verify(password: &str, hash: &str) -> bool {
    sha512_check(password, hash).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Parsed, parse};

    fn config_from(args: &[&str]) -> LaunchConfig {
        let args = args.iter().map(|s| s.to_string()).collect();
        match parse(args).expect("parse should succeed") {
            Parsed::Launch(config) => config,
            Parsed::Help => panic!("unexpected help short-circuit"),
        }
    }

    #[test]
    fn empty_password_is_rejected() {
        let mut config = config_from(&["--password="]);
        let err = resolve(&mut config).unwrap_err();
        assert!(
            err.to_string().contains("must not be empty"),
            "unexpected error: {err}"
        );
        assert!(config.extra_env.is_empty());
    }

    #[test]
    fn plaintext_password_round_trips_through_the_digest() {
        let mut config = config_from(&["--password=hunter2"]);
        resolve(&mut config).expect("resolution should succeed");

        assert_eq!(config.extra_env.len(), 1);
        let hash = config.extra_env[0]
            .strip_prefix("--env=USER_PASSWD=")
            .expect("token should carry the password env key");

        assert!(hash.starts_with("$6$"), "not a SHA-512-crypt hash: {hash}");
        assert!(verify("hunter2", hash));
        assert!(!verify("hunter3", hash));
    }

    #[test]
    fn fresh_salt_per_invocation() {
        let a = encrypt("hunter2").unwrap();
        let b = encrypt("hunter2").unwrap();
        assert_ne!(a, b);
        assert!(verify("hunter2", &a));
        assert!(verify("hunter2", &b));
    }

    #[test]
    fn pre_encrypted_value_is_forwarded_verbatim() {
        let mut config = config_from(&["--secure-password=$6$abcdef$alreadyhashed"]);
        resolve(&mut config).expect("resolution should succeed");
        assert_eq!(
            config.extra_env,
            vec!["--env=USER_PASSWD=$6$abcdef$alreadyhashed"]
        );
    }

    #[test]
    fn no_credential_leaves_the_config_untouched() {
        let mut config = config_from(&[]);
        resolve(&mut config).expect("resolution should succeed");
        assert!(config.extra_env.is_empty());
    }
}
