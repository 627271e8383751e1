//! Credential resolution
//!
//! Credentials are looked up in this order:
//!
//! 1. explicit `access_key` / `secret_key` (and `token`) from the config
//! 2. `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
//! 3. the shared credentials file for the configured profile
//!
//! Role assumption via `role_arn` is not performed; the base credentials are
//! used as they are.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::config::CredentialConfig;
use crate::error::{AlarmsError, AlarmsResult};

const ENV_ACCESS_KEY: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
const ENV_PROFILE: &str = "AWS_PROFILE";
const ENV_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

const DEFAULT_PROFILE: &str = "default";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

/// Resolve credentials against the process environment
pub fn resolve(config: &CredentialConfig) -> AlarmsResult<Credentials> {
    resolve_with_env(config, |name| std::env::var(name).ok())
}

/// Resolve credentials with an injectable environment lookup
pub fn resolve_with_env<E>(config: &CredentialConfig, env: E) -> AlarmsResult<Credentials>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(role_arn) = non_empty(&config.role_arn) {
        warn!("role_arn {role_arn} is set but role assumption is not supported, using base credentials");
    }

    if let (Some(access_key), Some(secret_key)) =
        (non_empty(&config.access_key), non_empty(&config.secret_key))
    {
        debug!("using credentials from config");
        return Ok(Credentials::new(
            access_key,
            secret_key,
            non_empty(&config.token).map(str::to_string),
        ));
    }

    let from_env = |name: &str| env(name).filter(|value| !value.is_empty());
    if let (Some(access_key), Some(secret_key)) = (from_env(ENV_ACCESS_KEY), from_env(ENV_SECRET_KEY)) {
        debug!("using credentials from environment");
        return Ok(Credentials::new(
            access_key,
            secret_key,
            from_env(ENV_SESSION_TOKEN),
        ));
    }

    let profile = non_empty(&config.profile)
        .map(str::to_string)
        .or_else(|| from_env(ENV_PROFILE))
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    let path = non_empty(&config.shared_credential_file)
        .map(PathBuf::from)
        .or_else(|| from_env(ENV_CREDENTIALS_FILE).map(PathBuf::from))
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")));

    if let Some(path) = path {
        trace!("looking up profile {profile} in {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                if let Some(credentials) = parse_profile(&content, &profile) {
                    debug!("using credentials from profile {profile}");
                    return Ok(credentials);
                }
                return Err(AlarmsError::Credentials(format!(
                    "profile {profile} not found or incomplete in {}",
                    path.display()
                )));
            }
            Err(e) => trace!("cannot read {}: {e}", path.display()),
        }
    }

    Err(AlarmsError::Credentials(
        "no credentials in config, environment or shared credentials file".to_string(),
    ))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Extract one profile from an INI-style credentials file
pub fn parse_profile(content: &str, profile: &str) -> Option<Credentials> {
    let mut in_profile = false;
    let mut access_key = None;
    let mut secret_key = None;
    let mut session_token = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let section = section.trim();
            let name = section.strip_prefix("profile ").unwrap_or(section).trim();
            in_profile = name == profile;
            continue;
        }

        if !in_profile {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "aws_access_key_id" => access_key = Some(value),
            "aws_secret_access_key" => secret_key = Some(value),
            "aws_session_token" => session_token = Some(value),
            _ => {}
        }
    }

    Some(Credentials::new(access_key?, secret_key?, session_token))
}
