use std::fmt;
use std::path::Path;

use anyhow::Context;
use tracing::trace;

/// Connector configuration
///
/// Only `region` is required. Credential fields are flattened into the same
/// table, so a config file reads:
///
/// ```toml
/// region = "us-east-1"
/// profile = "ops"
/// state_value = "ALARM"
/// tags_exclude = ["alarmArn"]
/// ```
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AlarmsConfig {
    /// AWS region to query, also emitted as the `region` tag
    pub region: String,

    #[serde(flatten)]
    pub credentials: CredentialConfig,

    /// Endpoint override, e.g. `http://localhost:8000`
    pub endpoint_url: Option<String>,

    /// Tag names (globs) to keep
    #[serde(default)]
    pub tags_include: Vec<String>,

    /// Tag names (globs) to drop
    #[serde(default)]
    pub tags_exclude: Vec<String>,

    /// Requests per second. Accepted but not enforced yet.
    #[serde(default = "default_ratelimit")]
    pub ratelimit: u32,

    /// Alarm state to harvest, defaults to `ALARM`
    #[serde(default)]
    pub state_value: String,

    /// Poll interval in seconds (used by the poller binary)
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl AlarmsConfig {
    /// Minimal config for a region, everything else defaulted
    pub fn for_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            credentials: CredentialConfig::default(),
            endpoint_url: None,
            tags_include: vec![],
            tags_exclude: vec![],
            ratelimit: default_ratelimit(),
            state_value: String::new(),
            interval: default_interval(),
        }
    }
}

/// Credential sources accepted by the connector
#[derive(Clone, Default, serde::Deserialize)]
pub struct CredentialConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub token: Option<String>,
    pub role_arn: Option<String>,
    pub profile: Option<String>,
    pub shared_credential_file: Option<String>,
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "** redacted **");
        f.debug_struct("CredentialConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &redacted(&self.secret_key))
            .field("token", &redacted(&self.token))
            .field("role_arn", &self.role_arn)
            .field("profile", &self.profile)
            .field("shared_credential_file", &self.shared_credential_file)
            .finish()
    }
}

fn default_ratelimit() -> u32 {
    25
}

fn default_interval() -> u64 {
    60
}

/// Read a JSON or TOML (by `.toml` extension) config file
pub fn read_config_file(path: &str) -> anyhow::Result<AlarmsConfig> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;

    let is_toml = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config = if is_toml {
        toml::from_str(&file_content).context("Invalid configuration file provided!")?
    } else {
        serde_json::from_str(&file_content).context("Invalid configuration file provided!")?
    };

    trace!("loaded config: {config:?}");
    Ok(config)
}
