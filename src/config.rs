use crate::constants::*;
use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// How the supplied access key is compared against the configured one.
///
/// `RejectOnMatch` reproduces the behaviour observed in the deployed endpoint,
/// where a request carrying the configured key is refused. Pending product
/// confirmation, `RejectOnMismatch` (a regular shared-secret check) is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialPolicy {
    RejectOnMatch,
    #[default]
    RejectOnMismatch,
}

impl CredentialPolicy {
    /// Returns true when a request presenting `supplied` must be rejected.
    pub fn rejects(&self, configured: &str, supplied: &str) -> bool {
        let matches = configured == supplied;
        match self {
            CredentialPolicy::RejectOnMatch => matches,
            CredentialPolicy::RejectOnMismatch => !matches,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialPolicy::RejectOnMatch => "reject-on-match",
            CredentialPolicy::RejectOnMismatch => "reject-on-mismatch",
        }
    }
}

impl fmt::Display for CredentialPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "reject-on-match" => Ok(CredentialPolicy::RejectOnMatch),
            "reject-on-mismatch" => Ok(CredentialPolicy::RejectOnMismatch),
            other => Err(ConfigError::InvalidValue {
                name: ENV_CREDENTIAL_POLICY,
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub bind_addr: SocketAddr,
    pub access_key: String,
    pub credential_policy: CredentialPolicy,
    /// Absent means the execution primitive applies no timeout of its own.
    pub replay_timeout_secs: Option<u64>,
    /// Scheme used to rebuild origin-form request targets.
    pub default_scheme: String,
    /// Callback body limit. Absent means unlimited; the stream bounds batch size.
    pub max_body_bytes: Option<usize>,
    pub metrics: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            access_key: String::new(),
            credential_policy: CredentialPolicy::default(),
            replay_timeout_secs: None,
            default_scheme: DEFAULT_SCHEME.to_string(),
            max_body_bytes: None,
            metrics: true,
        }
    }
}

impl EndpointConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_key.is_empty() {
            return Err(ConfigError::MissingAccessKey);
        }
        if self.default_scheme != "http" && self.default_scheme != "https" {
            return Err(ConfigError::InvalidValue {
                name: ENV_REPLAY_DEFAULT_SCHEME,
                value: self.default_scheme.clone(),
            });
        }
        Ok(())
    }

    pub fn replay_timeout(&self) -> Option<Duration> {
        self.replay_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub stream_name: String,
    pub region: Option<String>,
    // Copied from the top-level flag by `Config::load`
    #[serde(skip)]
    pub debug: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            stream_name: DEFAULT_STREAM_NAME.to_string(),
            region: None,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub endpoint: EndpointConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration: optional TOML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.transport.debug = config.debug;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_ACCESS_KEY) {
            self.endpoint.access_key = key;
        }
        if let Some(policy) = lookup(ENV_CREDENTIAL_POLICY) {
            self.endpoint.credential_policy = policy.parse()?;
        }
        if let Some(debug) = lookup(ENV_DEBUG) {
            self.debug = parse_flag(ENV_DEBUG, &debug)?;
        }
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.endpoint.bind_addr = addr.parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_BIND_ADDR,
                value: addr.clone(),
            })?;
        }
        if let Some(secs) = lookup(ENV_REPLAY_TIMEOUT_SECS) {
            let secs = secs.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: ENV_REPLAY_TIMEOUT_SECS,
                value: secs.clone(),
            })?;
            self.endpoint.replay_timeout_secs = Some(secs);
        }
        if let Some(scheme) = lookup(ENV_REPLAY_DEFAULT_SCHEME) {
            self.endpoint.default_scheme = scheme;
        }
        if let Some(limit) = lookup(ENV_MAX_BODY_BYTES) {
            let limit = limit.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                name: ENV_MAX_BODY_BYTES,
                value: limit.clone(),
            })?;
            self.endpoint.max_body_bytes = Some(limit);
        }
        if let Some(stream) = lookup(ENV_STREAM_NAME) {
            self.transport.stream_name = stream;
        }
        if let Some(region) = lookup(ENV_AWS_REGION) {
            self.transport.region = Some(region);
        }
        self.transport.debug = self.debug;
        Ok(())
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn reject_on_mismatch_accepts_matching_key() {
        let policy = CredentialPolicy::RejectOnMismatch;
        assert!(!policy.rejects("secret", "secret"));
        assert!(policy.rejects("secret", "other"));
        assert!(policy.rejects("secret", ""));
    }

    #[test]
    fn reject_on_match_inverts_the_check() {
        let policy = CredentialPolicy::RejectOnMatch;
        assert!(policy.rejects("secret", "secret"));
        assert!(!policy.rejects("secret", "other"));
    }

    #[test]
    fn toml_file_sections_are_read() {
        let config = Config::from_toml(
            r#"
            debug = true

            [endpoint]
            bind_addr = "127.0.0.1:9000"
            access_key = "from-file"
            credential_policy = "reject-on-match"
            replay_timeout_secs = 5

            [transport]
            stream_name = "captured"
            "#,
        )
        .unwrap();

        assert!(config.debug);
        assert!(config.transport.debug);
        assert_eq!(config.endpoint.bind_addr.port(), 9000);
        assert_eq!(config.endpoint.access_key, "from-file");
        assert_eq!(config.endpoint.credential_policy, CredentialPolicy::RejectOnMatch);
        assert_eq!(config.endpoint.replay_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.endpoint.default_scheme, "http");
        assert_eq!(config.transport.stream_name, "captured");
    }

    #[test]
    fn example_config_is_valid() {
        let config = Config::from_toml(include_str!("../config.example.toml")).unwrap();
        config.endpoint.validate().unwrap();
        assert_eq!(config.transport.stream_name, DEFAULT_STREAM_NAME);
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config::from_toml("[endpoint]\naccess_key = \"from-file\"\n").unwrap();
        config
            .apply_overrides(lookup_from(&[
                ("ACCESS_KEY", "from-env"),
                ("DEBUG", "true"),
                ("STREAM_NAME", "other-stream"),
                ("CREDENTIAL_POLICY", "reject-on-match"),
                ("MAX_BODY_BYTES", "1048576"),
            ]))
            .unwrap();

        assert_eq!(config.endpoint.access_key, "from-env");
        assert!(config.transport.debug);
        assert_eq!(config.transport.stream_name, "other-stream");
        assert_eq!(config.endpoint.credential_policy, CredentialPolicy::RejectOnMatch);
        assert_eq!(config.endpoint.max_body_bytes, Some(1_048_576));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup_from(&[("CREDENTIAL_POLICY", "allow-all")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "CREDENTIAL_POLICY", .. }));
    }

    #[test]
    fn empty_access_key_fails_validation() {
        let config = EndpointConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingAccessKey)));

        let config = EndpointConfig {
            access_key: "k".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
