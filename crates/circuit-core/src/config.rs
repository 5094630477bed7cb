//! Configuration types and loading for the application.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::env_prefix;
use crate::error::CircuitError;

/// Default Circuit host.
pub const DEFAULT_HOST: &str = "eu.yourcircuit.com";
/// Default REST API base path.
pub const DEFAULT_BASE_PATH: &str = "/rest/v2";
/// Default OAuth2 scope requested for the client-credentials grant.
pub const DEFAULT_AUTH_SCOPE: &str = "ALL";
/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// URL scheme used to reach the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS (default).
    #[default]
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

impl FromStr for Protocol {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(CircuitError::Config(format!("unknown protocol: {other}"))),
        }
    }
}

/// Authentication method used to obtain an access token.
///
/// Only the client-credentials grant is implemented. Any other name is kept
/// so the failure can report what was configured.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// OAuth2 client-credentials grant.
    #[default]
    ClientCredentials,
    /// Any other method name; rejected when a token is requested.
    Other(String),
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCredentials => write!(f, "client_credentials"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for AuthMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "client_credentials" => Self::ClientCredentials,
            other => Self::Other(other.to_string()),
        })
    }
}

/// Connection settings for a [`CircuitClient`](crate::CircuitClient).
///
/// Set everything before the first request; the client reads it on every
/// call but never changes it.
#[derive(Debug)]
pub struct ClientConfig {
    /// Hostname (optionally with port) of the Circuit system.
    pub host: String,
    /// Base path of the REST API.
    pub base_path: String,
    /// URL scheme.
    pub protocol: Protocol,
    /// Timeout applied to every HTTP request.
    pub timeout: Duration,
    /// OAuth2 client id.
    pub client_id: Option<String>,
    /// OAuth2 client secret.
    pub client_secret: Option<SecretString>,
    /// Authentication method.
    pub auth_method: AuthMethod,
    /// OAuth2 scope.
    pub auth_scope: String,
    /// Log request and response details.
    pub trace: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            protocol: Protocol::Https,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client_id: None,
            client_secret: None,
            auth_method: AuthMethod::ClientCredentials,
            auth_scope: DEFAULT_AUTH_SCOPE.to_string(),
            trace: false,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given host with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Set the client credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::from(client_secret.into()));
        self
    }

    /// Set the URL scheme.
    #[must_use]
    pub const fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the API base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the authentication method.
    #[must_use]
    pub fn with_auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    /// Set the OAuth2 scope.
    #[must_use]
    pub fn with_auth_scope(mut self, auth_scope: impl Into<String>) -> Self {
        self.auth_scope = auth_scope.into();
        self
    }

    /// Enable or disable request tracing.
    #[must_use]
    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// The `{protocol}://{host}` root of every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL.
    pub fn base_uri(&self) -> crate::Result<Url> {
        Ok(Url::parse(&format!("{}://{}", self.protocol, self.host))?)
    }

    /// The base URI with `path` as its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL.
    pub fn build_uri(&self, path: &str) -> crate::Result<Url> {
        let mut uri = self.base_uri()?;
        uri.set_path(path);
        Ok(uri)
    }

    /// A URI for `path` relative to the API base path.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL.
    pub fn build_api_uri(&self, path: &str) -> crate::Result<Url> {
        self.build_uri(&format!("{}{path}", self.base_path))
    }
}

/// Settings read from the send-circuit YAML config file.
#[derive(Debug, Serialize)]
pub struct AppConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Circuit host.
    pub host: String,
    /// OAuth2 client id.
    pub client_id: Option<String>,
    /// OAuth2 client secret.
    #[serde(serialize_with = "redact_secret")]
    pub client_secret: Option<SecretString>,
    /// OAuth2 scope.
    pub auth_scope: String,
    /// URL scheme.
    pub protocol: Protocol,
    /// REST API base path.
    pub base_path: String,
}

/// Keys as they appear in the file; `None` falls back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileValues {
    timeout: Option<u64>,
    host: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_scope: Option<String>,
    protocol: Option<String>,
    base_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            host: DEFAULT_HOST.to_string(),
            client_id: None,
            client_secret: None,
            auth_scope: DEFAULT_AUTH_SCOPE.to_string(),
            protocol: Protocol::Https,
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file, then `SEND_CIRCUIT_*` environment overrides.
    ///
    /// Missing keys take their defaults; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be parsed, or holds an
    /// invalid value.
    pub fn load_from_path(config_file: &Path) -> Result<Self> {
        Self::load_with_environment(config_file, Environment::with_prefix(&env_prefix()))
    }

    fn load_with_environment(config_file: &Path, environment: Environment) -> Result<Self> {
        let built = Config::builder()
            .add_source(File::from(config_file).format(FileFormat::Yaml).required(true))
            .add_source(environment)
            .build()
            .with_context(|| format!("loading config file {}", config_file.display()))?;

        let values: FileValues = built
            .try_deserialize()
            .with_context(|| format!("parsing config file {}", config_file.display()))?;

        Self::from_values(values)
    }

    fn from_values(values: FileValues) -> Result<Self> {
        let defaults = Self::default();
        let protocol = match values.protocol {
            Some(p) => p.parse::<Protocol>().context("invalid protocol in config")?,
            None => defaults.protocol,
        };

        Ok(Self {
            timeout: values.timeout.unwrap_or(defaults.timeout),
            host: values.host.unwrap_or(defaults.host),
            client_id: values.client_id,
            client_secret: values.client_secret.map(SecretString::from),
            auth_scope: values.auth_scope.unwrap_or(defaults.auth_scope),
            protocol,
            base_path: values.base_path.unwrap_or(defaults.base_path),
        })
    }

    /// Build the client configuration described by this file.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            base_path: self.base_path.clone(),
            protocol: self.protocol,
            timeout: Duration::from_secs(self.timeout),
            client_id: self.client_id.clone(),
            client_secret: self
                .client_secret
                .as_ref()
                .map(|s| SecretString::from(s.expose_secret().to_owned())),
            auth_method: AuthMethod::ClientCredentials,
            auth_scope: self.auth_scope.clone(),
            trace: false,
        }
    }

    /// Render the effective configuration as YAML with the secret redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if YAML serialization fails.
    pub fn to_redacted_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("serializing config to YAML")
    }
}

fn redact_secret<S: Serializer>(
    secret: &Option<SecretString>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match secret {
        Some(_) => serializer.serialize_str("<redacted>"),
        None => serializer.serialize_none(),
    }
}
