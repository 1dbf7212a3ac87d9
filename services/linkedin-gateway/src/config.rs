//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret and the optional gateway API key come from env vars or
//! from files named in the TOML, never from the TOML itself.

use common::Secret;
use linkedin_auth::{DEFAULT_OAUTH_BASE_URL, DEFAULT_SCOPES, OAuthSettings};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub linkedin: LinkedInConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// File holding the static key clients must present as a bearer token
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
    #[serde(skip)]
    pub api_key: Option<Secret<String>>,
}

/// Registered LinkedIn app and API endpoints
#[derive(Debug, Deserialize)]
pub struct LinkedInConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    /// Path to a file containing the client secret (alternative to LINKEDIN_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_oauth_base_url")]
    pub oauth_base_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,
}

/// Where the single access token and member URN records live
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_access_token_file")]
    pub access_token_file: PathBuf,
    #[serde(default = "default_profile_urn_file")]
    pub profile_urn_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            access_token_file: default_access_token_file(),
            profile_urn_file: default_profile_urn_file(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

fn default_oauth_base_url() -> String {
    DEFAULT_OAUTH_BASE_URL.to_string()
}

fn default_api_base_url() -> String {
    linkedin_client::DEFAULT_API_BASE_URL.to_string()
}

fn default_metadata_timeout() -> u64 {
    10
}

fn default_access_token_file() -> PathBuf {
    PathBuf::from("linkedin_access_token.json")
}

fn default_profile_urn_file() -> PathBuf {
    PathBuf::from("linkedin_profile_urn.json")
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. LINKEDIN_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    ///
    /// The API key follows the same rule with GATEWAY_API_KEY and
    /// api_key_file; without either the gate is off.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        config.apply_env();
        config.linkedin.client_secret =
            resolve_secret("LINKEDIN_CLIENT_SECRET", config.linkedin.client_secret_file.as_deref())?;
        config.server.api_key =
            resolve_secret("GATEWAY_API_KEY", config.server.api_key_file.as_deref())?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("LINKEDIN_CLIENT_ID") {
            self.linkedin.client_id = v;
        }
        if let Ok(v) = std::env::var("REDIRECT_URI") {
            self.linkedin.redirect_uri = v;
        }
        if let Ok(v) = std::env::var("ACCESS_TOKEN_FILE") {
            self.storage.access_token_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PROFILE_URN_FILE") {
            self.storage.profile_urn_file = PathBuf::from(v);
        }
    }

    fn validate(&self) -> common::Result<()> {
        if self.linkedin.client_id.trim().is_empty() {
            return Err(common::Error::MissingSetting("linkedin.client_id"));
        }
        if self.linkedin.client_secret.is_none() {
            return Err(common::Error::MissingSetting("linkedin.client_secret"));
        }
        if self.linkedin.redirect_uri.trim().is_empty() {
            return Err(common::Error::MissingSetting("linkedin.redirect_uri"));
        }

        for (name, value) in [
            ("redirect_uri", &self.linkedin.redirect_uri),
            ("oauth_base_url", &self.linkedin.oauth_base_url),
            ("api_base_url", &self.linkedin.api_base_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {value}"
                )));
            }
        }

        if self.linkedin.metadata_timeout_secs == 0 {
            return Err(common::Error::Config(
                "metadata_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// OAuth settings for the token exchange and authorization URL.
    pub fn oauth_settings(&self) -> common::Result<OAuthSettings> {
        let client_secret = self
            .linkedin
            .client_secret
            .clone()
            .ok_or(common::Error::MissingSetting("linkedin.client_secret"))?;
        Ok(OAuthSettings {
            client_id: self.linkedin.client_id.clone(),
            client_secret,
            redirect_uri: self.linkedin.redirect_uri.clone(),
            scopes: self.linkedin.scopes.clone(),
            oauth_base_url: self.linkedin.oauth_base_url.clone(),
        })
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.linkedin.metadata_timeout_secs)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("linkedin-gateway.toml")
    }
}

/// Env var wins; otherwise read and trim the file. A whitespace-only file
/// counts as unset, an unreadable one is an error.
fn resolve_secret(env_var: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env_var) {
        let value = value.trim().to_owned();
        return Ok((!value.is_empty()).then(|| Secret::new(value)));
    }
    let Some(file) = file else {
        return Ok(None);
    };
    let value = std::fs::read_to_string(file).map_err(|e| {
        common::Error::Config(format!("failed to read {}: {e}", file.display()))
    })?;
    let value = value.trim().to_owned();
    Ok((!value.is_empty()).then(|| Secret::new(value)))
}
