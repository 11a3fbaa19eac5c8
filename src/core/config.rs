//! Application configuration management
//!
//! Handles loading and saving settings including:
//! - Account type namespace
//! - Refresh-token validation policy
//! - Refresh timeout and default login server
//!
//! `ClientSettings` is the resolved runtime view handed to the core, with
//! environment overrides applied.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, Result};

/// Overrides the configuration file location
pub const CONFIG_PATH_ENV: &str = "ACCMGR_CONFIG";
/// Overrides the configured account type
pub const ACCOUNT_TYPE_ENV: &str = "ACCMGR_ACCOUNT_TYPE";
/// Key used to encrypt and decrypt stored tokens
pub const PASSCODE_ENV: &str = "ACCMGR_PASSCODE";

const DEFAULT_ACCOUNT_TYPE: &str = "accmgr.oauth";
const DEFAULT_KEYRING_SERVICE: &str = "accmgr";

/// When a missing refresh token is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshTokenPolicy {
    /// Only `refresh()` fails; resolution succeeds with a read-only client
    #[default]
    Lazy,
    /// Resolution fails with `MissingField("refreshToken")`
    Eager,
}

impl RefreshTokenPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshTokenPolicy::Lazy => "lazy",
            RefreshTokenPolicy::Eager => "eager",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lazy" => Some(RefreshTokenPolicy::Lazy),
            "eager" => Some(RefreshTokenPolicy::Eager),
            _ => None,
        }
    }
}

impl std::fmt::Display for RefreshTokenPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Namespace separating this application's accounts in the store
    #[serde(default = "default_account_type")]
    pub account_type: String,

    /// Keyring service name the accounts are stored under
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,

    #[serde(default)]
    pub refresh_token_policy: RefreshTokenPolicy,

    /// Upper bound on a single token refresh call in seconds
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,

    /// Login server used when an account does not record one
    #[serde(default)]
    pub default_login_server: Option<String>,
}

fn default_account_type() -> String {
    DEFAULT_ACCOUNT_TYPE.to_string()
}

fn default_keyring_service() -> String {
    DEFAULT_KEYRING_SERVICE.to_string()
}

fn default_refresh_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_type: default_account_type(),
            keyring_service: default_keyring_service(),
            refresh_token_policy: RefreshTokenPolicy::default(),
            refresh_timeout_secs: default_refresh_timeout(),
            default_login_server: None,
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if not exists
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;

        Ok(())
    }

    /// Get the configuration file path
    ///
    /// `ACCMGR_CONFIG` takes priority over the platform config directory.
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let project_dirs = ProjectDirs::from("com", "accmgr", "accmgr").ok_or_else(|| {
            CredentialError::Config("Could not determine config directory".into())
        })?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        // A zero timeout would fail every refresh before the provider answers
        if self.refresh_timeout_secs == 0 {
            return Err(CredentialError::Config(
                "refresh_timeout_secs must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}

/// Runtime settings shared by the resolver, provisioner and refreshers
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub account_type: String,
    /// Key handed to the encryptor for every stored token
    pub passcode_hash: SecretString,
    pub refresh_token_policy: RefreshTokenPolicy,
    pub refresh_timeout: Duration,
    /// Login server offered to the interactive login
    pub login_server: Option<String>,
}

impl ClientSettings {
    pub fn new(account_type: impl Into<String>) -> Self {
        Self {
            account_type: account_type.into(),
            passcode_hash: SecretString::from(String::new()),
            refresh_token_policy: RefreshTokenPolicy::default(),
            refresh_timeout: Duration::from_secs(default_refresh_timeout()),
            login_server: None,
        }
    }

    /// Build settings from a loaded config
    ///
    /// Priority: environment variable > config file > default
    pub fn from_config(config: &Config) -> Self {
        let account_type = std::env::var(ACCOUNT_TYPE_ENV)
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| config.account_type.clone());
        let passcode = std::env::var(PASSCODE_ENV).unwrap_or_default();

        Self {
            account_type,
            passcode_hash: SecretString::from(passcode),
            refresh_token_policy: config.refresh_token_policy,
            refresh_timeout: config.refresh_timeout(),
            login_server: config.default_login_server.clone(),
        }
    }

    pub fn with_passcode(mut self, passcode_hash: SecretString) -> Self {
        self.passcode_hash = passcode_hash;
        self
    }

    pub fn with_policy(mut self, policy: RefreshTokenPolicy) -> Self {
        self.refresh_token_policy = policy;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn with_login_server(mut self, login_server: impl Into<String>) -> Self {
        self.login_server = Some(login_server.into());
        self
    }
}
