//! Configuration CLI command handlers

use crate::cli::commands::{ConfigCommand, ConfigKey};
use crate::core::config::{Config, RefreshTokenPolicy};
use crate::error::{CredentialError, Result};

/// Handle configuration commands
pub fn handle_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Set { key, value } => handle_set(key, value),
        ConfigCommand::Get { key } => handle_get(key),
        ConfigCommand::Remove { key } => handle_remove(key),
    }
}

/// Handle setting a configuration value
fn handle_set(key: ConfigKey, value: String) -> Result<()> {
    let mut config = Config::load()?;
    apply(&mut config, key, &value)?;
    config.save()?;

    println!("{} set to: {}", key_name(key), current_value(&config, key));
    Ok(())
}

/// Handle getting a configuration value
fn handle_get(key: ConfigKey) -> Result<()> {
    let config = Config::load()?;
    println!("{}: {}", key_name(key), current_value(&config, key));
    Ok(())
}

/// Handle resetting a configuration value
fn handle_remove(key: ConfigKey) -> Result<()> {
    let mut config = Config::load()?;
    let defaults = Config::default();
    match key {
        ConfigKey::AccountType => config.account_type = defaults.account_type,
        ConfigKey::RefreshPolicy => config.refresh_token_policy = defaults.refresh_token_policy,
        ConfigKey::RefreshTimeout => config.refresh_timeout_secs = defaults.refresh_timeout_secs,
        ConfigKey::LoginServer => config.default_login_server = None,
        ConfigKey::KeyringService => config.keyring_service = defaults.keyring_service,
    }
    config.save()?;

    println!(
        "{} reset to default: {}",
        key_name(key),
        current_value(&config, key)
    );
    Ok(())
}

/// Validate and store a value on the config
fn apply(config: &mut Config, key: ConfigKey, value: &str) -> Result<()> {
    let value = value.trim();
    match key {
        ConfigKey::AccountType => config.account_type = non_empty(key, value)?,
        ConfigKey::KeyringService => config.keyring_service = non_empty(key, value)?,
        ConfigKey::RefreshPolicy => {
            config.refresh_token_policy = RefreshTokenPolicy::from_str(value).ok_or_else(|| {
                CredentialError::InvalidInput(format!(
                    "Invalid refresh policy '{}'. Available policies: lazy, eager",
                    value
                ))
            })?;
        }
        ConfigKey::RefreshTimeout => {
            let secs = value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    CredentialError::InvalidInput(format!(
                        "Invalid refresh timeout '{}'. Expected a positive number of seconds",
                        value
                    ))
                })?;
            config.refresh_timeout_secs = secs;
        }
        ConfigKey::LoginServer => {
            let url = url::Url::parse(value).map_err(|e| {
                CredentialError::InvalidInput(format!("Invalid login server '{}': {}", value, e))
            })?;
            config.default_login_server = Some(url.as_str().trim_end_matches('/').to_string());
        }
    }
    Ok(())
}

fn non_empty(key: ConfigKey, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(CredentialError::InvalidInput(format!(
            "{} must not be empty",
            key_name(key)
        )));
    }
    Ok(value.to_string())
}

fn key_name(key: ConfigKey) -> &'static str {
    match key {
        ConfigKey::AccountType => "Account type",
        ConfigKey::RefreshPolicy => "Refresh policy",
        ConfigKey::RefreshTimeout => "Refresh timeout",
        ConfigKey::LoginServer => "Login server",
        ConfigKey::KeyringService => "Keyring service",
    }
}

fn current_value(config: &Config, key: ConfigKey) -> String {
    match key {
        ConfigKey::AccountType => config.account_type.clone(),
        ConfigKey::RefreshPolicy => config.refresh_token_policy.to_string(),
        ConfigKey::RefreshTimeout => format!("{}s", config.refresh_timeout_secs),
        ConfigKey::LoginServer => config
            .default_login_server
            .clone()
            .unwrap_or_else(|| "Not configured".to_string()),
        ConfigKey::KeyringService => config.keyring_service.clone(),
    }
}
