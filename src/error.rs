//! Error types for accmgr
//!
//! User-friendly error messages for every way credential resolution,
//! refresh, or account provisioning can fail.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the accmgr library and CLI
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No account of the configured type exists
    #[error("No stored account was found.\n\n  → Run 'accmgr client ensure' or 'accmgr accounts add' to sign in.")]
    NoAccount,

    /// A required stored attribute is absent (or could not be decrypted)
    #[error("The stored account is missing '{0}'.\n\n  → Remove the account with 'accmgr accounts remove --all' and sign in again.")]
    MissingField(&'static str),

    /// The stored instance URL does not parse
    #[error("The stored instance server URL is invalid: {0}")]
    InvalidServerUrl(String),

    /// The identity provider refresh call failed
    #[error(transparent)]
    Refresh(#[from] RefreshFailure),

    /// The account store itself failed (I/O, permission, platform)
    #[error("Cannot access secure storage: {0}\n\n  → On macOS: Make sure Keychain Access is available.\n  → On Linux: Ensure a secret service (like gnome-keyring) is running.")]
    Store(String),

    /// A stored secret could not be encrypted or decrypted
    #[error("Secret encryption failed: {0}")]
    Encryption(String),

    /// Interactive login did not produce credentials
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// The user backed out of the interactive login
    #[error("Login was cancelled.")]
    LoginCancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// Network request error
    #[error("Network request failed: {0}\n\n  → Check your internet connection.")]
    Network(#[from] reqwest::Error),

    /// REST call answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON serialization/deserialization error
    #[error("Failed to parse data: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization/deserialization error
    #[error("Configuration file is invalid: {0}")]
    Toml(String),

    /// Invalid input from user
    #[error("{0}")]
    InvalidInput(String),
}

/// Outcome of a failed token refresh.
///
/// Cloneable because a single refresh outcome is handed to every caller
/// that was waiting on the same in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// The account was removed before or during the refresh
    #[error("Failed to refresh the access token: the account no longer exists.\n\n  → Sign in again.")]
    AccountRemoved,

    /// No refresh token is stored for the account
    #[error("Failed to refresh the access token: no refresh token is stored.\n\n  → Sign in again.")]
    MissingRefreshToken,

    /// The identity provider rejected or failed the refresh
    #[error("Failed to refresh the access token: {0}")]
    Provider(String),

    /// The identity provider did not answer in time
    #[error("Failed to refresh the access token: timed out after {0:?}")]
    TimedOut(Duration),

    /// The account store failed while preparing the refresh
    #[error("Failed to refresh the access token: {0}")]
    Store(String),

    /// The refresh task ended without reporting an outcome
    #[error("Failed to refresh the access token: the refresh was interrupted")]
    Interrupted,
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        CredentialError::Store(err.to_string())
    }
}

impl From<toml::de::Error> for CredentialError {
    fn from(err: toml::de::Error) -> Self {
        CredentialError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for CredentialError {
    fn from(err: toml::ser::Error) -> Self {
        CredentialError::Toml(err.to_string())
    }
}

/// Result type alias using CredentialError
pub type Result<T> = std::result::Result<T, CredentialError>;
