//! Identity provider collaborators
//!
//! - [`TokenRefreshService`] exchanges a refresh token for a new access token
//! - [`LoginFlow`] runs the interactive sign-in that creates new accounts
//!
//! The authorization-code exchange itself happens behind `LoginFlow`; the
//! core only consumes the token pair it yields.

pub mod oauth;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::core::account::{Account, AccountCredentials};
use crate::error::Result;

pub use oauth::OAuthTokenEndpoint;

/// Everything the identity provider needs to mint a new access token
#[derive(Debug, Clone)]
pub struct RefreshRequest {
    pub account: Account,
    pub refresh_token: SecretString,
    pub login_server: Option<String>,
    pub client_id: Option<String>,
}

/// Tokens returned by a successful refresh
#[derive(Debug, Clone)]
pub struct TokenBundle {
    pub access_token: SecretString,
    /// Present when the provider rotates refresh tokens
    pub refresh_token: Option<SecretString>,
    /// Present when the provider moved the account to another instance
    pub instance_url: Option<String>,
}

impl TokenBundle {
    pub fn access_only(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: None,
            instance_url: None,
        }
    }
}

/// Options handed to the interactive login
#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub account_type: String,
    pub login_server: Option<String>,
}

/// Non-interactive token refresh against the identity provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefreshService: Send + Sync {
    async fn request_token_refresh(&self, request: &RefreshRequest) -> Result<TokenBundle>;
}

/// Interactive sign-in producing a fresh token pair
///
/// Returns `LoginCancelled` when the user backs out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginFlow: Send + Sync {
    async fn login(&self, options: &LoginOptions) -> Result<AccountCredentials>;
}
