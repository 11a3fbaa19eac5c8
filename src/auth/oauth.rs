//! OAuth 2.0 refresh-token grant
//!
//! Posts `grant_type=refresh_token` to `{login_server}/services/oauth2/token`
//! and reads the JSON token response.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{RefreshRequest, TokenBundle, TokenRefreshService};
use crate::core::account::{KEY_CLIENT_ID, KEY_LOGIN_SERVER};
use crate::error::{CredentialError, RefreshFailure, Result};

/// Token endpoint path relative to the login server
const TOKEN_PATH: &str = "/services/oauth2/token";

/// Token response from the identity provider
#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    access_token: String,
    /// Only sent when the provider rotates refresh tokens
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    instance_url: Option<String>,
}

/// Error response from the identity provider
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Refresh token request body
#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    refresh_token: &'a str,
    format: &'a str,
}

/// Refresh service talking to an OAuth token endpoint
pub struct OAuthTokenEndpoint {
    client: Client,
    default_login_server: Option<String>,
}

impl OAuthTokenEndpoint {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            default_login_server: None,
        }
    }

    /// Login server used when the account does not record one
    pub fn with_default_login_server(mut self, login_server: Option<String>) -> Self {
        self.default_login_server = login_server;
        self
    }

    fn token_url(login_server: &str) -> String {
        format!("{}{}", login_server.trim_end_matches('/'), TOKEN_PATH)
    }
}

impl Default for OAuthTokenEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenRefreshService for OAuthTokenEndpoint {
    async fn request_token_refresh(&self, request: &RefreshRequest) -> Result<TokenBundle> {
        let login_server = request
            .login_server
            .as_deref()
            .or(self.default_login_server.as_deref())
            .ok_or(CredentialError::MissingField(KEY_LOGIN_SERVER))?;
        let client_id = request
            .client_id
            .as_deref()
            .ok_or(CredentialError::MissingField(KEY_CLIENT_ID))?;

        let body = RefreshTokenRequest {
            grant_type: "refresh_token",
            client_id,
            refresh_token: request.refresh_token.expose_secret(),
            format: "json",
        };

        debug!(account = %request.account, "Requesting new access token");
        let response = self
            .client
            .post(Self::token_url(login_server))
            .header("Accept", "application/json")
            .form(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            if let Ok(token_response) = serde_json::from_str::<RefreshTokenResponse>(&text) {
                return Ok(TokenBundle {
                    access_token: SecretString::from(token_response.access_token),
                    refresh_token: token_response.refresh_token.map(SecretString::from),
                    instance_url: token_response.instance_url,
                });
            }
        }

        // Check for error response
        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&text) {
            let reason = match error_response.error_description {
                Some(description) => format!("{}: {}", error_response.error, description),
                None => error_response.error,
            };
            return Err(RefreshFailure::Provider(reason).into());
        }

        Err(RefreshFailure::Provider(format!(
            "Invalid response from token endpoint (HTTP {})",
            status
        ))
        .into())
    }
}
