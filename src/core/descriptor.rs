//! Resolved client credentials

use std::fmt;

use secrecy::SecretString;
use url::Url;

use crate::core::account::{mask_token, Account};
use crate::core::refresher::{RefreshOutcome, TokenRefresher};

/// Everything needed to issue authenticated REST calls for one account
///
/// Immutable apart from the access token, which is replaced in place by the
/// bound [`TokenRefresher`].
#[derive(Debug)]
pub struct ClientDescriptor {
    account: Account,
    instance_url: Url,
    username: String,
    user_id: String,
    org_id: String,
    refresher: TokenRefresher,
}

impl ClientDescriptor {
    pub(crate) fn new(
        account: Account,
        instance_url: Url,
        username: String,
        user_id: String,
        org_id: String,
        refresher: TokenRefresher,
    ) -> Self {
        Self {
            account,
            instance_url,
            username,
            user_id,
            org_id,
            refresher,
        }
    }

    /// The current access token
    ///
    /// `None` while a refresh is in flight or after one failed; the token
    /// held before a refresh started is never returned again.
    pub fn access_token(&self) -> Option<SecretString> {
        self.refresher.current_token()
    }

    /// Replace the access token through the single-flight refresher
    pub async fn refresh_access_token(&self) -> RefreshOutcome {
        self.refresher.refresh().await
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn instance_url(&self) -> &Url {
        &self.instance_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }
}

impl fmt::Display for ClientDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self
            .access_token()
            .map(|token| mask_token(&token))
            .unwrap_or_else(|| "<none>".to_string());
        writeln!(f, "Account:      {}", self.account.name)?;
        writeln!(f, "Username:     {}", self.username)?;
        writeln!(f, "Instance:     {}", self.instance_url)?;
        writeln!(f, "User ID:      {}", self.user_id)?;
        writeln!(f, "Org ID:       {}", self.org_id)?;
        write!(f, "Access token: {}", token)
    }
}
