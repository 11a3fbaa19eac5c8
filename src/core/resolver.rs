//! Turning stored account data into a ready-to-use client
//!
//! Resolution reads the first account of the configured type, decrypts its
//! tokens and checks the required attributes in a fixed order, reporting the
//! first one missing:
//! access token, instance server, user id, org id.

use secrecy::SecretString;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::account::{
    Account, KEY_ACCESS_TOKEN, KEY_INSTANCE_SERVER, KEY_ORG_ID, KEY_REFRESH_TOKEN, KEY_USERNAME,
    KEY_USER_ID,
};
use crate::core::config::RefreshTokenPolicy;
use crate::core::descriptor::ClientDescriptor;
use crate::core::refresher::TokenRefresher;
use crate::core::ClientContext;
use crate::error::{CredentialError, Result};

/// Looks up accounts and assembles client descriptors
#[derive(Clone)]
pub struct CredentialResolver {
    ctx: ClientContext,
}

impl CredentialResolver {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    /// First account of the configured type, if any
    pub fn active_account(&self) -> Result<Option<Account>> {
        Ok(self.list_all()?.into_iter().next())
    }

    /// Account of the configured type with exactly this name
    pub fn resolve_by_name(&self, name: &str) -> Result<Option<Account>> {
        Ok(self
            .list_all()?
            .into_iter()
            .find(|account| account.name == name))
    }

    /// All accounts of the configured type, in store order
    pub fn list_all(&self) -> Result<Vec<Account>> {
        self.ctx.store.list_accounts(self.ctx.account_type())
    }

    /// Build a descriptor for the active account
    ///
    /// ## Errors
    ///
    /// - `NoAccount` - no account of the configured type exists
    /// - `MissingField` - a required attribute is absent or undecryptable
    /// - `InvalidServerUrl` - the instance server does not parse
    /// - `Store` - the account store failed
    pub fn resolve_active(&self) -> Result<ClientDescriptor> {
        let account = self.active_account()?.ok_or_else(|| {
            info!("No account of type {} found", self.ctx.account_type());
            CredentialError::NoAccount
        })?;
        let refresher = self.refresher_for(&account)?;
        self.resolve(account, refresher)
    }

    /// Refresher seeded with the account's stored tokens
    ///
    /// Does not check any other attribute, so it also works for an account
    /// whose access token is missing or undecryptable.
    pub fn refresher_for(&self, account: &Account) -> Result<TokenRefresher> {
        // OAuth tokens are stored encrypted
        let access_token = self.decrypted_attribute(account, KEY_ACCESS_TOKEN)?;
        let refresh_token = self.decrypted_secret(account)?;
        Ok(TokenRefresher::with_tokens(
            account.clone(),
            access_token,
            refresh_token,
            self.ctx.clone(),
        ))
    }

    /// Build a descriptor around an existing refresher
    ///
    /// The access token is the refresher's current one rather than the
    /// stored copy, so a token that could not be written back is still used.
    pub fn resolve_with(&self, refresher: TokenRefresher) -> Result<ClientDescriptor> {
        let account = refresher.account().clone();
        self.resolve(account, refresher)
    }

    fn resolve(&self, account: Account, refresher: TokenRefresher) -> Result<ClientDescriptor> {
        let has_access_token = refresher.current_token().is_some();
        let server = self.attribute(&account, KEY_INSTANCE_SERVER)?;
        let user_id = self.attribute(&account, KEY_USER_ID)?;
        let org_id = self.attribute(&account, KEY_ORG_ID)?;
        let username = self
            .attribute(&account, KEY_USERNAME)?
            .unwrap_or_else(|| account.name.clone());

        if !has_access_token {
            return Err(CredentialError::MissingField(KEY_ACCESS_TOKEN));
        }
        let server = server.ok_or(CredentialError::MissingField(KEY_INSTANCE_SERVER))?;
        let user_id = user_id.ok_or(CredentialError::MissingField(KEY_USER_ID))?;
        let org_id = org_id.ok_or(CredentialError::MissingField(KEY_ORG_ID))?;

        if self.ctx.settings.refresh_token_policy == RefreshTokenPolicy::Eager
            && !refresher.has_refresh_token()
        {
            return Err(CredentialError::MissingField(KEY_REFRESH_TOKEN));
        }

        let instance_url = parse_server_url(&server)?;

        debug!(account = %account, "Resolved client credentials");
        Ok(ClientDescriptor::new(
            account,
            instance_url,
            username,
            user_id,
            org_id,
            refresher,
        ))
    }

    /// Plaintext attribute; empty values count as absent
    fn attribute(&self, account: &Account, key: &str) -> Result<Option<String>> {
        Ok(self
            .ctx
            .store
            .get_attribute(account, key)?
            .filter(|value| !value.is_empty()))
    }

    fn decrypted_attribute(&self, account: &Account, key: &str) -> Result<Option<SecretString>> {
        let ciphertext = self.attribute(account, key)?;
        Ok(self.decrypt(account, key, ciphertext))
    }

    fn decrypted_secret(&self, account: &Account) -> Result<Option<SecretString>> {
        let ciphertext = self
            .ctx
            .store
            .get_encrypted_secret(account)?
            .filter(|value| !value.is_empty());
        Ok(self.decrypt(account, KEY_REFRESH_TOKEN, ciphertext))
    }

    /// Undecryptable values are treated as absent
    fn decrypt(
        &self,
        account: &Account,
        key: &str,
        ciphertext: Option<String>,
    ) -> Option<SecretString> {
        let ciphertext = ciphertext?;
        match self
            .ctx
            .encryptor
            .decrypt(&ciphertext, &self.ctx.settings.passcode_hash)
        {
            Ok(plaintext) if !plaintext.is_empty() => Some(SecretString::from(plaintext)),
            Ok(_) => None,
            Err(e) => {
                warn!(account = %account, "Could not decrypt {}: {}", key, e);
                None
            }
        }
    }
}

fn parse_server_url(server: &str) -> Result<Url> {
    match Url::parse(server) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url),
        Ok(_) => {
            warn!("Invalid server URL {}", server);
            Err(CredentialError::InvalidServerUrl(server.to_string()))
        }
        Err(e) => {
            warn!("Invalid server URL {}: {}", server, e);
            Err(CredentialError::InvalidServerUrl(format!("{} ({})", server, e)))
        }
    }
}
