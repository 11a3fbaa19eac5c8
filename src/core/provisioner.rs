//! Creating, updating and removing stored accounts
//!
//! Accounts are written after a completed authorization and removed on
//! logout. Batch removal is best effort: every account is attempted and
//! individual failures are only reported.

use futures::future::join_all;
use secrecy::ExposeSecret;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::account::{
    Account, AccountCredentials, AttributeMap, KEY_ACCESS_TOKEN, KEY_ACCOUNT_NAME,
    KEY_ACCOUNT_TYPE, KEY_CLIENT_ID, KEY_INSTANCE_SERVER, KEY_LOGIN_SERVER, KEY_ORG_ID,
    KEY_USERNAME, KEY_USER_ID,
};
use crate::core::ClientContext;
use crate::error::{CredentialError, Result};

/// Result of a best-effort batch removal
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemovalReport {
    /// Names of the accounts that were removed
    pub removed: Vec<String>,
    /// Account name and reason for every removal that failed
    pub failed: Vec<(String, String)>,
}

impl RemovalReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes and deletes account records
#[derive(Clone)]
pub struct AccountProvisioner {
    ctx: ClientContext,
}

impl AccountProvisioner {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    /// Store the credentials of a completed authorization
    ///
    /// Both tokens are encrypted before they reach the store. An existing
    /// account with the same username is overwritten rather than duplicated.
    /// Returns the attribute set that was written.
    pub fn create_or_update(&self, credentials: &AccountCredentials) -> Result<AttributeMap> {
        if credentials.username.trim().is_empty() {
            return Err(CredentialError::InvalidInput(
                "A username is required to store an account".to_string(),
            ));
        }

        let key = &self.ctx.settings.passcode_hash;
        let encryptor = &self.ctx.encryptor;
        let encrypted_access =
            encryptor.encrypt(credentials.access_token.expose_secret(), key)?;
        let encrypted_refresh =
            encryptor.encrypt(credentials.refresh_token.expose_secret(), key)?;

        let account_type = self.ctx.account_type();
        let mut attributes = AttributeMap::new();
        attributes.insert(KEY_ACCOUNT_NAME.into(), credentials.username.clone());
        attributes.insert(KEY_ACCOUNT_TYPE.into(), account_type.to_string());
        attributes.insert(KEY_USERNAME.into(), credentials.username.clone());
        attributes.insert(KEY_LOGIN_SERVER.into(), credentials.login_url.clone());
        attributes.insert(KEY_INSTANCE_SERVER.into(), credentials.instance_url.clone());
        attributes.insert(KEY_CLIENT_ID.into(), credentials.client_id.clone());
        attributes.insert(KEY_ORG_ID.into(), credentials.org_id.clone());
        attributes.insert(KEY_USER_ID.into(), credentials.user_id.clone());
        attributes.insert(KEY_ACCESS_TOKEN.into(), encrypted_access);

        let account = Account::new(credentials.username.clone(), account_type);
        let store = &self.ctx.store;
        let exists = store
            .list_accounts(account_type)?
            .iter()
            .any(|existing| existing.name == account.name);

        if exists {
            for (key, value) in &attributes {
                store.set_attribute(&account, key, value)?;
            }
            store.set_encrypted_secret(&account, &encrypted_refresh)?;
            info!(account = %account, "Updated stored account");
        } else {
            if !store.add_account(&account, &encrypted_refresh, &attributes)? {
                return Err(CredentialError::Store(format!(
                    "the store refused to add account {}",
                    account
                )));
            }
            info!(account = %account, "Created stored account");
        }

        Ok(attributes)
    }

    /// Remove every given account, continuing past failures
    ///
    /// All removals are issued before any result is collected.
    pub async fn remove_all(&self, accounts: &[Account]) -> RemovalReport {
        let store = &self.ctx.store;
        let results = join_all(accounts.iter().map(|account| async move {
            (account, store.remove_account(account).await)
        }))
        .await;

        let mut report = RemovalReport::default();
        for (account, result) in results {
            match result {
                Ok(true) => report.removed.push(account.name.clone()),
                Ok(false) => {
                    warn!(account = %account, "Store declined to remove account");
                    report
                        .failed
                        .push((account.name.clone(), "removal declined".to_string()));
                }
                Err(e) => {
                    warn!(account = %account, "Exception removing account: {}", e);
                    report.failed.push((account.name.clone(), e.to_string()));
                }
            }
        }
        report
    }

    /// Remove the active account and wait for the outcome
    ///
    /// `Ok(None)` when there is no active account.
    pub async fn remove_active(&self) -> Result<Option<bool>> {
        let Some(account) = self.active_account()? else {
            return Ok(None);
        };
        let removed = self.ctx.store.remove_account(&account).await?;
        info!(account = %account, "Removed active account");
        Ok(Some(removed))
    }

    /// Remove the active account in the background, then call `on_done`
    ///
    /// Returns `None` and never calls `on_done` when there is no active
    /// account.
    pub fn remove_active_with<F>(&self, on_done: F) -> Result<Option<JoinHandle<()>>>
    where
        F: FnOnce(Result<bool>) + Send + 'static,
    {
        let Some(account) = self.active_account()? else {
            return Ok(None);
        };

        let store = self.ctx.store.clone();
        Ok(Some(tokio::spawn(async move {
            let result = store.remove_account(&account).await;
            on_done(result);
        })))
    }

    fn active_account(&self) -> Result<Option<Account>> {
        Ok(self
            .ctx
            .store
            .list_accounts(self.ctx.account_type())?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use secrecy::SecretString;
    use tokio::sync::oneshot;

    use crate::auth::MockTokenRefreshService;
    use crate::core::PassthroughEncryptor;
    use crate::core::ClientSettings;
    use crate::store::{AccountStore, MemoryAccountStore, MockAccountStore};
    use crate::test_support::{alice, context, seeded_store, ACCOUNT_TYPE};

    fn provisioner(store: Arc<MemoryAccountStore>) -> AccountProvisioner {
        AccountProvisioner::new(context(store, Arc::new(MockTokenRefreshService::new())))
    }

    fn credentials(username: &str, access_token: &str) -> AccountCredentials {
        AccountCredentials {
            username: username.to_string(),
            refresh_token: SecretString::from("R1"),
            access_token: SecretString::from(access_token.to_string()),
            instance_url: "https://na1.example.com".to_string(),
            login_url: "https://login.example.com".to_string(),
            client_id: "client-1".to_string(),
            org_id: "00Dx".to_string(),
            user_id: "005x".to_string(),
        }
    }

    #[test]
    fn test_create_encrypts_tokens_and_returns_attributes() {
        let store = Arc::new(MemoryAccountStore::new());
        let written = provisioner(store.clone())
            .create_or_update(&credentials("bob", "T1"))
            .unwrap();

        assert_eq!(written.get(KEY_ACCESS_TOKEN).map(String::as_str), Some("enc:T1"));
        assert_eq!(written.get(KEY_ACCOUNT_TYPE).map(String::as_str), Some(ACCOUNT_TYPE));
        assert_eq!(written.get(KEY_ORG_ID).map(String::as_str), Some("00Dx"));

        let bob = Account::new("bob", ACCOUNT_TYPE);
        assert_eq!(store.get_encrypted_secret(&bob).unwrap().as_deref(), Some("enc:R1"));
        assert_eq!(
            store.get_attribute(&bob, KEY_INSTANCE_SERVER).unwrap().as_deref(),
            Some("https://na1.example.com")
        );
    }

    #[test]
    fn test_create_twice_overwrites_instead_of_duplicating() {
        let store = Arc::new(MemoryAccountStore::new());
        let provisioner = provisioner(store.clone());

        provisioner.create_or_update(&credentials("bob", "T1")).unwrap();
        provisioner.create_or_update(&credentials("bob", "T2")).unwrap();

        let accounts = store.list_accounts(ACCOUNT_TYPE).unwrap();
        assert_eq!(accounts, vec![Account::new("bob", ACCOUNT_TYPE)]);
        assert_eq!(
            store.get_attribute(&accounts[0], KEY_ACCESS_TOKEN).unwrap().as_deref(),
            Some("enc:T2")
        );
    }

    #[test]
    fn test_create_requires_username() {
        let err = provisioner(Arc::new(MemoryAccountStore::new()))
            .create_or_update(&credentials("  ", "T1"))
            .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidInput(_)));
    }

    #[test]
    fn test_create_reports_refused_add() {
        let mut store = MockAccountStore::new();
        store.expect_list_accounts().returning(|_| Ok(Vec::new()));
        store.expect_add_account().returning(|_, _, _| Ok(false));
        let ctx = ClientContext::new(
            Arc::new(store),
            Arc::new(PassthroughEncryptor),
            Arc::new(MockTokenRefreshService::new()),
            ClientSettings::new(ACCOUNT_TYPE),
        );

        let err = AccountProvisioner::new(ctx)
            .create_or_update(&credentials("bob", "T1"))
            .unwrap_err();
        assert!(matches!(err, CredentialError::Store(_)));
    }

    #[tokio::test]
    async fn test_remove_all_continues_past_failures() {
        let store = Arc::new(MemoryAccountStore::new());
        let provisioner = provisioner(store.clone());
        for name in ["a", "b", "c"] {
            provisioner.create_or_update(&credentials(name, "T1")).unwrap();
        }
        store.fail_removal_of("b");

        let accounts = store.list_accounts(ACCOUNT_TYPE).unwrap();
        let report = provisioner.remove_all(&accounts).await;

        assert_eq!(report.removed, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b");
        assert!(!report.is_complete());
        assert_eq!(
            store.list_accounts(ACCOUNT_TYPE).unwrap(),
            vec![Account::new("b", ACCOUNT_TYPE)]
        );
    }

    #[tokio::test]
    async fn test_remove_active() {
        let store = seeded_store();
        let provisioner = provisioner(store.clone());

        assert_eq!(provisioner.remove_active().await.unwrap(), Some(true));
        assert_eq!(provisioner.remove_active().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_active_with_invokes_callback() {
        let store = seeded_store();
        let (tx, rx) = oneshot::channel();

        let handle = provisioner(store.clone())
            .remove_active_with(move |result| {
                let _ = tx.send(result.ok());
            })
            .unwrap()
            .expect("an active account exists");
        handle.await.unwrap();

        assert_eq!(rx.await.unwrap(), Some(true));
        assert!(store.list_accounts(ACCOUNT_TYPE).unwrap().is_empty());
        assert!(!store.list_accounts(ACCOUNT_TYPE).unwrap().contains(&alice()));
    }

    #[tokio::test]
    async fn test_remove_active_with_is_noop_without_account() {
        let store = Arc::new(MemoryAccountStore::new());
        let handle = provisioner(store)
            .remove_active_with(|_| panic!("callback must not run"))
            .unwrap();
        assert!(handle.is_none());
    }
}
