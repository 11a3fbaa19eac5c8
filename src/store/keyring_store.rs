//! Account storage in the system keyring
//!
//! Each account is a JSON record (encrypted secret plus attributes) stored as
//! the password of keyring entry `(service, "<type>:<name>")`. Keyrings
//! cannot enumerate their entries, so an index entry
//! `(service, "<type>:__accounts")` holds the account names in creation order.
//!
//! Records are cached in memory to minimize keychain prompts.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::account::{Account, AttributeMap};
use crate::error::{CredentialError, Result};
use crate::store::AccountStore;

const INDEX_SUFFIX: &str = "__accounts";
const RECORD_VERSION: u8 = 1;

/// Serializable format for keyring storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    attributes: AttributeMap,
    /// Version for future migrations
    version: u8,
}

/// Account store backed by the OS credential store
pub struct KeyringAccountStore {
    service: String,
    // Option<Option<T>> semantics per keyring user:
    //   - absent = not yet fetched from keyring
    //   - Some(None) = fetched, but no record exists
    //   - Some(Some(record)) = fetched and cached
    cache: RwLock<HashMap<String, Option<StoredRecord>>>,
}

impl KeyringAccountStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, user: &str) -> Result<Entry> {
        Ok(Entry::new(&self.service, user)?)
    }

    fn load_index(&self, account_type: &str) -> Result<Vec<String>> {
        let entry = self.entry(&index_user(account_type))?;
        match entry.get_password() {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(CredentialError::Store(format!(
                "Cannot access system keychain. Make sure your keyring is unlocked. ({})",
                e
            ))),
        }
    }

    fn save_index(&self, account_type: &str, names: &[String]) -> Result<()> {
        let entry = self.entry(&index_user(account_type))?;
        if names.is_empty() {
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(CredentialError::Store(e.to_string())),
            };
        }
        entry.set_password(&serde_json::to_string(names)?)?;
        Ok(())
    }

    /// Priority: cache > keyring
    fn load_record(&self, account: &Account) -> Result<Option<StoredRecord>> {
        let user = record_user(account);

        if let Ok(cache) = self.cache.read() {
            if let Some(cached) = cache.get(&user) {
                return Ok(cached.clone());
            }
        }

        let entry = self.entry(&user)?;
        let result = match entry.get_password() {
            Ok(json) => Some(serde_json::from_str::<StoredRecord>(&json).map_err(|e| {
                CredentialError::Store(format!("Invalid stored account record: {}", e))
            })?),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                return Err(CredentialError::Store(format!(
                    "Cannot access system keychain: {}",
                    e
                )))
            }
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(user, result.clone());
        }

        Ok(result)
    }

    fn save_record(&self, account: &Account, record: StoredRecord) -> Result<()> {
        let user = record_user(account);
        let entry = self.entry(&user)?;
        entry.set_password(&serde_json::to_string(&record)?)?;

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(user, Some(record));
        }

        Ok(())
    }

    fn update_record(
        &self,
        account: &Account,
        apply: impl FnOnce(&mut StoredRecord),
    ) -> Result<()> {
        let mut record = self
            .load_record(account)?
            .ok_or_else(|| CredentialError::Store(format!("account {} not found", account)))?;
        apply(&mut record);
        self.save_record(account, record)
    }
}

fn record_user(account: &Account) -> String {
    format!("{}:{}", account.account_type, account.name)
}

fn index_user(account_type: &str) -> String {
    format!("{}:{}", account_type, INDEX_SUFFIX)
}

#[async_trait]
impl AccountStore for KeyringAccountStore {
    fn list_accounts(&self, account_type: &str) -> Result<Vec<Account>> {
        Ok(self
            .load_index(account_type)?
            .into_iter()
            .map(|name| Account::new(name, account_type))
            .collect())
    }

    fn get_attribute(&self, account: &Account, key: &str) -> Result<Option<String>> {
        Ok(self
            .load_record(account)?
            .and_then(|record| record.attributes.get(key).cloned()))
    }

    fn set_attribute(&self, account: &Account, key: &str, value: &str) -> Result<()> {
        self.update_record(account, |record| {
            record.attributes.insert(key.to_string(), value.to_string());
        })
    }

    fn get_encrypted_secret(&self, account: &Account) -> Result<Option<String>> {
        Ok(self.load_record(account)?.and_then(|record| record.secret))
    }

    fn set_encrypted_secret(&self, account: &Account, secret: &str) -> Result<()> {
        self.update_record(account, |record| {
            record.secret = Some(secret.to_string());
        })
    }

    fn add_account(
        &self,
        account: &Account,
        encrypted_secret: &str,
        attributes: &AttributeMap,
    ) -> Result<bool> {
        let mut names = self.load_index(&account.account_type)?;
        if names.contains(&account.name) {
            return Ok(false);
        }

        self.save_record(
            account,
            StoredRecord {
                secret: Some(encrypted_secret.to_string()),
                attributes: attributes.clone(),
                version: RECORD_VERSION,
            },
        )?;

        names.push(account.name.clone());
        self.save_index(&account.account_type, &names)?;
        debug!(account = %account, "Added account to keyring");
        Ok(true)
    }

    async fn remove_account(&self, account: &Account) -> Result<bool> {
        let user = record_user(account);
        let entry = self.entry(&user)?;
        let existed = match entry.delete_credential() {
            Ok(()) => true,
            Err(keyring::Error::NoEntry) => false, // Already deleted
            Err(e) => return Err(CredentialError::Store(e.to_string())),
        };

        // Clear cache immediately
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(user, None);
        }

        let mut names = self.load_index(&account.account_type)?;
        let before = names.len();
        names.retain(|name| name != &account.name);
        if names.len() != before {
            self.save_index(&account.account_type, &names)?;
        }

        Ok(existed || names.len() != before)
    }
}
