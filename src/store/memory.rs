//! In-process account store
//!
//! Keeps accounts in insertion order so "first account found" is stable.
//! Removal failures can be injected per account name, attribute write
//! failures per key.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::core::account::{Account, AttributeMap};
use crate::error::{CredentialError, Result};
use crate::store::AccountStore;

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    secret: Option<String>,
    attributes: AttributeMap,
}

/// Account store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Vec<StoredAccount>>,
    failing_removals: RwLock<HashSet<String>>,
    failing_writes: RwLock<HashSet<String>>,
    invalidated: RwLock<Vec<String>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every removal of the named account fail with a store error
    pub fn fail_removal_of(&self, name: &str) {
        if let Ok(mut failing) = self.failing_removals.write() {
            failing.insert(name.to_string());
        }
    }

    /// Make every `set_attribute` for the given key fail with a store error
    pub fn fail_writes_of(&self, key: &str) {
        if let Ok(mut failing) = self.failing_writes.write() {
            failing.insert(key.to_string());
        }
    }

    /// Delete a single attribute, as if it had never been written
    pub fn clear_attribute(&self, account: &Account, key: &str) -> Result<()> {
        let mut accounts = self.write()?;
        let stored = find_mut(&mut accounts, account)?;
        stored.attributes.remove(key);
        Ok(())
    }

    /// Delete the encrypted secret
    pub fn clear_secret(&self, account: &Account) -> Result<()> {
        let mut accounts = self.write()?;
        find_mut(&mut accounts, account)?.secret = None;
        Ok(())
    }

    /// Access tokens passed to `invalidate_auth_token`, oldest first
    pub fn invalidated_tokens(&self) -> Vec<String> {
        self.invalidated
            .read()
            .map(|tokens| tokens.clone())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<StoredAccount>>> {
        self.accounts
            .read()
            .map_err(|_| CredentialError::Store("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<StoredAccount>>> {
        self.accounts
            .write()
            .map_err(|_| CredentialError::Store("memory store lock poisoned".into()))
    }
}

fn find_mut<'a>(
    accounts: &'a mut [StoredAccount],
    account: &Account,
) -> Result<&'a mut StoredAccount> {
    accounts
        .iter_mut()
        .find(|stored| stored.account == *account)
        .ok_or_else(|| CredentialError::Store(format!("account {} not found", account)))
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    fn list_accounts(&self, account_type: &str) -> Result<Vec<Account>> {
        Ok(self
            .read()?
            .iter()
            .filter(|stored| stored.account.account_type == account_type)
            .map(|stored| stored.account.clone())
            .collect())
    }

    fn get_attribute(&self, account: &Account, key: &str) -> Result<Option<String>> {
        Ok(self
            .read()?
            .iter()
            .find(|stored| stored.account == *account)
            .and_then(|stored| stored.attributes.get(key).cloned()))
    }

    fn set_attribute(&self, account: &Account, key: &str, value: &str) -> Result<()> {
        let failing = self
            .failing_writes
            .read()
            .map(|failing| failing.contains(key))
            .unwrap_or(false);
        if failing {
            return Err(CredentialError::Store(format!("write of {} was rejected", key)));
        }

        let mut accounts = self.write()?;
        find_mut(&mut accounts, account)?
            .attributes
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_encrypted_secret(&self, account: &Account) -> Result<Option<String>> {
        Ok(self
            .read()?
            .iter()
            .find(|stored| stored.account == *account)
            .and_then(|stored| stored.secret.clone()))
    }

    fn set_encrypted_secret(&self, account: &Account, secret: &str) -> Result<()> {
        let mut accounts = self.write()?;
        find_mut(&mut accounts, account)?.secret = Some(secret.to_string());
        Ok(())
    }

    fn add_account(
        &self,
        account: &Account,
        encrypted_secret: &str,
        attributes: &AttributeMap,
    ) -> Result<bool> {
        let mut accounts = self.write()?;
        if accounts.iter().any(|stored| stored.account == *account) {
            return Ok(false);
        }
        accounts.push(StoredAccount {
            account: account.clone(),
            secret: Some(encrypted_secret.to_string()),
            attributes: attributes.clone(),
        });
        Ok(true)
    }

    async fn remove_account(&self, account: &Account) -> Result<bool> {
        let failing = self
            .failing_removals
            .read()
            .map(|failing| failing.contains(&account.name))
            .unwrap_or(false);
        if failing {
            return Err(CredentialError::Store(format!(
                "removal of {} was rejected",
                account.name
            )));
        }

        let mut accounts = self.write()?;
        let before = accounts.len();
        accounts.retain(|stored| stored.account != *account);
        Ok(accounts.len() < before)
    }

    fn invalidate_auth_token(&self, _account_type: &str, token: &str) {
        if let Ok(mut invalidated) = self.invalidated.write() {
            invalidated.push(token.to_string());
        }
    }
}
