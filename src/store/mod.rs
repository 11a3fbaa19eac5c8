//! Account storage backends
//!
//! The core only talks to an [`AccountStore`]: a key-value capability keyed
//! by account, holding named string attributes plus one encrypted secret
//! (the refresh token). Implementations:
//! - [`KeyringAccountStore`] - the OS credential store (Keychain, Secret Service)
//! - [`MemoryAccountStore`] - in-process store for tests and embedding
//!
//! Stores are expected to be safe to share between threads.

pub mod keyring_store;
pub mod memory;

use async_trait::async_trait;

use crate::core::account::{Account, AttributeMap};
use crate::error::Result;

pub use keyring_store::KeyringAccountStore;
pub use memory::MemoryAccountStore;

/// Persistent account storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// All accounts of the given type, in store order
    fn list_accounts(&self, account_type: &str) -> Result<Vec<Account>>;

    fn get_attribute(&self, account: &Account, key: &str) -> Result<Option<String>>;

    fn set_attribute(&self, account: &Account, key: &str, value: &str) -> Result<()>;

    /// The account's encrypted secret (the refresh token)
    fn get_encrypted_secret(&self, account: &Account) -> Result<Option<String>>;

    fn set_encrypted_secret(&self, account: &Account, secret: &str) -> Result<()>;

    /// Create an account; returns false when the store declines (e.g. name taken)
    fn add_account(
        &self,
        account: &Account,
        encrypted_secret: &str,
        attributes: &AttributeMap,
    ) -> Result<bool>;

    /// Remove an account; returns false when the store declines
    async fn remove_account(&self, account: &Account) -> Result<bool>;

    /// Drop any cached copy of an access token that is about to be replaced
    fn invalidate_auth_token(&self, _account_type: &str, _token: &str) {}
}
