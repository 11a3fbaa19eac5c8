//! Shared fixtures for unit tests

use std::sync::Arc;

use secrecy::SecretString;

use crate::auth::TokenRefreshService;
use crate::core::account::{
    Account, AttributeMap, KEY_ACCESS_TOKEN, KEY_CLIENT_ID, KEY_INSTANCE_SERVER, KEY_LOGIN_SERVER,
    KEY_ORG_ID, KEY_USERNAME, KEY_USER_ID,
};
use crate::core::{ClientContext, ClientSettings, Encryptor};
use crate::error::{CredentialError, Result};
use crate::store::{AccountStore, MemoryAccountStore};

pub const ACCOUNT_TYPE: &str = "accmgr.test";

/// Marks ciphertext with a prefix so tests can tell it apart from plaintext
pub struct PrefixEncryptor;

impl Encryptor for PrefixEncryptor {
    fn encrypt(&self, plaintext: &str, _key: &SecretString) -> Result<String> {
        Ok(format!("enc:{}", plaintext))
    }

    fn decrypt(&self, ciphertext: &str, _key: &SecretString) -> Result<String> {
        ciphertext
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| CredentialError::Encryption("not produced by PrefixEncryptor".into()))
    }
}

pub fn alice() -> Account {
    Account::new("alice", ACCOUNT_TYPE)
}

/// Store holding a complete "alice" account with tokens T1 / R1
pub fn seeded_store() -> Arc<MemoryAccountStore> {
    let store = MemoryAccountStore::new();
    let attributes: AttributeMap = [
        (KEY_ACCESS_TOKEN, "enc:T1"),
        (KEY_INSTANCE_SERVER, "https://na1.example.com"),
        (KEY_LOGIN_SERVER, "https://login.example.com"),
        (KEY_CLIENT_ID, "client-1"),
        (KEY_USER_ID, "005x"),
        (KEY_ORG_ID, "00Dx"),
        (KEY_USERNAME, "alice@example.com"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let _ = store.add_account(&alice(), "enc:R1", &attributes);
    Arc::new(store)
}

pub fn context(
    store: Arc<MemoryAccountStore>,
    refresh_service: Arc<dyn TokenRefreshService>,
) -> ClientContext {
    ClientContext::new(
        store,
        Arc::new(PrefixEncryptor),
        refresh_service,
        ClientSettings::new(ACCOUNT_TYPE).with_passcode(SecretString::from("passcode")),
    )
}
