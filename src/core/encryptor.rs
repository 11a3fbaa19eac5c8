//! Encryption of tokens before they reach the account store

use secrecy::SecretString;

use crate::error::Result;

/// Symmetric encryption keyed by the application passcode hash
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str, key: &SecretString) -> Result<String>;

    fn decrypt(&self, ciphertext: &str, key: &SecretString) -> Result<String>;
}

/// Stores tokens as-is
///
/// For stores that already encrypt at rest, such as the OS keyring.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEncryptor;

impl Encryptor for PassthroughEncryptor {
    fn encrypt(&self, plaintext: &str, _key: &SecretString) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str, _key: &SecretString) -> Result<String> {
        Ok(ciphertext.to_string())
    }
}
