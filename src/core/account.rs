//! Account identity and the attribute keys stored alongside it

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Encrypted access token
pub const KEY_ACCESS_TOKEN: &str = "accessToken";
/// Name reported when the encrypted refresh token (the account secret) is absent
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";
/// Instance server URL the REST calls go to
pub const KEY_INSTANCE_SERVER: &str = "instanceServer";
/// Login server URL the token endpoint lives on
pub const KEY_LOGIN_SERVER: &str = "loginServer";
pub const KEY_CLIENT_ID: &str = "clientId";
pub const KEY_ORG_ID: &str = "orgId";
pub const KEY_USER_ID: &str = "userId";
pub const KEY_USERNAME: &str = "username";
pub const KEY_ACCOUNT_NAME: &str = "accountName";
pub const KEY_ACCOUNT_TYPE: &str = "accountType";

/// Attribute set written for an account
pub type AttributeMap = BTreeMap<String, String>;

/// Identity of a stored account
///
/// The name is unique within an account type; the type namespaces this
/// application's accounts from any others sharing the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    pub name: String,
    pub account_type: String,
}

impl Account {
    pub fn new(name: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_type: account_type.into(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.account_type)
    }
}

/// Everything produced by a completed authorization, ready to be stored
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub username: String,
    pub refresh_token: SecretString,
    pub access_token: SecretString,
    pub instance_url: String,
    pub login_url: String,
    pub client_id: String,
    pub org_id: String,
    pub user_id: String,
}

/// Get a masked version of a token for display (shows first 4 and last 4 chars)
pub fn mask_token(token: &SecretString) -> String {
    let exposed = token.expose_secret();
    let chars: Vec<char> = exposed.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
