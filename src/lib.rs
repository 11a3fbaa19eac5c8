//! accmgr - OAuth account manager
//!
//! Turns OAuth credentials held in a secure account store into ready-to-use
//! REST client descriptors, provisions and removes accounts, and refreshes
//! expired access tokens with at most one refresh in flight per client.
//!
//! Application code goes through [`ClientManager`]: `peek_client` for
//! non-interactive callers, `ensure_client` when signing in is acceptable.

pub mod auth;
pub mod cli;
pub mod core;
pub mod error;
pub mod rest;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::core::{
    Account, AccountCredentials, AccountProvisioner, ClientContext, ClientDescriptor,
    ClientManager, ClientSettings, CredentialResolver, RefreshOutcome, RemovalReport,
    TokenRefresher,
};
pub use error::{CredentialError, RefreshFailure, Result};
pub use rest::RestClient;
