//! CLI module for accmgr
//!
//! This module contains all CLI command definitions and handlers using clap.

pub mod accounts;
pub mod client;
pub mod commands;
pub mod config;
pub mod login;

use std::sync::Arc;

use crate::auth::OAuthTokenEndpoint;
use crate::core::{ClientContext, ClientManager, ClientSettings, Config, PassthroughEncryptor};
use crate::store::KeyringAccountStore;

pub use commands::{Cli, Commands};
pub use login::StdinLoginFlow;

/// Wire the production collaborators for the configured account type
///
/// Tokens go to the OS keyring, which already encrypts at rest.
pub fn build_manager(config: &Config) -> ClientManager {
    let settings = ClientSettings::from_config(config);
    let refresh_service =
        OAuthTokenEndpoint::new().with_default_login_server(config.default_login_server.clone());
    let ctx = ClientContext::new(
        Arc::new(KeyringAccountStore::new(config.keyring_service.clone())),
        Arc::new(PassthroughEncryptor),
        Arc::new(refresh_service),
        settings,
    );
    ClientManager::new(ctx, Arc::new(StdinLoginFlow::new()))
}
