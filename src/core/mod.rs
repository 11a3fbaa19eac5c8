//! Core functionality for accmgr
//!
//! This module contains the credential management logic:
//! - Account identity and stored attribute keys
//! - Credential resolution into ready-to-use clients
//! - Account provisioning and removal
//! - Single-flight token refresh
//! - The `ClientManager` facade used by application code
//! - Application configuration

pub mod account;
pub mod client_manager;
pub mod config;
pub mod descriptor;
pub mod encryptor;
pub mod provisioner;
pub mod refresher;
pub mod resolver;

use std::sync::Arc;

use crate::auth::TokenRefreshService;
use crate::store::AccountStore;

pub use account::{Account, AccountCredentials, AttributeMap};
pub use client_manager::ClientManager;
pub use config::{ClientSettings, Config, RefreshTokenPolicy};
pub use descriptor::ClientDescriptor;
pub use encryptor::{Encryptor, PassthroughEncryptor};
pub use provisioner::{AccountProvisioner, RemovalReport};
pub use refresher::{RefreshOutcome, TokenRefresher};
pub use resolver::CredentialResolver;

/// Collaborators shared by the resolver, provisioner and every refresher
#[derive(Clone)]
pub struct ClientContext {
    pub store: Arc<dyn AccountStore>,
    pub encryptor: Arc<dyn Encryptor>,
    pub refresh_service: Arc<dyn TokenRefreshService>,
    pub settings: Arc<ClientSettings>,
}

impl ClientContext {
    pub fn new(
        store: Arc<dyn AccountStore>,
        encryptor: Arc<dyn Encryptor>,
        refresh_service: Arc<dyn TokenRefreshService>,
        settings: ClientSettings,
    ) -> Self {
        Self {
            store,
            encryptor,
            refresh_service,
            settings: Arc::new(settings),
        }
    }

    pub fn account_type(&self) -> &str {
        &self.settings.account_type
    }
}
