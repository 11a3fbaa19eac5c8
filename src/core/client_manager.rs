//! Get-or-create entry points for application code
//!
//! [`ClientManager::peek_client`] is the synchronous, non-interactive path: it
//! only ever reads what is stored. [`ClientManager::ensure_client`] may run
//! the interactive login when no account exists and reports every failure as
//! `None`, logging the cause.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{LoginFlow, LoginOptions};
use crate::core::descriptor::ClientDescriptor;
use crate::core::provisioner::AccountProvisioner;
use crate::core::resolver::CredentialResolver;
use crate::core::ClientContext;
use crate::error::{CredentialError, Result};

/// Facade over resolution, provisioning and login
#[derive(Clone)]
pub struct ClientManager {
    ctx: ClientContext,
    resolver: CredentialResolver,
    provisioner: AccountProvisioner,
    login: Arc<dyn LoginFlow>,
}

impl ClientManager {
    pub fn new(ctx: ClientContext, login: Arc<dyn LoginFlow>) -> Self {
        Self {
            resolver: CredentialResolver::new(ctx.clone()),
            provisioner: AccountProvisioner::new(ctx.clone()),
            ctx,
            login,
        }
    }

    /// Client for the active account without any user interaction
    ///
    /// Fails with `NoAccount` when nothing is stored; never starts a login.
    pub fn peek_client(&self) -> Result<ClientDescriptor> {
        if self.resolver.active_account()?.is_none() {
            return Err(CredentialError::NoAccount);
        }
        self.resolver.resolve_active()
    }

    /// Client for the active account, signing in first if there is none
    ///
    /// Any failure (cancelled login, failed refresh, incomplete account) is
    /// logged and reported as `None`.
    pub async fn ensure_client(&self) -> Option<ClientDescriptor> {
        match self.try_ensure_client().await {
            Ok(descriptor) => Some(descriptor),
            Err(CredentialError::LoginCancelled) => {
                info!("Login cancelled, no client available");
                None
            }
            Err(e) => {
                warn!("Could not provide a client: {}", e);
                None
            }
        }
    }

    /// Run [`ensure_client`](Self::ensure_client) in the background and hand
    /// the result to `on_ready`
    pub fn ensure_client_with<F>(&self, on_ready: F) -> JoinHandle<()>
    where
        F: FnOnce(Option<ClientDescriptor>) + Send + 'static,
    {
        let manager = self.clone();
        tokio::spawn(async move {
            let descriptor = manager.ensure_client().await;
            on_ready(descriptor);
        })
    }

    /// Same flow as [`ensure_client`](Self::ensure_client) with the cause of
    /// failure kept
    ///
    /// For an existing account the stored tokens are checked first: when no
    /// usable access token is stored, one is obtained with the stored refresh
    /// token before the remaining attributes are resolved. A usable stored
    /// token is returned as-is, without a network call.
    pub async fn try_ensure_client(&self) -> Result<ClientDescriptor> {
        match self.resolver.active_account()? {
            Some(account) => {
                let refresher = self.resolver.refresher_for(&account)?;
                if refresher.current_token().is_none() {
                    info!(account = %account, "No usable access token stored, refreshing");
                    refresher.refresh().await?;
                } else {
                    debug!(account = %account, "Using stored access token");
                }
                // Keeps the refreshed token even if persisting it failed
                self.resolver.resolve_with(refresher)
            }
            None => {
                info!("No account found, starting login");
                let options = LoginOptions {
                    account_type: self.ctx.account_type().to_string(),
                    login_server: self.ctx.settings.login_server.clone(),
                };
                let credentials = self.login.login(&options).await?;
                self.provisioner.create_or_update(&credentials)?;
                self.resolver.resolve_active()
            }
        }
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    pub fn provisioner(&self) -> &AccountProvisioner {
        &self.provisioner
    }

    pub fn context(&self) -> &ClientContext {
        &self.ctx
    }
}
