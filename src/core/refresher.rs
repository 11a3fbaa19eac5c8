//! Single-flight access token refresh
//!
//! When several requests discover an expired token at the same time, only one
//! of them may talk to the identity provider: refresh tokens are often
//! single-use or rate limited, so parallel refreshes would invalidate each
//! other. Every caller of [`TokenRefresher::refresh`] either starts a refresh
//! flight or joins the one already running, and all callers of a flight get
//! back the exact same outcome.
//!
//! One refresher exists per resolved client, so accounts never contend on a
//! shared lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::{RefreshRequest, TokenBundle};
use crate::core::account::{
    Account, KEY_ACCESS_TOKEN, KEY_CLIENT_ID, KEY_INSTANCE_SERVER, KEY_LOGIN_SERVER,
};
use crate::core::ClientContext;
use crate::error::{CredentialError, RefreshFailure};

/// Outcome shared by every caller of one refresh flight
pub type RefreshOutcome = std::result::Result<SecretString, RefreshFailure>;

type Flight = watch::Receiver<Option<RefreshOutcome>>;

struct RefreshState {
    /// Set while a refresh is running; joiners wait on it
    in_flight: Option<Flight>,
    last_token: Option<SecretString>,
    last_refresh: Option<DateTime<Utc>>,
    refresh_token: Option<SecretString>,
}

struct RefresherInner {
    account: Account,
    ctx: ClientContext,
    state: Mutex<RefreshState>,
}

/// Per-client coordinator for access token refreshes
///
/// Cloning shares the same coordinator.
#[derive(Clone)]
pub struct TokenRefresher {
    inner: Arc<RefresherInner>,
}

impl TokenRefresher {
    /// Create a refresher seeded with the tokens read from the store
    pub fn new(
        account: Account,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
        ctx: ClientContext,
    ) -> Self {
        Self::with_tokens(account, Some(access_token), refresh_token, ctx)
    }

    /// Create a refresher that may start without a usable access token
    ///
    /// The first [`refresh`](Self::refresh) then has no stale token to
    /// invalidate.
    pub fn with_tokens(
        account: Account,
        access_token: Option<SecretString>,
        refresh_token: Option<SecretString>,
        ctx: ClientContext,
    ) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                account,
                ctx,
                state: Mutex::new(RefreshState {
                    in_flight: None,
                    last_token: access_token,
                    last_refresh: None,
                    refresh_token,
                }),
            }),
        }
    }

    /// Fetch a new access token, or wait for the refresh already in progress
    ///
    /// Never retries; a failed outcome is returned to every waiter of the
    /// flight and the next call starts a fresh one.
    pub async fn refresh(&self) -> RefreshOutcome {
        info!(account = %self.inner.account, "Need new access token");

        let mut flight = self.join_or_start();
        let outcome = match flight.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        outcome.unwrap_or(Err(RefreshFailure::Interrupted))
    }

    /// The access token currently considered valid
    ///
    /// `None` while a refresh is in flight and after a failed refresh.
    pub fn current_token(&self) -> Option<SecretString> {
        self.inner.lock_state().last_token.clone()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.inner
            .lock_state()
            .refresh_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().is_empty())
    }

    /// When the last refresh flight completed (successfully or not)
    pub fn last_refresh_time(&self) -> Option<DateTime<Utc>> {
        self.inner.lock_state().last_refresh
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_state().in_flight.is_some()
    }

    pub fn account(&self) -> &Account {
        &self.inner.account
    }

    fn join_or_start(&self) -> Flight {
        let mut state = self.inner.lock_state();

        if let Some(flight) = state.in_flight.as_ref() {
            // A closed sender means the refresh task died without committing
            if flight.has_changed().is_ok() {
                debug!(account = %self.inner.account, "Refresh in progress, waiting for it");
                return flight.clone();
            }
        }

        let (sender, flight) = watch::channel(None);
        state.in_flight = Some(flight.clone());
        // The stale token must never be handed out again once a refresh starts
        let stale = state.last_token.take();
        drop(state);

        // Detached so the refresh completes even if every caller goes away
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.perform_refresh(stale).await;
            inner.commit(outcome, sender);
        });

        flight
    }
}

impl RefresherInner {
    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn perform_refresh(&self, stale: Option<SecretString>) -> RefreshOutcome {
        if let Some(stale) = stale {
            self.ctx
                .store
                .invalidate_auth_token(&self.account.account_type, stale.expose_secret());
        }

        let timeout = self.ctx.settings.refresh_timeout;
        match tokio::time::timeout(timeout, self.request_new_token()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(account = %self.account, "Token refresh timed out after {:?}", timeout);
                Err(RefreshFailure::TimedOut(timeout))
            }
        }
    }

    async fn request_new_token(&self) -> RefreshOutcome {
        let store = &self.ctx.store;
        let store_failure = |e: CredentialError| RefreshFailure::Store(e.to_string());

        let account = store
            .list_accounts(&self.account.account_type)
            .map_err(store_failure)?
            .into_iter()
            .find(|account| account.name == self.account.name)
            .ok_or(RefreshFailure::AccountRemoved)?;

        let refresh_token = self
            .lock_state()
            .refresh_token
            .clone()
            .filter(|token| !token.expose_secret().is_empty())
            .ok_or(RefreshFailure::MissingRefreshToken)?;

        let request = RefreshRequest {
            login_server: store
                .get_attribute(&account, KEY_LOGIN_SERVER)
                .map_err(store_failure)?,
            client_id: store
                .get_attribute(&account, KEY_CLIENT_ID)
                .map_err(store_failure)?,
            account,
            refresh_token,
        };

        let bundle = self
            .ctx
            .refresh_service
            .request_token_refresh(&request)
            .await
            .map_err(|e| {
                warn!(account = %self.account, "Exception during token refresh: {}", e);
                match e {
                    CredentialError::Refresh(failure) => failure,
                    other => RefreshFailure::Provider(other.to_string()),
                }
            })?;

        self.persist(&request.account, &bundle);
        Ok(bundle.access_token)
    }

    /// Write the rotated tokens back to the account
    ///
    /// The refresh itself already succeeded, so store failures only warn.
    fn persist(&self, account: &Account, bundle: &TokenBundle) {
        let ctx = &self.ctx;
        let key = &ctx.settings.passcode_hash;

        let access = ctx
            .encryptor
            .encrypt(bundle.access_token.expose_secret(), key)
            .and_then(|encrypted| ctx.store.set_attribute(account, KEY_ACCESS_TOKEN, &encrypted));
        if let Err(e) = access {
            warn!(account = %account, "Could not store refreshed access token: {}", e);
        }

        if let Some(refresh_token) = &bundle.refresh_token {
            let rotated = ctx
                .encryptor
                .encrypt(refresh_token.expose_secret(), key)
                .and_then(|encrypted| ctx.store.set_encrypted_secret(account, &encrypted));
            if let Err(e) = rotated {
                warn!(account = %account, "Could not store rotated refresh token: {}", e);
            }
            self.lock_state().refresh_token = Some(refresh_token.clone());
        }

        if let Some(instance_url) = &bundle.instance_url {
            if let Err(e) = ctx.store.set_attribute(account, KEY_INSTANCE_SERVER, instance_url) {
                warn!(account = %account, "Could not store instance server: {}", e);
            }
        }
    }

    fn commit(&self, outcome: RefreshOutcome, sender: watch::Sender<Option<RefreshOutcome>>) {
        let mut state = self.lock_state();
        state.last_token = outcome.as_ref().ok().cloned();
        state.in_flight = None;
        state.last_refresh = Some(Utc::now());
        sender.send_replace(Some(outcome));
    }
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("account", &self.inner.account)
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}
