use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use accmgr::auth::{LoginFlow, LoginOptions, RefreshRequest, TokenBundle, TokenRefreshService};
use accmgr::core::{Encryptor, RefreshTokenPolicy};
use accmgr::store::{AccountStore, MemoryAccountStore};
use accmgr::{
    AccountCredentials, ClientContext, ClientManager, ClientSettings, CredentialError,
    RefreshFailure, Result,
};

const ACCOUNT_TYPE: &str = "com.example.integration";

/// Reverses the plaintext so stored values never equal the tokens
struct ReversingEncryptor;

impl Encryptor for ReversingEncryptor {
    fn encrypt(&self, plaintext: &str, _key: &SecretString) -> Result<String> {
        Ok(plaintext.chars().rev().collect())
    }

    fn decrypt(&self, ciphertext: &str, _key: &SecretString) -> Result<String> {
        Ok(ciphertext.chars().rev().collect())
    }
}

/// Hands out numbered access tokens after a short delay
struct CountingRefresh {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingRefresh {
    fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl TokenRefreshService for CountingRefresh {
    async fn request_token_refresh(&self, request: &RefreshRequest) -> Result<TokenBundle> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if request.refresh_token.expose_secret() == "revoked" {
            return Err(RefreshFailure::Provider("invalid_grant".into()).into());
        }
        Ok(TokenBundle::access_only(format!("access-{}", call + 1)))
    }
}

/// Login flow returning scripted answers in order
struct ScriptedLogin {
    answers: Mutex<Vec<Result<AccountCredentials>>>,
    calls: AtomicUsize,
}

impl ScriptedLogin {
    fn new(answers: Vec<Result<AccountCredentials>>) -> Self {
        Self {
            answers: Mutex::new(answers),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LoginFlow for ScriptedLogin {
    async fn login(&self, _options: &LoginOptions) -> Result<AccountCredentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            return Err(CredentialError::LoginCancelled);
        }
        answers.remove(0)
    }
}

fn credentials(username: &str, refresh_token: &str) -> AccountCredentials {
    AccountCredentials {
        username: username.to_string(),
        refresh_token: SecretString::from(refresh_token.to_string()),
        access_token: SecretString::from("access-1"),
        instance_url: "https://na1.example.com".to_string(),
        login_url: "https://login.example.com".to_string(),
        client_id: "client-1".to_string(),
        org_id: "00Dx".to_string(),
        user_id: "005x".to_string(),
    }
}

struct Harness {
    store: Arc<MemoryAccountStore>,
    refresh: Arc<CountingRefresh>,
    login: Arc<ScriptedLogin>,
    manager: ClientManager,
}

fn harness(settings: ClientSettings, logins: Vec<Result<AccountCredentials>>) -> Harness {
    let store = Arc::new(MemoryAccountStore::new());
    let refresh = Arc::new(CountingRefresh::new(Duration::from_millis(50)));
    let login = Arc::new(ScriptedLogin::new(logins));
    let ctx = ClientContext::new(
        store.clone(),
        Arc::new(ReversingEncryptor),
        refresh.clone(),
        settings,
    );
    let manager = ClientManager::new(ctx, login.clone());
    Harness {
        store,
        refresh,
        login,
        manager,
    }
}

fn settings() -> ClientSettings {
    ClientSettings::new(ACCOUNT_TYPE).with_passcode(SecretString::from("hash"))
}

#[test]
fn test_peek_with_no_accounts_never_logs_in() {
    let h = harness(settings(), vec![Ok(credentials("alice", "R1"))]);

    assert!(matches!(
        h.manager.peek_client(),
        Err(CredentialError::NoAccount)
    ));
    assert_eq!(h.login.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_first_ensure_logs_in_then_reuses_account() {
    let h = harness(settings(), vec![Ok(credentials("alice", "R1"))]);

    let first = h.manager.ensure_client().await.expect("login provisions");
    assert_eq!(first.username(), "alice");
    assert_eq!(first.access_token().unwrap().expose_secret(), "access-1");
    assert_eq!(h.login.calls.load(Ordering::SeqCst), 1);

    // Stored values are encrypted
    let alice = h.manager.resolver().active_account().unwrap().unwrap();
    assert_eq!(
        h.store.get_encrypted_secret(&alice).unwrap().as_deref(),
        Some("1R")
    );

    // A usable stored token is reused without another round trip
    let second = h.manager.ensure_client().await.expect("existing account");
    assert_eq!(second.access_token().unwrap().expose_secret(), "access-1");
    assert_eq!(h.login.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.refresh.calls.load(Ordering::SeqCst), 0);

    let peeked = h.manager.peek_client().unwrap();
    assert_eq!(peeked.access_token().unwrap().expose_secret(), "access-1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ensure_fetches_token_when_none_is_stored() {
    let h = harness(settings(), vec![]);
    let mut stored = credentials("alice", "R1");
    stored.access_token = SecretString::from("");
    h.manager.provisioner().create_or_update(&stored).unwrap();
    assert!(matches!(
        h.manager.peek_client(),
        Err(CredentialError::MissingField("accessToken"))
    ));

    let descriptor = h.manager.ensure_client().await.expect("token fetched");
    assert_eq!(descriptor.access_token().unwrap().expose_secret(), "access-2");
    assert_eq!(h.refresh.calls.load(Ordering::SeqCst), 1);

    let peeked = h.manager.peek_client().unwrap();
    assert_eq!(peeked.access_token().unwrap().expose_secret(), "access-2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ensure_without_refresh_token_reuses_stored_access_token() {
    let h = harness(settings(), vec![]);
    h.manager
        .provisioner()
        .create_or_update(&credentials("alice", ""))
        .unwrap();

    let descriptor = h.manager.ensure_client().await.expect("lazy policy");
    assert_eq!(descriptor.access_token().unwrap().expose_secret(), "access-1");
    assert_eq!(h.refresh.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_login_yields_none() {
    let h = harness(settings(), vec![Err(CredentialError::LoginCancelled)]);

    assert!(h.manager.ensure_client().await.is_none());
    assert!(h.manager.resolver().list_all().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_revoked_refresh_token_yields_none() {
    let h = harness(settings(), vec![]);
    let mut stored = credentials("alice", "revoked");
    stored.access_token = SecretString::from("");
    h.manager.provisioner().create_or_update(&stored).unwrap();

    assert!(h.manager.ensure_client().await.is_none());
    assert_eq!(h.login.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.refresh.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_create_or_update_twice_keeps_one_account() {
    let h = harness(settings(), vec![]);
    let provisioner = h.manager.provisioner();

    provisioner
        .create_or_update(&credentials("alice", "R1"))
        .unwrap();
    provisioner
        .create_or_update(&credentials("alice", "R2"))
        .unwrap();

    let accounts = h.manager.resolver().list_all().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(
        h.store.get_encrypted_secret(&accounts[0]).unwrap().as_deref(),
        Some("2R")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remove_all_is_best_effort() {
    let h = harness(settings(), vec![]);
    for name in ["a", "b", "c"] {
        h.manager
            .provisioner()
            .create_or_update(&credentials(name, "R1"))
            .unwrap();
    }
    h.store.fail_removal_of("b");

    let accounts = h.manager.resolver().list_all().unwrap();
    let report = h.manager.provisioner().remove_all(&accounts).await;

    assert_eq!(report.removed, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(report.failed.len(), 1);
    let remaining: Vec<_> = h
        .manager
        .resolver()
        .list_all()
        .unwrap()
        .into_iter()
        .map(|account| account.name)
        .collect();
    assert_eq!(remaining, vec!["b".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refreshes_share_one_call() {
    let h = harness(settings(), vec![]);
    h.manager
        .provisioner()
        .create_or_update(&credentials("alice", "R1"))
        .unwrap();
    let descriptor = Arc::new(h.manager.peek_client().unwrap());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let descriptor = descriptor.clone();
            tokio::spawn(async move { descriptor.refresh_access_token().await })
        })
        .collect();

    for task in tasks {
        let token = task.await.unwrap().unwrap();
        assert_eq!(token.expose_secret(), "access-2");
    }
    assert_eq!(h.refresh.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refreshes_share_one_failure() {
    let h = harness(settings(), vec![]);
    h.manager
        .provisioner()
        .create_or_update(&credentials("alice", "revoked"))
        .unwrap();
    let descriptor = Arc::new(h.manager.peek_client().unwrap());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let descriptor = descriptor.clone();
            tokio::spawn(async move { descriptor.refresh_access_token().await })
        })
        .collect();

    for task in tasks {
        assert_eq!(
            task.await.unwrap().unwrap_err(),
            RefreshFailure::Provider("invalid_grant".into())
        );
    }
    assert_eq!(h.refresh.calls.load(Ordering::SeqCst), 1);
    assert!(descriptor.access_token().is_none());
}

#[test]
fn test_eager_policy_requires_refresh_token() {
    let h = harness(settings().with_policy(RefreshTokenPolicy::Eager), vec![]);
    h.manager
        .provisioner()
        .create_or_update(&credentials("alice", ""))
        .unwrap();

    assert!(matches!(
        h.manager.peek_client(),
        Err(CredentialError::MissingField("refreshToken"))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ensure_client_with_calls_back() {
    let h = harness(settings(), vec![Ok(credentials("alice", "R1"))]);
    let (tx, rx) = tokio::sync::oneshot::channel();

    h.manager
        .ensure_client_with(move |descriptor| {
            let _ = tx.send(descriptor.map(|d| d.username().to_string()));
        })
        .await
        .unwrap();

    assert_eq!(rx.await.unwrap().as_deref(), Some("alice"));
}
