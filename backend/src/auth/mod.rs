//! Authentication: sign-in, sign-up, sign-out and session resolution.
//!
//! Sign-in succeeds only for approved accounts or for the fixed administrator
//! credential. Resolution of the current user is fail-closed: any lookup error
//! reads as "nobody is signed in".

pub mod password;

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::models::{
    normalize_email, now_timestamp, ApprovalInfo, NewUser, Session, SessionKind, User, UserRole,
    UserStatus, ADMIN_USER_ID,
};
use crate::store::Backend;

/// Identifier reserved for the fixed administrator credential.
pub const ADMIN_IDENTIFIER: &str = "admin";

/// Header carrying the session token, as an alternative to a bearer token.
pub const SESSION_HEADER: &str = "x-session-token";

/// Extract the session token from `x-session-token` or `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// The fixed administrator credential and the synthetic account it acts as.
#[derive(Debug, Clone)]
pub struct AdminCredential {
    secret: Option<String>,
    email: String,
}

impl AdminCredential {
    pub fn new(secret: Option<String>, email: impl Into<String>) -> Self {
        Self {
            secret,
            email: email.into(),
        }
    }

    fn matches(&self, secret: &str) -> bool {
        self.secret
            .as_deref()
            .is_some_and(|expected| constant_time_compare(secret, expected))
    }

    /// The administrator as a `User`. It is not stored anywhere.
    pub fn user(&self) -> User {
        let now = now_timestamp();
        User {
            id: ADMIN_USER_ID.to_string(),
            email: self.email.clone(),
            name: Some("Administrator".to_string()),
            status: UserStatus::Approved,
            role: UserRole::Admin,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
}

#[derive(Debug, Clone)]
struct AuthEvent {
    kind: AuthEventKind,
    token: String,
}

/// Delivered to `on_auth_state_change` callbacks.
#[derive(Debug, Clone)]
pub struct AuthStateChange {
    pub kind: AuthEventKind,
    pub token: String,
    pub user: Option<User>,
}

/// Handle for an auth state subscription. Dropping it stops delivery.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivery to this subscription.
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Resolved view of a request's session.
#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub user: Option<User>,
}

impl AuthSnapshot {
    pub fn is_admin_session(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_administrator)
    }
}

pub struct AuthService {
    backend: Backend,
    fallback: Option<Backend>,
    admin: AdminCredential,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    pub fn new(backend: Backend, fallback: Option<Backend>, admin: AdminCredential) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend,
            fallback,
            admin,
            events,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Sign in with the administrator credential or an approved account.
    pub async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Session, AppError> {
        if identifier.trim() == ADMIN_IDENTIFIER {
            if !self.admin.matches(secret) {
                tracing::info!("Administrator sign-in rejected");
                return Err(AppError::InvalidCredentials);
            }
            return self.establish(Session::administrator()).await;
        }

        let email = normalize_email(identifier);
        let credential = self
            .backend
            .users
            .find_credential(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !password::verify_password(secret, &credential.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        // Approval is checked before any session exists, so a refused
        // sign-in never leaves one behind.
        let approval = self.check_approval(&credential.user_id).await;
        if approval.status != UserStatus::Approved {
            tracing::info!(
                user_id = %credential.user_id,
                status = approval.status.as_str(),
                "Sign-in refused: account not approved"
            );
            return Err(AppError::NotApproved);
        }

        self.establish(Session::member(credential.user_id)).await
    }

    async fn establish(&self, session: Session) -> Result<Session, AppError> {
        self.backend.sessions.create_session(&session).await?;
        tracing::info!(actor = session.actor(), "Signed in");
        self.events
            .send(AuthEvent {
                kind: AuthEventKind::SignedIn,
                token: session.token.clone(),
            })
            .ok();
        Ok(session)
    }

    /// Register a pending account. Never signs the new account in.
    pub async fn sign_up(
        &self,
        email: &str,
        secret: &str,
        name: Option<&str>,
    ) -> Result<User, AppError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if secret.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()));
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| email.clone(), str::to_string);
        let new_user = NewUser {
            email,
            name: Some(name),
            password_hash: password::hash_password(secret)?,
        };

        match register(&self.backend, new_user.clone()).await {
            Err(AppError::BackendUnavailable(reason)) => {
                let Some(fallback) = &self.fallback else {
                    return Err(AppError::BackendUnavailable(reason));
                };
                tracing::warn!("Sign-up falling back to local store: {}", reason);
                register(fallback, new_user).await
            }
            other => other,
        }
    }

    /// End the session behind `token`. Unknown or missing tokens are a no-op.
    pub async fn sign_out(&self, token: Option<&str>) -> Result<(), AppError> {
        let Some(token) = token else {
            return Ok(());
        };

        if self.backend.sessions.revoke_session(token).await? {
            tracing::info!("Signed out");
            self.events
                .send(AuthEvent {
                    kind: AuthEventKind::SignedOut,
                    token: token.to_string(),
                })
                .ok();
        }
        Ok(())
    }

    /// Resolve the session and user behind a token, fail-closed.
    pub async fn resolve(&self, token: Option<&str>) -> AuthSnapshot {
        let Some(token) = token else {
            return AuthSnapshot::default();
        };

        let session = match self.backend.sessions.get_session(token).await {
            Ok(Some(session)) => session,
            Ok(None) => return AuthSnapshot::default(),
            Err(e) => {
                tracing::warn!("Session lookup failed, treating as signed out: {}", e);
                return AuthSnapshot::default();
            }
        };

        let user = match &session.kind {
            SessionKind::Administrator => Some(self.admin.user()),
            SessionKind::Member { user_id } => {
                match self.backend.users.find_by_id(user_id).await {
                    Ok(user) => user,
                    Err(e) => {
                        tracing::warn!(user_id = %user_id, "User lookup failed: {}", e);
                        None
                    }
                }
            }
        };

        match user {
            Some(user) => AuthSnapshot {
                session: Some(session),
                user: Some(user),
            },
            None => AuthSnapshot::default(),
        }
    }

    pub async fn get_current_user(&self, token: Option<&str>) -> Option<User> {
        self.resolve(token).await.user
    }

    /// Approval state of an account; `pending`/`user` when it cannot be determined.
    pub async fn check_approval(&self, user_id: &str) -> ApprovalInfo {
        if user_id == ADMIN_USER_ID {
            return ApprovalInfo {
                status: UserStatus::Approved,
                role: UserRole::Admin,
            };
        }

        match self.backend.users.find_by_id(user_id).await {
            Ok(Some(user)) => ApprovalInfo {
                status: user.status,
                role: user.role,
            },
            Ok(None) => ApprovalInfo::default(),
            Err(e) => {
                tracing::error!(user_id = %user_id, "Failed to check user approval: {}", e);
                ApprovalInfo::default()
            }
        }
    }

    /// Call `callback` once for every sign-in and sign-out.
    pub fn on_auth_state_change<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(AuthStateChange) + Send + Sync + 'static,
    {
        let mut events = self.events.subscribe();
        let service = Arc::clone(self);

        let handle = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Auth state subscriber lagged by {} events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let user = match event.kind {
                    AuthEventKind::SignedIn => service.get_current_user(Some(&event.token)).await,
                    AuthEventKind::SignedOut => None,
                };
                callback(AuthStateChange {
                    kind: event.kind,
                    token: event.token,
                    user,
                });
            }
        });

        Subscription { handle }
    }
}

async fn register(backend: &Backend, new_user: NewUser) -> Result<User, AppError> {
    if backend.users.find_credential(&new_user.email).await?.is_some() {
        return Err(AppError::DuplicateEmail(format!(
            "Email {} is already registered",
            new_user.email
        )));
    }

    let user = backend.users.create_user(new_user).await?;
    tracing::info!(user_id = %user.id, backend = backend.mode.as_str(), "Account created, pending approval");
    Ok(user)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::HeaderValue;

    use crate::models::{ContentItem, Credential, PageType, UpdateContentRequest};
    use crate::store::{ContentStore, LocalStore, SessionStore, UserStore};

    pub const ADMIN_SECRET: &str = "club-admin-secret";

    pub fn local_service() -> AuthService {
        let backend = Backend::local(Arc::new(LocalStore::in_memory()));
        AuthService::new(
            backend,
            None,
            AdminCredential::new(Some(ADMIN_SECRET.to_string()), "admin@ventureclub.local"),
        )
    }

    /// Store whose every call fails as if the backend were offline.
    pub struct OfflineStore;

    fn offline<T>() -> Result<T, AppError> {
        Err(AppError::BackendUnavailable("offline".to_string()))
    }

    #[async_trait]
    impl UserStore for OfflineStore {
        async fn find_by_id(&self, _: &str) -> Result<Option<User>, AppError> {
            offline()
        }
        async fn find_by_email(&self, _: &str) -> Result<Option<User>, AppError> {
            offline()
        }
        async fn find_credential(&self, _: &str) -> Result<Option<Credential>, AppError> {
            offline()
        }
        async fn create_user(&self, _: NewUser) -> Result<User, AppError> {
            offline()
        }
        async fn list_users(&self) -> Result<Vec<User>, AppError> {
            offline()
        }
        async fn set_status(&self, _: &str, _: UserStatus) -> Result<(), AppError> {
            offline()
        }
        async fn delete_user(&self, _: &str) -> Result<(), AppError> {
            offline()
        }
    }

    #[async_trait]
    impl ContentStore for OfflineStore {
        async fn list_content(&self, _: PageType) -> Result<Vec<ContentItem>, AppError> {
            offline()
        }
        async fn get_content(&self, _: &str) -> Result<Option<ContentItem>, AppError> {
            offline()
        }
        async fn insert_content(&self, _: &ContentItem) -> Result<(), AppError> {
            offline()
        }
        async fn update_content(
            &self,
            _: &str,
            _: &UpdateContentRequest,
        ) -> Result<ContentItem, AppError> {
            offline()
        }
        async fn delete_content(&self, _: &str) -> Result<(), AppError> {
            offline()
        }
    }

    #[async_trait]
    impl SessionStore for OfflineStore {
        async fn create_session(&self, _: &Session) -> Result<(), AppError> {
            offline()
        }
        async fn get_session(&self, _: &str) -> Result<Option<Session>, AppError> {
            offline()
        }
        async fn revoke_session(&self, _: &str) -> Result<bool, AppError> {
            offline()
        }
    }

    fn offline_backend() -> Backend {
        let store = Arc::new(OfflineStore);
        Backend {
            mode: crate::store::BackendMode::Hosted,
            users: store.clone(),
            content: store.clone(),
            sessions: store,
        }
    }

    async fn approve(service: &AuthService, email: &str) {
        let user = service
            .backend()
            .users
            .find_by_email(email)
            .await
            .unwrap()
            .unwrap();
        service
            .backend()
            .users
            .set_status(&user.id, UserStatus::Approved)
            .await
            .unwrap();
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
        assert!(!constant_time_compare("short", "much-longer-key"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_session_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));

        headers.insert(SESSION_HEADER, HeaderValue::from_static("xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_new_account_cannot_sign_in_until_approved() {
        let service = local_service();
        let user = service
            .sign_up("alice@example.com", "secret1", None)
            .await
            .unwrap();
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.name.as_deref(), Some("alice@example.com"));

        let err = service
            .sign_in("alice@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotApproved));

        approve(&service, "alice@example.com").await;
        let session = service
            .sign_in("alice@example.com", "secret1")
            .await
            .unwrap();
        let current = service.get_current_user(Some(&session.token)).await.unwrap();
        assert_eq!(current.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_refused_sign_in_leaves_no_session() {
        let service = local_service();
        service
            .sign_up("bob@example.com", "secret1", Some("Bob"))
            .await
            .unwrap();
        let mut events = service.events.subscribe();

        assert!(service.sign_in("bob@example.com", "secret1").await.is_err());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let service = local_service();
        service
            .sign_up("alice@example.com", "secret1", None)
            .await
            .unwrap();
        approve(&service, "alice@example.com").await;

        assert!(matches!(
            service.sign_in("alice@example.com", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.sign_in("nobody@example.com", "secret1").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_performs_no_mutation() {
        let service = local_service();
        service
            .sign_up("alice@example.com", "secret1", None)
            .await
            .unwrap();

        let err = service
            .sign_up("Alice@Example.com", "other", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(_)));
        assert_eq!(service.backend().users.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let service = local_service();
        assert!(matches!(
            service.sign_up("not-an-email", "secret1", None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.sign_up("alice@example.com", "", None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_administrator_session() {
        let service = local_service();
        let session = service.sign_in("admin", ADMIN_SECRET).await.unwrap();
        assert!(session.is_administrator());

        let user = service.get_current_user(Some(&session.token)).await.unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.id, ADMIN_USER_ID);

        assert!(matches!(
            service.sign_in("admin", "guess").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_admin_sign_in_disabled_without_secret() {
        let service = AuthService::new(
            Backend::local(Arc::new(LocalStore::in_memory())),
            None,
            AdminCredential::new(None, "admin@ventureclub.local"),
        );
        assert!(matches!(
            service.sign_in("admin", "").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_sign_out_clears_any_session() {
        let service = local_service();
        let admin = service.sign_in("admin", ADMIN_SECRET).await.unwrap();

        service
            .sign_up("alice@example.com", "secret1", None)
            .await
            .unwrap();
        approve(&service, "alice@example.com").await;
        let member = service
            .sign_in("alice@example.com", "secret1")
            .await
            .unwrap();

        for session in [admin, member] {
            service.sign_out(Some(&session.token)).await.unwrap();
            assert!(service.get_current_user(Some(&session.token)).await.is_none());
            // Idempotent
            service.sign_out(Some(&session.token)).await.unwrap();
        }
        service.sign_out(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_approval_defaults() {
        let service = local_service();
        assert_eq!(service.check_approval("ghost").await, ApprovalInfo::default());
        assert_eq!(
            service.check_approval(ADMIN_USER_ID).await.role,
            UserRole::Admin
        );
    }

    #[tokio::test]
    async fn test_resolution_fails_closed_when_backend_offline() {
        let service = AuthService::new(
            offline_backend(),
            None,
            AdminCredential::new(Some(ADMIN_SECRET.to_string()), "admin@ventureclub.local"),
        );
        assert!(service.get_current_user(Some("token")).await.is_none());
        assert_eq!(service.check_approval("u1").await, ApprovalInfo::default());
    }

    #[tokio::test]
    async fn test_sign_up_falls_back_once_when_backend_offline() {
        let fallback = Backend::local(Arc::new(LocalStore::in_memory()));
        let service = AuthService::new(
            offline_backend(),
            Some(fallback.clone()),
            AdminCredential::new(None, "admin@ventureclub.local"),
        );

        let user = service
            .sign_up("carol@example.com", "secret1", Some("Carol"))
            .await
            .unwrap();
        assert_eq!(user.status, UserStatus::Pending);
        assert!(fallback
            .users
            .find_by_email("carol@example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_sign_up_without_fallback_reports_unavailable() {
        let service = AuthService::new(
            offline_backend(),
            None,
            AdminCredential::new(None, "admin@ventureclub.local"),
        );
        assert!(matches!(
            service.sign_up("carol@example.com", "secret1", None).await,
            Err(AppError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_auth_state_notifications() {
        let service = Arc::new(local_service());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = service.on_auth_state_change(move |change| {
            tx.send(change).ok();
        });

        let session = service.sign_in("admin", ADMIN_SECRET).await.unwrap();
        let change = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.kind, AuthEventKind::SignedIn);
        assert_eq!(change.user.map(|u| u.role), Some(UserRole::Admin));

        service.sign_out(Some(&session.token)).await.unwrap();
        let change = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.kind, AuthEventKind::SignedOut);
        assert!(change.user.is_none());

        // Exactly one notification per transition
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        subscription.unsubscribe();
        service.sign_in("admin", ADMIN_SECRET).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
