//! Storage ports and backend selection.
//!
//! Services only see the three store traits. Which implementation sits behind
//! them (hosted SQL backend or the local JSON store) is decided once, in
//! [`Backend::connect`].

mod accounts;
mod local;

pub use local::LocalStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::db::{self, Repository};
use crate::errors::AppError;
use crate::models::{
    ContentItem, Credential, NewUser, PageType, Session, UpdateContentRequest, User, UserStatus,
};

/// Persistence of member accounts and their credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Credential registered for an e-mail, if any.
    async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AppError>;

    /// Create a pending, non-admin account.
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError>;

    /// All accounts, newest first.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn set_status(&self, id: &str, status: UserStatus) -> Result<(), AppError>;

    async fn delete_user(&self, id: &str) -> Result<(), AppError>;
}

/// Persistence of editorial content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Items of one page type, newest first.
    async fn list_content(&self, page_type: PageType) -> Result<Vec<ContentItem>, AppError>;

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, AppError>;

    async fn insert_content(&self, item: &ContentItem) -> Result<(), AppError>;

    async fn update_content(
        &self,
        id: &str,
        patch: &UpdateContentRequest,
    ) -> Result<ContentItem, AppError>;

    async fn delete_content(&self, id: &str) -> Result<(), AppError>;
}

/// Persistence of established sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<(), AppError>;

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError>;

    /// Returns whether a session was removed.
    async fn revoke_session(&self, token: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Hosted relational backend
    Hosted,
    /// Local JSON key-value store
    Local,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Hosted => "hosted",
            BackendMode::Local => "local",
        }
    }
}

/// The set of stores every service runs against.
#[derive(Clone)]
pub struct Backend {
    pub mode: BackendMode,
    pub users: Arc<dyn UserStore>,
    pub content: Arc<dyn ContentStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Backend {
    pub fn hosted(repo: Arc<Repository>) -> Self {
        Self {
            mode: BackendMode::Hosted,
            users: repo.clone(),
            content: repo.clone(),
            sessions: repo,
        }
    }

    pub fn local(store: Arc<LocalStore>) -> Self {
        Self {
            mode: BackendMode::Local,
            users: store.clone(),
            content: store.clone(),
            sessions: store,
        }
    }

    /// Serve accounts created in `local` by the sign-up fallback alongside
    /// the primary ones.
    pub fn with_local_accounts(mut self, local: Arc<LocalStore>) -> Self {
        self.users = Arc::new(accounts::FallbackUserStore::new(self.users, local));
        self
    }

    /// Whether the hosted backend is in use.
    pub fn is_configured(&self) -> bool {
        self.mode == BackendMode::Hosted
    }

    /// Select the backend for this process.
    ///
    /// Returns the primary backend and, in hosted mode, the local store used
    /// as the sign-up fallback.
    pub async fn connect(config: &Config) -> Result<(Backend, Option<Backend>), AppError> {
        let local = Arc::new(LocalStore::open(config.local_store_path.clone()).await?);

        let Some(db_path) = &config.db_path else {
            tracing::info!("No hosted backend configured; using local store");
            return Ok((Backend::local(local), None));
        };

        match db::init_database(db_path).await {
            Ok(pool) => {
                tracing::info!("Using hosted backend at {:?}", db_path);
                let repo = Arc::new(Repository::new(pool));
                Ok((
                    Backend::hosted(repo).with_local_accounts(local.clone()),
                    Some(Backend::local(local)),
                ))
            }
            Err(e) => {
                tracing::warn!(
                    "Hosted backend at {:?} unreachable ({}); using local store",
                    db_path,
                    e
                );
                Ok((Backend::local(local), None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(db_path: Option<std::path::PathBuf>) -> Config {
        Config {
            db_path,
            local_store_path: None,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_json: false,
            admin_password: None,
            admin_email: "admin@ventureclub.local".to_string(),
            club_name: "Venture Club".to_string(),
            default_category: "General".to_string(),
            seed_content: false,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_selects_local() {
        let (backend, fallback) = Backend::connect(&config_with(None)).await.unwrap();
        assert_eq!(backend.mode, BackendMode::Local);
        assert!(!backend.is_configured());
        assert!(fallback.is_none());
    }

    #[tokio::test]
    async fn test_configured_selects_hosted_with_fallback() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = config_with(Some(dir.path().join("club.sqlite")));

        let (backend, fallback) = Backend::connect(&config).await.unwrap();
        assert!(backend.is_configured());
        assert_eq!(fallback.map(|b| b.mode), Some(BackendMode::Local));
    }

    #[tokio::test]
    async fn test_unreachable_hosted_falls_back_to_local() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened as a database file.
        let config = config_with(Some(dir.path().to_path_buf()));

        let (backend, fallback) = Backend::connect(&config).await.unwrap();
        assert_eq!(backend.mode, BackendMode::Local);
        assert!(fallback.is_none());
    }
}
