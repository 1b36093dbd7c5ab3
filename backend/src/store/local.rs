//! Local key-value store persisted as a single JSON document.
//!
//! Each key holds a JSON array of records: `users`, `sessions` and one
//! `content_<pageType>` list per page type. A missing key reads as empty.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{ContentStore, SessionStore, UserStore};
use crate::errors::AppError;
use crate::models::{
    now_timestamp, ContentItem, Credential, NewUser, PageType, Session, SessionKind,
    UpdateContentRequest, User, UserRole, UserStatus,
};

/// Prefix of every account id issued by this store.
pub const LOCAL_ID_PREFIX: &str = "local-";

const USERS_KEY: &str = "users";
const SESSIONS_KEY: &str = "sessions";

fn content_key(page_type: PageType) -> String {
    format!("content_{}", page_type.as_str())
}

/// User record as persisted locally, with its password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(flatten)]
    user: User,
    password_hash: String,
}

type Document = BTreeMap<String, Value>;

/// JSON-file backed store used when no hosted backend is available.
pub struct LocalStore {
    path: Option<PathBuf>,
    doc: Mutex<Document>,
}

impl LocalStore {
    /// Open the store at `path`, or keep it purely in memory when `None`.
    pub async fn open(path: Option<PathBuf>) -> Result<Self, AppError> {
        let doc = match &path {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes)?,
                Ok(_) => Document::new(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::new(),
                Err(e) => return Err(e.into()),
            },
            None => Document::new(),
        };

        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: Mutex::new(Document::new()),
        }
    }

    async fn persist(&self, doc: &Document) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(doc)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Persist `next` and only then make it the live document.
    async fn commit(&self, doc: &mut Document, next: Document) -> Result<(), AppError> {
        self.persist(&next).await?;
        *doc = next;
        Ok(())
    }
}

fn read_list<T: DeserializeOwned>(doc: &Document, key: &str) -> Result<Vec<T>, AppError> {
    match doc.get(key) {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(Vec::new()),
    }
}

/// Copy of `doc` with `key` replaced by `items`. The live document is untouched.
fn with_list<T: Serialize>(doc: &Document, key: &str, items: &[T]) -> Result<Document, AppError> {
    let mut next = doc.clone();
    next.insert(key.to_string(), serde_json::to_value(items)?);
    Ok(next)
}

/// Newest first; among equal timestamps the later insertion wins.
fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> &str) -> Vec<T> {
    items.reverse();
    items.sort_by(|a, b| created_at(b).cmp(created_at(a)));
    items
}

#[async_trait]
impl UserStore for LocalStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let doc = self.doc.lock().await;
        let users: Vec<StoredUser> = read_list(&doc, USERS_KEY)?;
        Ok(users.into_iter().map(|s| s.user).find(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let doc = self.doc.lock().await;
        let users: Vec<StoredUser> = read_list(&doc, USERS_KEY)?;
        Ok(users.into_iter().map(|s| s.user).find(|u| u.email == email))
    }

    async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AppError> {
        let doc = self.doc.lock().await;
        let users: Vec<StoredUser> = read_list(&doc, USERS_KEY)?;
        Ok(users
            .into_iter()
            .find(|s| s.user.email == email)
            .map(|s| Credential {
                user_id: s.user.id,
                password_hash: s.password_hash,
            }))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut doc = self.doc.lock().await;
        let mut users: Vec<StoredUser> = read_list(&doc, USERS_KEY)?;

        if users.iter().any(|s| s.user.email == new_user.email) {
            return Err(AppError::DuplicateEmail(format!(
                "Email {} is already registered",
                new_user.email
            )));
        }

        let now = now_timestamp();
        let user = User {
            id: format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4()),
            email: new_user.email,
            name: new_user.name,
            status: UserStatus::Pending,
            role: UserRole::User,
            created_at: now.clone(),
            updated_at: now,
        };
        users.push(StoredUser {
            user: user.clone(),
            password_hash: new_user.password_hash,
        });

        let next = with_list(&doc, USERS_KEY, &users)?;
        self.commit(&mut doc, next).await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let doc = self.doc.lock().await;
        let users: Vec<StoredUser> = read_list(&doc, USERS_KEY)?;
        let users = users.into_iter().map(|s| s.user).collect();
        Ok(newest_first(users, |u: &User| u.created_at.as_str()))
    }

    async fn set_status(&self, id: &str, status: UserStatus) -> Result<(), AppError> {
        let mut doc = self.doc.lock().await;
        let mut users: Vec<StoredUser> = read_list(&doc, USERS_KEY)?;

        let stored = users
            .iter_mut()
            .find(|s| s.user.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        stored.user.status = status;
        stored.user.updated_at = now_timestamp();

        let next = with_list(&doc, USERS_KEY, &users)?;
        self.commit(&mut doc, next).await
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let mut doc = self.doc.lock().await;
        let mut users: Vec<StoredUser> = read_list(&doc, USERS_KEY)?;

        let before = users.len();
        users.retain(|s| s.user.id != id);
        if users.len() == before {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        let mut sessions: Vec<Session> = read_list(&doc, SESSIONS_KEY)?;
        sessions.retain(|s| !matches!(&s.kind, SessionKind::Member { user_id } if user_id == id));

        let next = with_list(&doc, USERS_KEY, &users)?;
        let next = with_list(&next, SESSIONS_KEY, &sessions)?;
        self.commit(&mut doc, next).await
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    async fn list_content(&self, page_type: PageType) -> Result<Vec<ContentItem>, AppError> {
        let doc = self.doc.lock().await;
        let items: Vec<ContentItem> = read_list(&doc, &content_key(page_type))?;
        Ok(newest_first(items, |c: &ContentItem| c.created_at.as_str()))
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, AppError> {
        let doc = self.doc.lock().await;
        for page_type in PageType::ALL {
            let items: Vec<ContentItem> = read_list(&doc, &content_key(page_type))?;
            if let Some(item) = items.into_iter().find(|c| c.id == id) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    async fn insert_content(&self, item: &ContentItem) -> Result<(), AppError> {
        let mut doc = self.doc.lock().await;
        let key = content_key(item.page_type);
        let mut items: Vec<ContentItem> = read_list(&doc, &key)?;
        items.push(item.clone());

        let next = with_list(&doc, &key, &items)?;
        self.commit(&mut doc, next).await
    }

    async fn update_content(
        &self,
        id: &str,
        patch: &UpdateContentRequest,
    ) -> Result<ContentItem, AppError> {
        let mut doc = self.doc.lock().await;
        for page_type in PageType::ALL {
            let key = content_key(page_type);
            let mut items: Vec<ContentItem> = read_list(&doc, &key)?;
            if let Some(item) = items.iter_mut().find(|c| c.id == id) {
                patch.apply(item, &now_timestamp());
                let updated = item.clone();
                let next = with_list(&doc, &key, &items)?;
                self.commit(&mut doc, next).await?;
                return Ok(updated);
            }
        }
        Err(AppError::NotFound(format!("Content {} not found", id)))
    }

    async fn delete_content(&self, id: &str) -> Result<(), AppError> {
        let mut doc = self.doc.lock().await;
        for page_type in PageType::ALL {
            let key = content_key(page_type);
            let mut items: Vec<ContentItem> = read_list(&doc, &key)?;
            let before = items.len();
            items.retain(|c| c.id != id);
            if items.len() != before {
                let next = with_list(&doc, &key, &items)?;
                return self.commit(&mut doc, next).await;
            }
        }
        Err(AppError::NotFound(format!("Content {} not found", id)))
    }
}

#[async_trait]
impl SessionStore for LocalStore {
    async fn create_session(&self, session: &Session) -> Result<(), AppError> {
        let mut doc = self.doc.lock().await;
        let mut sessions: Vec<Session> = read_list(&doc, SESSIONS_KEY)?;
        sessions.push(session.clone());

        let next = with_list(&doc, SESSIONS_KEY, &sessions)?;
        self.commit(&mut doc, next).await
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let doc = self.doc.lock().await;
        let sessions: Vec<Session> = read_list(&doc, SESSIONS_KEY)?;
        Ok(sessions.into_iter().find(|s| s.token == token))
    }

    async fn revoke_session(&self, token: &str) -> Result<bool, AppError> {
        let mut doc = self.doc.lock().await;
        let mut sessions: Vec<Session> = read_list(&doc, SESSIONS_KEY)?;

        let before = sessions.len();
        sessions.retain(|s| s.token != token);
        if sessions.len() == before {
            return Ok(false);
        }

        let next = with_list(&doc, SESSIONS_KEY, &sessions)?;
        self.commit(&mut doc, next).await?;
        Ok(true)
    }
}
