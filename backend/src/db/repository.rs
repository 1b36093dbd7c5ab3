//! Hosted backend repository implementing the storage ports over SQLite.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    now_timestamp, ContentItem, Credential, NewUser, PageType, Session, SessionKind,
    UpdateContentRequest, User, UserRole, UserStatus,
};
use crate::store::{ContentStore, SessionStore, UserStore};

const USER_COLUMNS: &str = "id, email, name, status, role, created_at, updated_at";
const CONTENT_COLUMNS: &str = "id, page_type, title, excerpt, content, image_url, link, date, author, category, created_at, updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the queryable profile row for a new identity.
    async fn insert_profile(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO users (id, email, name, status, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.status.as_str())
        .bind(user.role.as_str())
        .bind(&user.created_at)
        .bind(&user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ==================== USER OPERATIONS ====================

#[async_trait]
impl UserStore for Repository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AppError> {
        let row = sqlx::query("SELECT id, password_hash FROM credentials WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Credential {
            user_id: row.get("id"),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        let result = sqlx::query(
            "INSERT INTO credentials (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            let duplicate = err
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation());
            if duplicate {
                return Err(AppError::DuplicateEmail(format!(
                    "Email {} is already registered",
                    new_user.email
                )));
            }
            return Err(err.into());
        }

        let user = User {
            id,
            email: new_user.email,
            name: new_user.name,
            status: UserStatus::Pending,
            role: UserRole::User,
            created_at: now.clone(),
            updated_at: now,
        };

        // The identity record is authoritative; a missing profile only delays approval.
        if let Err(e) = self.insert_profile(&user).await {
            tracing::warn!(user_id = %user.id, "Profile insert failed after sign-up: {}", e);
        }

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn set_status(&self, id: &str, status: UserStatus) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // A credential may exist without a profile when the profile insert failed.
        let profiles = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let credentials = sqlx::query("DELETE FROM credentials WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if profiles.rows_affected() == 0 && credentials.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}

// ==================== CONTENT OPERATIONS ====================

#[async_trait]
impl ContentStore for Repository {
    async fn list_content(&self, page_type: PageType) -> Result<Vec<ContentItem>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content WHERE page_type = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(page_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(content_from_row).collect())
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentItem>, AppError> {
        let row = sqlx::query(&format!("SELECT {CONTENT_COLUMNS} FROM content WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(content_from_row))
    }

    async fn insert_content(&self, item: &ContentItem) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO content ({CONTENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&item.id)
        .bind(item.page_type.as_str())
        .bind(&item.title)
        .bind(&item.excerpt)
        .bind(&item.content)
        .bind(&item.image_url)
        .bind(&item.link)
        .bind(&item.date)
        .bind(&item.author)
        .bind(&item.category)
        .bind(&item.created_at)
        .bind(&item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_content(
        &self,
        id: &str,
        patch: &UpdateContentRequest,
    ) -> Result<ContentItem, AppError> {
        let mut item = self
            .get_content(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Content {} not found", id)))?;

        patch.apply(&mut item, &now_timestamp());

        sqlx::query(
            "UPDATE content SET title = ?, excerpt = ?, content = ?, image_url = ?, link = ?, date = ?, author = ?, category = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&item.title)
        .bind(&item.excerpt)
        .bind(&item.content)
        .bind(&item.image_url)
        .bind(&item.link)
        .bind(&item.date)
        .bind(&item.author)
        .bind(&item.category)
        .bind(&item.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    async fn delete_content(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM content WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Content {} not found", id)));
        }
        Ok(())
    }
}

// ==================== SESSION OPERATIONS ====================

#[async_trait]
impl SessionStore for Repository {
    async fn create_session(&self, session: &Session) -> Result<(), AppError> {
        let (kind, user_id) = match &session.kind {
            SessionKind::Administrator => ("administrator", None),
            SessionKind::Member { user_id } => ("member", Some(user_id.as_str())),
        };

        sqlx::query("INSERT INTO sessions (token, kind, user_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&session.token)
            .bind(kind)
            .bind(user_id)
            .bind(&session.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query("SELECT token, kind, user_id, created_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(session_from_row))
    }

    async fn revoke_session(&self, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// ==================== ROW MAPPERS ====================

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let status: String = row.get("status");
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        // Unknown values fall back to the least privileged state
        status: UserStatus::from_str(&status).unwrap_or(UserStatus::Pending),
        role: UserRole::from_str(&role).unwrap_or(UserRole::User),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn content_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<ContentItem> {
    let page_type: String = row.get("page_type");
    Some(ContentItem {
        id: row.get("id"),
        page_type: PageType::from_str(&page_type)?,
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        image_url: row.get("image_url"),
        link: row.get("link"),
        date: row.get("date"),
        author: row.get("author"),
        category: row.get("category"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<Session> {
    let kind: String = row.get("kind");
    let user_id: Option<String> = row.get("user_id");
    let kind = match (kind.as_str(), user_id) {
        ("administrator", _) => SessionKind::Administrator,
        ("member", Some(user_id)) => SessionKind::Member { user_id },
        _ => return None,
    };
    Some(Session {
        token: row.get("token"),
        kind,
        created_at: row.get("created_at"),
    })
}
