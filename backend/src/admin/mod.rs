//! Member approval and content management for administrators.

use crate::auth::AdminCredential;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{
    now_timestamp, today, ApprovalInfo, ContentFields, ContentItem, PageType, Session,
    UpdateContentRequest, User, UserStatus, ADMIN_USER_ID,
};
use crate::store::{Backend, BackendMode};

/// Defaults applied to content created without an author or category.
#[derive(Debug, Clone)]
pub struct ContentDefaults {
    pub author: String,
    pub category: String,
}

impl ContentDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            author: config.club_name.clone(),
            category: config.default_category.clone(),
        }
    }
}

pub struct AdminService {
    backend: Backend,
    admin: AdminCredential,
    defaults: ContentDefaults,
}

impl AdminService {
    pub fn new(backend: Backend, admin: AdminCredential, defaults: ContentDefaults) -> Self {
        Self {
            backend,
            admin,
            defaults,
        }
    }

    // ==================== USERS ====================

    /// Accounts waiting for approval, newest first.
    pub async fn list_pending_users(&self) -> Result<Vec<User>, AppError> {
        let users = self.backend.users.list_users().await?;
        Ok(users
            .into_iter()
            .filter(|u| u.status == UserStatus::Pending)
            .collect())
    }

    /// All accounts, newest first. The administrator account leads the list
    /// for administrator sessions and in local mode.
    pub async fn list_all_users(&self, actor: &Session) -> Result<Vec<User>, AppError> {
        let mut users = self.backend.users.list_users().await?;
        if actor.is_administrator() || self.backend.mode == BackendMode::Local {
            users.insert(0, self.admin.user());
        }
        Ok(users)
    }

    pub async fn check_approval(&self, id: &str) -> Result<ApprovalInfo, AppError> {
        if id == ADMIN_USER_ID {
            let admin = self.admin.user();
            return Ok(ApprovalInfo {
                status: admin.status,
                role: admin.role,
            });
        }
        let user = self.find_user(id).await?;
        Ok(ApprovalInfo {
            status: user.status,
            role: user.role,
        })
    }

    pub async fn approve_user(&self, actor: &Session, id: &str) -> Result<(), AppError> {
        if id == ADMIN_USER_ID {
            return Ok(());
        }
        self.backend
            .users
            .set_status(id, UserStatus::Approved)
            .await?;
        tracing::info!(actor = actor.actor(), user_id = %id, "User approved");
        Ok(())
    }

    pub async fn reject_user(&self, actor: &Session, id: &str) -> Result<(), AppError> {
        self.ensure_not_admin(id, "rejected").await?;
        self.backend
            .users
            .set_status(id, UserStatus::Rejected)
            .await?;
        tracing::info!(actor = actor.actor(), user_id = %id, "User rejected");
        Ok(())
    }

    pub async fn delete_user(&self, actor: &Session, id: &str) -> Result<(), AppError> {
        self.ensure_not_admin(id, "deleted").await?;
        self.backend.users.delete_user(id).await?;
        tracing::info!(actor = actor.actor(), user_id = %id, "User deleted");
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<User, AppError> {
        self.backend
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn ensure_not_admin(&self, id: &str, action: &str) -> Result<(), AppError> {
        if id == ADMIN_USER_ID || self.find_user(id).await?.is_admin() {
            return Err(AppError::Forbidden(format!(
                "Administrator accounts cannot be {}",
                action
            )));
        }
        Ok(())
    }

    // ==================== CONTENT ====================

    pub async fn list_content(&self, page_type: PageType) -> Result<Vec<ContentItem>, AppError> {
        self.backend.content.list_content(page_type).await
    }

    pub async fn get_content(&self, id: &str) -> Result<ContentItem, AppError> {
        self.backend
            .content
            .get_content(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Content {} not found", id)))
    }

    pub async fn add_content(
        &self,
        actor: &Session,
        page_type: PageType,
        fields: ContentFields,
    ) -> Result<ContentItem, AppError> {
        require_text("Title", &fields.title)?;
        require_text("Excerpt", &fields.excerpt)?;

        let now = now_timestamp();
        let item = ContentItem {
            id: uuid::Uuid::new_v4().to_string(),
            page_type,
            title: fields.title.trim().to_string(),
            excerpt: fields.excerpt.trim().to_string(),
            content: non_blank(fields.content),
            image_url: non_blank(fields.image_url),
            link: non_blank(fields.link),
            date: non_blank(fields.date).unwrap_or_else(today),
            author: non_blank(fields.author).unwrap_or_else(|| self.defaults.author.clone()),
            category: non_blank(fields.category)
                .unwrap_or_else(|| self.defaults.category.clone()),
            created_at: now.clone(),
            updated_at: now,
        };

        self.backend.content.insert_content(&item).await?;
        tracing::info!(
            actor = actor.actor(),
            content_id = %item.id,
            page_type = page_type.as_str(),
            "Content added"
        );
        Ok(item)
    }

    pub async fn update_content(
        &self,
        actor: &Session,
        id: &str,
        patch: UpdateContentRequest,
    ) -> Result<ContentItem, AppError> {
        if let Some(title) = &patch.title {
            require_text("Title", title)?;
        }
        if let Some(excerpt) = &patch.excerpt {
            require_text("Excerpt", excerpt)?;
        }

        let item = self.backend.content.update_content(id, &patch).await?;
        tracing::info!(actor = actor.actor(), content_id = %id, "Content updated");
        Ok(item)
    }

    pub async fn delete_content(&self, actor: &Session, id: &str) -> Result<(), AppError> {
        self.backend.content.delete_content(id).await?;
        tracing::info!(actor = actor.actor(), content_id = %id, "Content deleted");
        Ok(())
    }

    /// Insert one sample item into every page type that has no content yet.
    pub async fn seed_default_content(&self) -> Result<usize, AppError> {
        let seeder = Session::administrator();
        let mut seeded = 0;

        for page_type in PageType::ALL {
            if !self.list_content(page_type).await?.is_empty() {
                continue;
            }
            let (title, excerpt, category) = match page_type {
                PageType::Learning => (
                    "Startup Fundamentals",
                    "From the basics of entrepreneurship to writing a business plan",
                    "Education",
                ),
                PageType::Galleries => (
                    "Startup Competition",
                    "Highlights from the club's annual startup competition",
                    "Events",
                ),
                PageType::Media => (
                    "Club in the News",
                    "Press coverage of the club's history and alumni ventures",
                    "Press",
                ),
            };
            let fields = ContentFields {
                title: title.to_string(),
                excerpt: excerpt.to_string(),
                category: Some(category.to_string()),
                ..Default::default()
            };
            self.add_content(&seeder, page_type, fields).await?;
            seeded += 1;
        }

        Ok(seeded)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
