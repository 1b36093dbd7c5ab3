//! Account store spanning the hosted backend and the local sign-up fallback.
//!
//! Sign-ups taken while the hosted backend was unreachable live in the local
//! store. Listings merge both sides, lookups by id go to the side that issued
//! the id, and lookups by e-mail try the hosted side first.

use std::sync::Arc;

use async_trait::async_trait;

use super::local::LOCAL_ID_PREFIX;
use super::UserStore;
use crate::errors::AppError;
use crate::models::{Credential, NewUser, User, UserStatus};

pub struct FallbackUserStore {
    primary: Arc<dyn UserStore>,
    local: Arc<dyn UserStore>,
}

impl FallbackUserStore {
    pub fn new(primary: Arc<dyn UserStore>, local: Arc<dyn UserStore>) -> Self {
        Self { primary, local }
    }

    fn owner(&self, id: &str) -> &dyn UserStore {
        if id.starts_with(LOCAL_ID_PREFIX) {
            self.local.as_ref()
        } else {
            self.primary.as_ref()
        }
    }
}

#[async_trait]
impl UserStore for FallbackUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.owner(id).find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match self.primary.find_by_email(email).await? {
            Some(user) => Ok(Some(user)),
            None => self.local.find_by_email(email).await,
        }
    }

    /// Hosted errors are returned as is, so sign-up can still fall back.
    async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AppError> {
        match self.primary.find_credential(email).await? {
            Some(credential) => Ok(Some(credential)),
            None => self.local.find_credential(email).await,
        }
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        self.primary.create_user(new_user).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.primary.list_users().await?;
        users.extend(self.local.list_users().await?);
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn set_status(&self, id: &str, status: UserStatus) -> Result<(), AppError> {
        self.owner(id).set_status(id, status).await
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.owner(id).delete_user(id).await
    }
}
