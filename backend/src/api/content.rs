//! Public content and member dashboard endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Serialize;

use super::{page_type, success, ApiResult};
use crate::errors::AppError;
use crate::guard::AuthContext;
use crate::models::{ContentItem, User};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user: User,
    /// Newest item per page type; empty page types are omitted.
    pub latest: BTreeMap<&'static str, ContentItem>,
}

/// GET /api/content/:pageType - List content, newest first.
pub async fn list_content(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> ApiResult<Vec<ContentItem>> {
    let page_type = page_type(&segment)?;
    success(state.admin.list_content(page_type).await?)
}

/// GET /api/content/:pageType/:id - A single item for its detail page.
pub async fn get_content(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> ApiResult<ContentItem> {
    let page_type = page_type(&segment)?;
    let item = state.admin.get_content(&id).await?;
    if item.page_type != page_type {
        return Err(AppError::NotFound(format!("Content {} not found", id)));
    }
    success(item)
}

/// GET /api/dashboard - Member landing page.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Dashboard> {
    let mut latest = BTreeMap::new();
    for page_type in crate::models::PageType::ALL {
        let items = state.admin.list_content(page_type).await?;
        if let Some(item) = items.into_iter().next() {
            latest.insert(page_type.as_str(), item);
        }
    }

    success(Dashboard {
        user: ctx.user,
        latest,
    })
}
