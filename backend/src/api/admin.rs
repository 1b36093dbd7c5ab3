//! Admin panel API endpoints. Every route here sits behind the Admin Guard.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{success, ApiResult};
use crate::guard::AuthContext;
use crate::models::{ApprovalInfo, ContentItem, CreateContentRequest, UpdateContentRequest, User};
use crate::AppState;

// ==================== USERS ====================

/// GET /api/admin/users - All accounts, newest first.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Vec<User>> {
    success(state.admin.list_all_users(&ctx.session).await?)
}

/// GET /api/admin/users/pending - Accounts awaiting approval.
pub async fn list_pending_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    success(state.admin.list_pending_users().await?)
}

/// GET /api/admin/users/:id/approval
pub async fn check_approval(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApprovalInfo> {
    success(state.admin.check_approval(&id).await?)
}

/// POST /api/admin/users/:id/approve
pub async fn approve_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.admin.approve_user(&ctx.session, &id).await?;
    success(())
}

/// POST /api/admin/users/:id/reject
pub async fn reject_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.admin.reject_user(&ctx.session, &id).await?;
    success(())
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.admin.delete_user(&ctx.session, &id).await?;
    success(())
}

// ==================== CONTENT ====================

/// POST /api/admin/content - Create content on the page named in the body.
pub async fn create_content(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CreateContentRequest>,
) -> ApiResult<ContentItem> {
    let item = state
        .admin
        .add_content(&ctx.session, request.page_type, request.fields)
        .await?;
    success(item)
}

/// PUT /api/admin/content/:id - Partially update a content item.
pub async fn update_content(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(request): Json<UpdateContentRequest>,
) -> ApiResult<ContentItem> {
    success(state.admin.update_content(&ctx.session, &id, request).await?)
}

/// DELETE /api/admin/content/:id
pub async fn delete_content(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.admin.delete_content(&ctx.session, &id).await?;
    success(())
}
