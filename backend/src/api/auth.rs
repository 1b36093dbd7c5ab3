//! Sign-in, sign-up and session API endpoints.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::session_token;
use crate::errors::AppError;
use crate::guard::{
    AdminGuard, AuthResolution, GuardState, NavigationIntent, RouteGuard, StandardGuard,
    LOGIN_PATH,
};
use crate::models::{SessionKind, SignInRequest, SignUpRequest, User};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub kind: SessionKind,
    pub user: User,
}

/// Guard options, mirroring the props of the frontend route wrappers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardQuery {
    pub require_approval: Option<bool>,
    pub admin_only: Option<bool>,
    pub admin_panel: Option<bool>,
    pub redirect_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GuardDecision {
    pub state: GuardState,
    pub intent: NavigationIntent,
}

/// POST /api/auth/signin - Sign in with an e-mail or the administrator identifier.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<SignInResponse> {
    let session = state
        .auth
        .sign_in(&request.identifier, &request.password)
        .await?;

    let user = state
        .auth
        .get_current_user(Some(&session.token))
        .await
        .ok_or_else(|| AppError::Internal("Session could not be resolved".to_string()))?;

    success(SignInResponse {
        token: session.token,
        kind: session.kind,
        user,
    })
}

/// POST /api/auth/signup - Register an account pending approval.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<User> {
    let user = state
        .auth
        .sign_up(&request.email, &request.password, request.name.as_deref())
        .await?;
    success(user)
}

/// POST /api/auth/signout - End the caller's session, if any.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    let token = session_token(&headers);
    state.auth.sign_out(token.as_deref()).await?;
    success(())
}

/// GET /api/auth/me - The signed-in user, or null.
pub async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Option<User>> {
    let token = session_token(&headers);
    success(state.auth.get_current_user(token.as_deref()).await)
}

/// GET /api/auth/guard - Evaluate a route guard for the caller.
pub async fn evaluate_guard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GuardQuery>,
) -> ApiResult<GuardDecision> {
    let token = session_token(&headers);
    let resolution = AuthResolution::Resolved(state.auth.resolve(token.as_deref()).await);

    let (state, intent) = if query.admin_panel.unwrap_or(false) {
        AdminGuard.decide(&resolution)
    } else {
        StandardGuard {
            redirect_to: query.redirect_to.unwrap_or_else(|| LOGIN_PATH.to_string()),
            require_approval: query.require_approval.unwrap_or(true),
            admin_only: query.admin_only.unwrap_or(false),
        }
        .decide(&resolution)
    };

    success(GuardDecision { state, intent })
}
