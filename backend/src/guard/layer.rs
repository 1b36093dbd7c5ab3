//! Axum middleware enforcing route guards on protected routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::{AdminGuard, AuthResolution, GuardState, NavigationIntent, RouteGuard, StandardGuard};
use crate::auth::{session_token, AuthService};
use crate::errors::{codes, ErrorResponse};
use crate::models::{Session, User};

/// Resolved caller, attached to authorized requests as an extension.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token: String,
    pub session: Session,
    pub user: User,
}

/// Standard Guard with approval required.
pub async fn require_member(
    State(auth): State<Arc<AuthService>>,
    request: Request,
    next: Next,
) -> Response {
    guarded(&StandardGuard::default(), &auth, request, next).await
}

/// Admin Guard.
pub async fn require_admin(
    State(auth): State<Arc<AuthService>>,
    request: Request,
    next: Next,
) -> Response {
    guarded(&AdminGuard, &auth, request, next).await
}

async fn guarded<G: RouteGuard>(
    guard: &G,
    auth: &AuthService,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers());
    let snapshot = auth.resolve(token.as_deref()).await;
    let (state, intent) = guard.decide(&AuthResolution::Resolved(snapshot.clone()));

    match (intent, token, snapshot.session, snapshot.user) {
        (NavigationIntent::Render, Some(token), Some(session), Some(user)) => {
            request.extensions_mut().insert(AuthContext {
                token,
                session,
                user,
            });
            next.run(request).await
        }
        (NavigationIntent::Render, ..) => {
            denial_response(GuardState::Unauthenticated, &NavigationIntent::DenyInline)
        }
        (intent, ..) => {
            tracing::debug!(state = ?state, "Request denied by route guard");
            denial_response(state, &intent)
        }
    }
}

/// HTTP rendering of a guard denial.
pub fn denial_response(state: GuardState, intent: &NavigationIntent) -> Response {
    let (status, body) = match intent {
        NavigationIntent::Redirect { to } => {
            let (status, code, message) = match state {
                GuardState::Unapproved => (
                    StatusCode::FORBIDDEN,
                    codes::NOT_APPROVED,
                    "Account is awaiting approval",
                ),
                GuardState::Forbidden => (
                    StatusCode::FORBIDDEN,
                    codes::FORBIDDEN,
                    "Administrator access required",
                ),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    codes::UNAUTHENTICATED,
                    "Sign-in required",
                ),
            };
            let details = json!({ "redirectTo": to });
            (status, ErrorResponse::new(code, message, Some(details)))
        }
        NavigationIntent::DenyInline if state == GuardState::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new(codes::UNAUTHENTICATED, "Sign-in required", None),
        ),
        _ => (
            StatusCode::FORBIDDEN,
            ErrorResponse::new(codes::ACCESS_DENIED, "Access denied", None),
        ),
    };

    (status, Json(body)).into_response()
}
