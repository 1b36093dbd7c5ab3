//! Route guards as a pure state machine.
//!
//! A guard maps the auth resolution of a visitor to a [`GuardState`] and the
//! [`NavigationIntent`] a frontend should act on. Nothing is cached between
//! evaluations, so a session change is reflected on the next evaluation.

mod layer;

pub use layer::*;

use serde::Serialize;

use crate::auth::AuthSnapshot;

pub const LOGIN_PATH: &str = "/login";
pub const PENDING_APPROVAL_PATH: &str = "/pending-approval";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Auth resolution as seen by a guard.
#[derive(Debug, Clone)]
pub enum AuthResolution {
    Pending,
    Resolved(AuthSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardState {
    Loading,
    Unauthenticated,
    Unapproved,
    Forbidden,
    Authorized,
}

/// What the presentation layer should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NavigationIntent {
    ShowLoading,
    Redirect { to: String },
    DenyInline,
    Render,
}

pub trait RouteGuard {
    fn evaluate(&self, resolution: &AuthResolution) -> GuardState;

    fn intent(&self, state: GuardState) -> NavigationIntent;

    fn decide(&self, resolution: &AuthResolution) -> (GuardState, NavigationIntent) {
        let state = self.evaluate(resolution);
        (state, self.intent(state))
    }
}

/// Guard for member pages. Redirects visitors who may not see the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardGuard {
    pub redirect_to: String,
    pub require_approval: bool,
    pub admin_only: bool,
}

impl Default for StandardGuard {
    fn default() -> Self {
        Self {
            redirect_to: LOGIN_PATH.to_string(),
            require_approval: true,
            admin_only: false,
        }
    }
}

impl RouteGuard for StandardGuard {
    fn evaluate(&self, resolution: &AuthResolution) -> GuardState {
        let AuthResolution::Resolved(snapshot) = resolution else {
            return GuardState::Loading;
        };
        let Some(user) = &snapshot.user else {
            return GuardState::Unauthenticated;
        };

        if self.require_approval && !user.is_approved() {
            GuardState::Unapproved
        } else if self.admin_only && !user.is_admin() {
            GuardState::Forbidden
        } else {
            GuardState::Authorized
        }
    }

    fn intent(&self, state: GuardState) -> NavigationIntent {
        match state {
            GuardState::Loading => NavigationIntent::ShowLoading,
            GuardState::Unauthenticated => NavigationIntent::Redirect {
                to: self.redirect_to.clone(),
            },
            GuardState::Unapproved => NavigationIntent::Redirect {
                to: PENDING_APPROVAL_PATH.to_string(),
            },
            GuardState::Forbidden => NavigationIntent::Redirect {
                to: DASHBOARD_PATH.to_string(),
            },
            GuardState::Authorized => NavigationIntent::Render,
        }
    }
}

/// Guard for the admin panel. Denies in place instead of redirecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminGuard;

impl RouteGuard for AdminGuard {
    fn evaluate(&self, resolution: &AuthResolution) -> GuardState {
        let AuthResolution::Resolved(snapshot) = resolution else {
            return GuardState::Loading;
        };

        let is_admin_user = snapshot.user.as_ref().is_some_and(|u| u.is_admin());
        if snapshot.is_admin_session() || is_admin_user {
            GuardState::Authorized
        } else {
            GuardState::Forbidden
        }
    }

    fn intent(&self, state: GuardState) -> NavigationIntent {
        match state {
            GuardState::Loading => NavigationIntent::ShowLoading,
            GuardState::Authorized => NavigationIntent::Render,
            _ => NavigationIntent::DenyInline,
        }
    }
}
