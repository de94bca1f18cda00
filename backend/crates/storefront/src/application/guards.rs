//! Route Guards
//!
//! Pure predicates over `AuthState`, evaluated on every navigation. While the
//! session is initializing or an auth operation is running, the answer is
//! `Pending` and no redirect is issued.
//!
//! Insufficient role is answered exactly like a missing identity: redirect to
//! the login entry point.

use crate::domain::entity::AuthState;
use crate::domain::value_object::user_role::UserRole;

/// Login entry point that guarded routes redirect to
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Render a neutral loading state, do not redirect
    Pending,
    Allow,
    RedirectToLogin,
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allow)
    }
}

pub fn require_authenticated(state: &AuthState) -> GuardOutcome {
    if !state.is_settled() {
        return GuardOutcome::Pending;
    }
    if state.identity.is_none() {
        return GuardOutcome::RedirectToLogin;
    }
    GuardOutcome::Allow
}

pub fn require_role(state: &AuthState, role: UserRole) -> GuardOutcome {
    match require_authenticated(state) {
        GuardOutcome::Allow if state.role == Some(role) => GuardOutcome::Allow,
        GuardOutcome::Allow => {
            tracing::debug!(
                required = %role,
                actual = state.role.map(|r| r.code()),
                "Insufficient role, redirecting to login"
            );
            GuardOutcome::RedirectToLogin
        }
        other => other,
    }
}
