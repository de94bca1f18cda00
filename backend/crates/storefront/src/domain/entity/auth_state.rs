//! Auth State
//!
//! The single observable snapshot of "who is signed in" for one session.
//! Invariant: `role` is `None` whenever `identity` is `None`.

use serde::Serialize;

use crate::domain::entity::principal::Principal;
use crate::domain::value_object::user_role::UserRole;
use crate::error::ErrorInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub identity: Option<Principal>,
    pub role: Option<UserRole>,
    /// True only until the first session resolution completes
    pub is_initializing: bool,
    /// True while an explicit auth operation is in flight
    pub is_loading: bool,
    pub last_error: Option<ErrorInfo>,
}

impl AuthState {
    /// State before the first resolution
    pub fn initializing() -> Self {
        Self {
            identity: None,
            role: None,
            is_initializing: true,
            is_loading: false,
            last_error: None,
        }
    }

    /// Settled, no identity. What a browser without a session sees.
    pub fn signed_out() -> Self {
        Self {
            is_initializing: false,
            ..Self::initializing()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.identity.is_some() && self.role.is_some_and(|role| role.is_admin())
    }

    /// Neither initializing nor running an operation
    pub fn is_settled(&self) -> bool {
        !self.is_initializing && !self.is_loading
    }

    /// Replace identity and role together
    pub(crate) fn set_identity(&mut self, identity: Option<Principal>, role: Option<UserRole>) {
        self.role = identity.as_ref().and(role);
        self.identity = identity;
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initializing()
    }
}
