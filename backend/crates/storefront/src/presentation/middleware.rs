//! Guard Middleware
//!
//! Applies the route guards to HTTP requests. Page routes answer a pending
//! session with a neutral loading page and an unauthorized one with a
//! redirect to the login page; API routes answer with 503 and 401.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::application::guards::{GuardOutcome, LOGIN_PATH, require_authenticated, require_role};
use crate::domain::entity::AuthState;
use crate::domain::identity::IdentityProvider;
use crate::domain::image_host::ImageHost;
use crate::domain::repository::DocumentStore;
use crate::domain::value_object::user_role::UserRole;
use crate::error::StorefrontError;
use crate::presentation::handlers::{SessionUser, StorefrontState};
use crate::presentation::pages;

/// Seconds a client should wait before retrying a pending request
const RETRY_AFTER_SECS: &str = "1";

fn evaluate(auth: &AuthState, role: Option<UserRole>) -> GuardOutcome {
    match role {
        Some(role) => require_role(auth, role),
        None => require_authenticated(auth),
    }
}

fn session_user(auth: &AuthState) -> Option<SessionUser> {
    let identity = auth.identity.as_ref()?;
    Some(SessionUser {
        uid: identity.uid.clone(),
        role: auth.role.unwrap_or_default(),
    })
}

async fn guard_api<P, S, I>(
    state: &StorefrontState<P, S, I>,
    role: Option<UserRole>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let (auth, _) = state.auth_state(req.headers()).await;

    match evaluate(&auth, role) {
        GuardOutcome::Allow => {
            if let Some(user) = session_user(&auth) {
                req.extensions_mut().insert(user);
            }
            next.run(req).await
        }
        GuardOutcome::Pending => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
        )
            .into_response(),
        GuardOutcome::RedirectToLogin => StorefrontError::NotAuthenticated.into_response(),
    }
}

async fn guard_page<P, S, I>(
    state: &StorefrontState<P, S, I>,
    role: Option<UserRole>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let (auth, _) = state.auth_state(req.headers()).await;

    match evaluate(&auth, role) {
        GuardOutcome::Allow => next.run(req).await,
        GuardOutcome::Pending => (
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::REFRESH, RETRY_AFTER_SECS),
            ],
            pages::LoadingTemplate,
        )
            .into_response(),
        GuardOutcome::RedirectToLogin => {
            tracing::debug!(path = %req.uri().path(), "Guarded page, redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

/// API routes for any signed-in user
pub async fn require_session_api<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    guard_api(&state, None, req, next).await
}

/// API routes for administrators
pub async fn require_admin_api<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    guard_api(&state, Some(UserRole::Admin), req, next).await
}

/// Pages for any signed-in user
pub async fn require_session_page<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    guard_page(&state, None, req, next).await
}

/// Pages for administrators
pub async fn require_admin_page<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    guard_page(&state, Some(UserRole::Admin), req, next).await
}
