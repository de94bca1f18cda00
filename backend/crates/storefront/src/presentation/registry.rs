//! Browser Session Registry
//!
//! Maps a signed session cookie to the `SessionManager` of that browser.
//! Every browser session gets its own identity-provider session, built by the
//! provider factory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderMap;
use kernel::id::UserId;
use platform::crypto::{sign_token, verify_token};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::config::SessionLifetime;
use crate::application::session_manager::SessionManager;
use crate::domain::identity::IdentityProvider;
use crate::domain::repository::UserStore;
use crate::error::StorefrontError;

/// Builds a fresh provider session
pub type ProviderFactory<P> = Arc<dyn Fn() -> P + Send + Sync>;

struct Entry<P, U> {
    manager: Arc<SessionManager<P, U>>,
    expires_at: Instant,
    last_seen: Instant,
    /// Forced out by a block; handed out once more so the reason is seen
    retired: bool,
}

impl<P, U> Entry<P, U> {
    fn is_expired(&self, now: Instant, lifetime: SessionLifetime) -> bool {
        now >= self.expires_at || now.saturating_duration_since(self.last_seen) >= lifetime.idle
    }
}

pub struct SessionRegistry<P, U> {
    factory: ProviderFactory<P>,
    users: Arc<U>,
    secret: [u8; 32],
    lifetime: SessionLifetime,
    sessions: RwLock<HashMap<Uuid, Entry<P, U>>>,
}

impl<P, U> SessionRegistry<P, U>
where
    P: IdentityProvider + Send + Sync + 'static,
    U: UserStore + Send + Sync + 'static,
{
    pub fn new(
        factory: ProviderFactory<P>,
        users: Arc<U>,
        secret: [u8; 32],
        lifetime: SessionLifetime,
    ) -> Self {
        Self {
            factory,
            users,
            secret,
            lifetime,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Cookie value for a session id
    pub fn issue_token(&self, id: Uuid) -> String {
        sign_token(&self.secret, &id.to_string())
    }

    /// Session id from a signed cookie value; `None` if forged or malformed
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let payload = verify_token(&self.secret, token).ok()?;
        Uuid::parse_str(payload).ok()
    }

    /// Session id carried by the request's cookie
    pub fn session_id(&self, headers: &HeaderMap, cookie_name: &str) -> Option<Uuid> {
        let token = platform::cookie::extract_cookie(headers, cookie_name)?;
        let id = self.verify(&token);
        if id.is_none() {
            tracing::debug!("Ignoring session cookie with bad signature");
        }
        id
    }

    /// Live session for `id`. Refreshes its idle deadline; expired and
    /// retired sessions leave the registry here.
    pub async fn lookup(&self, id: Uuid) -> Option<Arc<SessionManager<P, U>>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;

        if entry.is_expired(now, self.lifetime) {
            sessions.remove(&id);
            tracing::debug!(session_id = %id, "Browser session expired");
            return None;
        }
        if entry.retired {
            let entry = sessions.remove(&id)?;
            tracing::debug!(session_id = %id, "Retired browser session dropped");
            return Some(entry.manager);
        }

        entry.last_seen = now;
        Some(Arc::clone(&entry.manager))
    }

    /// Existing session for `id`, or a new one. The flag is true when a
    /// session was created and its cookie still has to be sent.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<SessionManager<P, U>>, bool) {
        if let Some(id) = id {
            if let Some(manager) = self.lookup(id).await {
                return (id, manager, false);
            }
        }

        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let evicted = Self::evict(&mut sessions, now, self.lifetime);

        let id = Uuid::new_v4();
        let provider = Arc::new((self.factory)());
        let manager = SessionManager::start(provider, Arc::clone(&self.users));
        sessions.insert(
            id,
            Entry {
                manager: Arc::clone(&manager),
                expires_at: now + self.lifetime.absolute,
                last_seen: now,
                retired: false,
            },
        );

        tracing::debug!(
            session_id = %id,
            sessions = sessions.len(),
            evicted,
            "Browser session created"
        );
        (id, manager, true)
    }

    /// A manager that is not registered; dropped with its last handle
    pub fn detached(&self) -> Arc<SessionManager<P, U>> {
        SessionManager::start(Arc::new((self.factory)()), Arc::clone(&self.users))
    }

    pub async fn remove(&self, id: Uuid) -> Option<Arc<SessionManager<P, U>>> {
        let removed = self.sessions.write().await.remove(&id).map(|entry| entry.manager);
        if removed.is_some() {
            tracing::debug!(session_id = %id, "Browser session dropped");
        }
        removed
    }

    /// Drop every session expired at `now`. Returns how many were dropped.
    pub async fn sweep(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        Self::evict(&mut sessions, now, self.lifetime)
    }

    fn evict(
        sessions: &mut HashMap<Uuid, Entry<P, U>>,
        now: Instant,
        lifetime: SessionLifetime,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now, lifetime));
        before - sessions.len()
    }

    /// Re-evaluate authorization on every session signed in as `uid`.
    /// Sessions signed out because the account is blocked are retired.
    /// Returns how many sessions were refreshed.
    pub async fn refresh_user(&self, uid: &UserId) -> usize {
        let matching: Vec<_> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.manager.current_uid().as_ref() == Some(uid))
            .map(|(id, entry)| (*id, Arc::clone(&entry.manager)))
            .collect();

        let mut blocked = Vec::new();
        for (id, manager) in &matching {
            match manager.refresh_authorization().await {
                Err(StorefrontError::AccountBlocked) => {
                    tracing::info!(user_id = %uid, session_id = %id, "Blocked session retired");
                    blocked.push(*id);
                }
                Err(err) => {
                    tracing::info!(user_id = %uid, error = %err, "Session authorization changed");
                }
                Ok(_) => {}
            }
        }

        if !blocked.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &blocked {
                if let Some(entry) = sessions.get_mut(id) {
                    entry.retired = true;
                }
            }
        }
        matching.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
