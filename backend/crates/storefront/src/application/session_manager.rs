//! Session Manager
//!
//! Owns the `AuthState` of one session. A background listener follows the
//! identity provider's session changes and resolves role and block status
//! from the user store; explicit operations (login, signup, logout, password
//! reset, authorization refresh) run alongside it.
//!
//! Every transition carries a generation number. A transition is applied only
//! if its generation is at least the last applied one, so a slow resolution
//! can never overwrite a newer one. Mutation of the state is serialized by the
//! ledger mutex; the listener never waits for an operation to finish.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};

use kernel::id::UserId;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::domain::entity::{AuthState, Principal};
use crate::domain::identity::{FederatedCredential, IdentityProvider};
use crate::domain::repository::UserStore;
use crate::domain::value_object::user_role::UserRole;
use crate::error::{StorefrontError, StorefrontResult};

/// Outcome of resolving one principal against the user store
enum Resolution {
    Anonymous,
    Authenticated(Principal, UserRole),
    /// Lookup failed: signed in with the default role
    Degraded(Principal, StorefrontError),
    /// Record is blocked: provider session already ended
    Blocked,
}

struct Ledger {
    state: AuthState,
    applied: u64,
    in_flight: u32,
}

pub struct SessionManager<P, U> {
    provider: Arc<P>,
    users: Arc<U>,
    ledger: Mutex<Ledger>,
    published: watch::Sender<AuthState>,
    generation: AtomicU64,
    listener: StdMutex<Option<JoinHandle<()>>>,
}

impl<P, U> SessionManager<P, U>
where
    P: IdentityProvider + Send + Sync + 'static,
    U: UserStore + Send + Sync + 'static,
{
    /// Construct the manager and subscribe to the provider's session changes.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(provider: Arc<P>, users: Arc<U>) -> Arc<Self> {
        let (published, _) = watch::channel(AuthState::initializing());
        let notifications = provider.subscribe();

        let manager = Arc::new(Self {
            provider,
            users,
            ledger: Mutex::new(Ledger {
                state: AuthState::initializing(),
                applied: 0,
                in_flight: 0,
            }),
            published,
            generation: AtomicU64::new(0),
            listener: StdMutex::new(None),
        });

        let handle = tokio::spawn(Self::listen(Arc::downgrade(&manager), notifications));
        if let Ok(mut slot) = manager.listener.lock() {
            *slot = Some(handle);
        }

        manager
    }

    async fn listen(weak: Weak<Self>, mut notifications: watch::Receiver<Option<Principal>>) {
        loop {
            let principal = notifications.borrow_and_update().clone();
            let Some(manager) = weak.upgrade() else {
                break;
            };
            manager.on_session_change(principal).await;
            drop(manager);

            if notifications.changed().await.is_err() {
                break;
            }
        }
    }

    async fn on_session_change(&self, principal: Option<Principal>) {
        let generation = self.next_generation();
        tracing::debug!(
            generation,
            user_id = principal.as_ref().map(|p| p.uid.as_str()),
            "Session change"
        );
        let resolution = self.resolve(principal).await;
        self.apply(generation, &resolution).await;
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn resolve(&self, principal: Option<Principal>) -> Resolution {
        let Some(principal) = principal else {
            return Resolution::Anonymous;
        };

        match self.users.ensure_user(&principal).await {
            Err(err) => {
                tracing::error!(
                    user_id = %principal.uid,
                    error = %err,
                    "User record lookup failed, continuing with default role"
                );
                Resolution::Degraded(principal, err)
            }
            Ok(record) if record.blocked => {
                tracing::warn!(user_id = %principal.uid, "Blocked account signed in, ending session");
                if let Err(err) = self.provider.sign_out().await {
                    tracing::error!(user_id = %principal.uid, error = %err, "Forced sign-out failed");
                }
                Resolution::Blocked
            }
            Ok(record) => Resolution::Authenticated(principal, record.effective_role()),
        }
    }

    /// Apply a transition unless a newer one is already applied
    async fn apply(&self, generation: u64, resolution: &Resolution) -> bool {
        let mut ledger = self.ledger.lock().await;
        if generation < ledger.applied {
            tracing::warn!(
                generation,
                applied = ledger.applied,
                "Dropping stale session transition"
            );
            return false;
        }
        ledger.applied = generation;

        let state = &mut ledger.state;
        match resolution {
            Resolution::Anonymous => state.set_identity(None, None),
            Resolution::Authenticated(principal, role) => {
                state.set_identity(Some(principal.clone()), Some(*role));
            }
            Resolution::Degraded(principal, err) => {
                state.set_identity(Some(principal.clone()), Some(UserRole::User));
                state.last_error = Some(err.info());
            }
            Resolution::Blocked => {
                state.set_identity(None, None);
                state.last_error = Some(StorefrontError::AccountBlocked.info());
            }
        }
        state.is_initializing = false;

        self.published.send_replace(state.clone());
        true
    }

    async fn begin(&self) {
        let mut ledger = self.ledger.lock().await;
        ledger.in_flight += 1;
        ledger.state.is_loading = true;
        ledger.state.last_error = None;
        self.published.send_replace(ledger.state.clone());
    }

    async fn finish(&self, error: Option<&StorefrontError>) {
        let mut ledger = self.ledger.lock().await;
        ledger.in_flight = ledger.in_flight.saturating_sub(1);
        ledger.state.is_loading = ledger.in_flight > 0;
        if let Some(err) = error {
            ledger.state.last_error = Some(err.info());
        }
        self.published.send_replace(ledger.state.clone());
    }

    /// Run an explicit operation: loading flag on, error cleared, result latched
    async fn run<T>(&self, operation: impl Future<Output = StorefrontResult<T>>) -> StorefrontResult<T> {
        self.begin().await;
        let result = operation.await;
        self.finish(result.as_ref().err()).await;
        result
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Email/password sign-in. The state transition follows from the
    /// provider's session-change notification.
    pub async fn login(&self, email: &str, password: &str) -> StorefrontResult<Principal> {
        self.run(async {
            self.provider
                .sign_in_with_password(email, password)
                .await
                .map_err(StorefrontError::from)
                .inspect(|principal| {
                    tracing::info!(user_id = %principal.uid, "Signed in with password");
                })
        })
        .await
    }

    /// Federated sign-in
    pub async fn login_with_provider(
        &self,
        credential: FederatedCredential,
    ) -> StorefrontResult<Principal> {
        let provider_id = credential.provider_id.clone();
        self.run(async {
            self.provider
                .sign_in_with_federated(credential)
                .await
                .map_err(StorefrontError::from)
                .inspect(|principal| {
                    tracing::info!(
                        user_id = %principal.uid,
                        provider = %provider_id,
                        "Signed in with federated provider"
                    );
                })
        })
        .await
    }

    /// Create an account. The user record is created by the resolution of
    /// the session change this triggers.
    pub async fn signup(&self, email: &str, password: &str) -> StorefrontResult<Principal> {
        self.run(async {
            self.provider
                .create_account(email, password)
                .await
                .map_err(StorefrontError::from)
                .inspect(|principal| {
                    tracing::info!(user_id = %principal.uid, "Account created");
                })
        })
        .await
    }

    /// Sign out. Identity is cleared immediately; the provider's notification
    /// confirms it. A newer notification always wins over the local clear.
    pub async fn logout(&self) -> StorefrontResult<()> {
        self.run(async {
            let generation = self.generation.load(Ordering::SeqCst);
            self.apply(generation, &Resolution::Anonymous).await;

            match self.provider.sign_out().await {
                Ok(()) => {
                    tracing::info!("Signed out");
                    Ok(())
                }
                Err(err) => {
                    // The provider session is still alive: converge back to it.
                    let generation = self.next_generation();
                    let resolution = self.resolve(self.provider.current_principal()).await;
                    self.apply(generation, &resolution).await;
                    Err(StorefrontError::from(err))
                }
            }
        })
        .await
    }

    /// Ask the provider to email a password-reset link
    pub async fn reset_password(&self, email: &str) -> StorefrontResult<()> {
        self.run(async {
            self.provider
                .send_password_reset(email)
                .await
                .map_err(StorefrontError::from)
                .inspect(|()| tracing::info!("Password reset email requested"))
        })
        .await
    }

    /// Re-read the user record of the current identity and apply the
    /// blocked-account policy
    pub async fn refresh_authorization(&self) -> StorefrontResult<AuthState> {
        self.run(async {
            let generation = self.next_generation();
            let resolution = self.resolve(self.provider.current_principal()).await;
            self.apply(generation, &resolution).await;

            match resolution {
                Resolution::Blocked => Err(StorefrontError::AccountBlocked),
                Resolution::Degraded(_, err) => Err(err),
                Resolution::Anonymous | Resolution::Authenticated(..) => Ok(()),
            }
        })
        .await?;

        Ok(self.state())
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Current snapshot
    pub fn state(&self) -> AuthState {
        self.published.borrow().clone()
    }

    /// Every published state change, current value first
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.published.subscribe()
    }

    /// User id of this session, from the state or the provider
    pub fn current_uid(&self) -> Option<UserId> {
        self.published
            .borrow()
            .identity
            .as_ref()
            .map(|principal| principal.uid.clone())
            .or_else(|| self.provider.current_principal().map(|principal| principal.uid))
    }

    /// Wait for the first resolution
    pub async fn initialized(&self) -> AuthState {
        let mut states = self.published.subscribe();
        match states.wait_for(|state| !state.is_initializing).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Wait until the published state reflects the provider's current session
    pub async fn synchronized(&self) -> AuthState {
        let mut states = self.published.subscribe();
        let provider = Arc::clone(&self.provider);
        let reached = states
            .wait_for(|state| reflects(state, provider.current_principal().as_ref()))
            .await;
        match reached {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

fn reflects(state: &AuthState, current: Option<&Principal>) -> bool {
    if state.is_initializing {
        return false;
    }
    match (current, state.identity.as_ref()) {
        (None, None) => true,
        (Some(current), Some(identity)) => current.uid == identity.uid,
        // Blocked accounts whose forced sign-out failed stay anonymous
        (Some(_), None) => state
            .last_error
            .as_ref()
            .is_some_and(|err| err.code == StorefrontError::AccountBlocked.code()),
        (None, Some(_)) => false,
    }
}

impl<P, U> Drop for SessionManager<P, U> {
    fn drop(&mut self) {
        if let Ok(slot) = self.listener.get_mut() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}
