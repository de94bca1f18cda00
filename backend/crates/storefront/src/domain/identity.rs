//! Identity Provider
//!
//! Email/password and federated sign-in, account creation, sign-out and
//! password-reset dispatch. Session changes are published on a watch
//! channel; a new subscriber sees the current principal first.

use thiserror::Error;
use tokio::sync::watch;

use crate::domain::entity::principal::Principal;

/// Raw provider failure; classified by `AuthFailure::classify`
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider answered with an error code
    #[error("provider rejected request: {code} {message}")]
    Rejected { code: String, message: String },
    /// The request never got an answer
    #[error("transport failure: {0}")]
    Transport(String),
    /// The user abandoned a federated sign-in
    #[error("sign-in cancelled by user")]
    Cancelled,
    /// Anything else, e.g. an unreadable response
    #[error("unexpected provider response: {0}")]
    Unexpected(String),
}

/// Credential produced by a federated (e.g. Google) sign-in flow on the client
#[derive(Debug, Clone, Default)]
pub struct FederatedCredential {
    /// Provider id, e.g. `google.com`
    pub provider_id: String,
    /// `None` when the user closed the consent window
    pub id_token: Option<String>,
}

impl FederatedCredential {
    pub fn google(id_token: impl Into<String>) -> Self {
        Self {
            provider_id: "google.com".to_string(),
            id_token: Some(id_token.into()),
        }
    }
}

#[trait_variant::make(IdentityProvider: Send)]
pub trait LocalIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError>;

    async fn sign_in_with_federated(
        &self,
        credential: FederatedCredential,
    ) -> Result<Principal, ProviderError>;

    async fn create_account(&self, email: &str, password: &str)
    -> Result<Principal, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    /// Session-change notifications, current value first
    fn subscribe(&self) -> watch::Receiver<Option<Principal>>;

    /// The principal of the current provider session
    fn current_principal(&self) -> Option<Principal>;
}
