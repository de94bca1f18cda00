//! Identity Toolkit REST Client
//!
//! Email/password and federated sign-in against the Identity Toolkit
//! `accounts:*` endpoints. Each client instance holds one provider session;
//! sign-out is local and simply forgets it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::application::config::IdentityToolkitConfig;
use crate::domain::entity::Principal;
use crate::domain::identity::{FederatedCredential, IdentityProvider, ProviderError};

/// Identity provider backed by the Identity Toolkit REST API
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    config: Arc<IdentityToolkitConfig>,
    session: watch::Sender<Option<Principal>>,
}

impl IdentityToolkitClient {
    pub fn new(http: reqwest::Client, config: Arc<IdentityToolkitConfig>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            http,
            config,
            session,
        }
    }

    /// A client with its own, empty session sharing this one's connection pool
    pub fn fork(&self) -> Self {
        Self::new(self.http.clone(), Arc::clone(&self.config))
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.config.base_url.trim_end_matches('/'),
            method,
            self.config.api_key
        )
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(rejection(status.as_u16(), &text));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::Unexpected(format!("{method}: {e}")))
    }

    /// Fill profile fields the sign-in response leaves out. Failure keeps
    /// what the sign-in returned.
    async fn complete(&self, account: AccountResponse) -> Result<Principal, ProviderError> {
        let Some(id_token) = account.id_token.clone() else {
            return account.into_principal();
        };

        let request = LookupRequest {
            id_token: &id_token,
        };
        match self.call::<_, LookupResponse>("lookup", &request).await {
            Ok(lookup) => match lookup.users.into_iter().find(|u| u.local_id == account.local_id) {
                Some(full) => full.into_principal(),
                None => account.into_principal(),
            },
            Err(err) => {
                tracing::debug!(error = %err, "Account lookup failed, using sign-in response");
                account.into_principal()
            }
        }
    }

    fn establish(&self, principal: Principal) -> Principal {
        self.session.send_replace(Some(principal.clone()));
        principal
    }
}

/// Map an error response to `Rejected` using its `error.message` code
/// Form-encoded `postBody` of a `signInWithIdp` request
fn idp_post_body(id_token: &str, provider_id: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id_token", id_token)
        .append_pair("providerId", provider_id)
        .finish()
}

fn rejection(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ProviderError::Rejected {
            code: envelope.error.message.clone(),
            message: envelope.error.message,
        },
        Err(_) => ProviderError::Unexpected(format!("HTTP {status}: {body}")),
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

impl AccountResponse {
    fn into_principal(self) -> Result<Principal, ProviderError> {
        if self.local_id.is_empty() {
            return Err(ProviderError::Unexpected("response without localId".into()));
        }
        Ok(Principal {
            uid: self.local_id.into(),
            email: self.email,
            display_name: self.display_name.filter(|name| !name.is_empty()),
            photo_url: self.photo_url.filter(|url| !url.is_empty()),
            email_verified: self.email_verified,
        })
    }
}

#[derive(Deserialize)]
struct EmptyResponse {}

impl IdentityProvider for IdentityToolkitClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, ProviderError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signInWithPassword", &request).await?;
        let principal = self.complete(account).await?;
        Ok(self.establish(principal))
    }

    async fn sign_in_with_federated(
        &self,
        credential: FederatedCredential,
    ) -> Result<Principal, ProviderError> {
        let Some(id_token) = credential.id_token else {
            return Err(ProviderError::Cancelled);
        };

        let request = IdpRequest {
            post_body: idp_post_body(&id_token, &credential.provider_id),
            request_uri: "http://localhost",
            return_secure_token: true,
            return_idp_credential: true,
        };
        let account: AccountResponse = self.call("signInWithIdp", &request).await?;
        Ok(self.establish(account.into_principal()?))
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Principal, ProviderError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account: AccountResponse = self.call("signUp", &request).await?;
        let principal = self.complete(account).await?;
        Ok(self.establish(principal))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.session.send_replace(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let request = OobRequest {
            request_type: "PASSWORD_RESET",
            email,
        };
        let _: EmptyResponse = self.call("sendOobCode", &request).await?;
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.session.subscribe()
    }

    fn current_principal(&self) -> Option<Principal> {
        self.session.borrow().clone()
    }
}
