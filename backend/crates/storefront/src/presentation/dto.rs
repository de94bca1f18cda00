//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::domain::entity::{AuthState, Principal, Product};
use crate::domain::identity::FederatedCredential;
use crate::domain::value_object::user_role::UserRole;
use crate::error::ErrorInfo;

// ============================================================================
// Auth
// ============================================================================

/// Federated sign-in request; `idToken` is absent when the user closed the
/// consent window
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedLoginRequest {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default)]
    pub id_token: Option<String>,
}

fn default_provider_id() -> String {
    "google.com".to_string()
}

impl From<FederatedLoginRequest> for FederatedCredential {
    fn from(req: FederatedLoginRequest) -> Self {
        FederatedCredential {
            provider_id: req.provider_id,
            id_token: req.id_token.filter(|token| !token.is_empty()),
        }
    }
}

/// Session snapshot returned by every auth endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub is_admin: bool,
    pub is_initializing: bool,
    pub is_loading: bool,
    pub user: Option<Principal>,
    pub role: Option<UserRole>,
    pub last_error: Option<ErrorInfo>,
}

impl From<AuthState> for AuthStatusResponse {
    fn from(state: AuthState) -> Self {
        Self {
            authenticated: state.is_authenticated(),
            is_admin: state.is_admin(),
            is_initializing: state.is_initializing,
            is_loading: state.is_loading,
            user: state.identity,
            role: state.role,
            last_error: state.last_error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Listing
// ============================================================================

/// Cursor and page size shared by every listing endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// Product detail with same-category recommendations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailResponse {
    pub product: Product,
    pub recommended: Vec<Product>,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RoleChangeRequest {
    pub role: UserRole,
}

