//! Principal Entity
//!
//! The identity provider's view of a signed-in user. Carries no
//! authorization data; that lives on the user record.

use kernel::id::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Stable provider-issued id, also the user record key
    pub uid: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
}

impl Principal {
    /// Principal with only an id and email
    pub fn new(uid: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
            display_name: None,
            photo_url: None,
            email_verified: false,
        }
    }
}
