//! User Record Entity
//!
//! The persisted authorization and profile record, keyed by principal id.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use serde::{Deserialize, Serialize};

use crate::domain::entity::principal::Principal;
use crate::domain::value_object::user_role::UserRole;

/// Shipping address kept on the user record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub full_name: String,
    pub phone: String,
    #[serde(rename = "address")]
    pub street_address: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "pincode")]
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub email: Option<String>,
    /// `None` for records written before roles existed; read as `User`
    pub role: Option<UserRole>,
    pub blocked: bool,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// First record for a principal: role `user`, not blocked
    pub fn for_principal(principal: &Principal, now: DateTime<Utc>) -> Self {
        Self {
            id: principal.uid.clone(),
            email: principal.email.clone(),
            role: Some(UserRole::User),
            blocked: false,
            display_name: principal.display_name.clone(),
            phone_number: None,
            photo_url: principal.photo_url.clone(),
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Role with the absent case resolved
    pub fn effective_role(&self) -> UserRole {
        self.role.unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.effective_role().is_admin()
    }
}

/// Self-service profile edits
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.phone_number.is_none() && self.photo_url.is_none()
    }

    pub fn apply(self, record: &mut UserRecord) {
        if let Some(name) = self.display_name {
            record.display_name = Some(name);
        }
        if let Some(phone) = self.phone_number {
            record.phone_number = Some(phone);
        }
        if let Some(url) = self.photo_url {
            record.photo_url = Some(url);
        }
    }
}
