//! User Administration
//!
//! Back-office operations on user records. A role is only ever changed
//! here; sign-in never overwrites one.

use std::sync::Arc;

use kernel::id::UserId;
use kernel::page::{Cursor, Page};
use serde::{Deserialize, Serialize};

use crate::application::pagination::PaginatedReader;
use crate::application::validation::validate_address;
use crate::domain::entity::{Address, ProfilePatch, UserRecord};
use crate::domain::repository::{PagedCollection, UserStore};
use crate::domain::value_object::collection::Collection;
use crate::domain::value_object::user_role::UserRole;
use crate::error::{StorefrontError, StorefrontResult};

pub struct UserAdminService<S> {
    store: Arc<S>,
}

impl<S> UserAdminService<S>
where
    S: UserStore + PagedCollection<UserRecord>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &UserId) -> StorefrontResult<UserRecord> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found(Collection::Users, id.as_str()))
    }

    pub async fn list(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> StorefrontResult<Page<UserRecord>> {
        PaginatedReader::new(Arc::clone(&self.store))
            .read::<UserRecord>(page_size, cursor)
            .await
    }

    /// Flip `blocked`; returns the updated record
    pub async fn toggle_blocked(&self, id: &UserId) -> StorefrontResult<UserRecord> {
        let mut record = self.get(id).await?;
        record.blocked = !record.blocked;

        let record = self.store.update_user(&record).await?;
        if record.blocked {
            tracing::warn!(user_id = %id, "User blocked");
        } else {
            tracing::info!(user_id = %id, "User unblocked");
        }
        Ok(record)
    }

    pub async fn set_role(&self, id: &UserId, role: UserRole) -> StorefrontResult<UserRecord> {
        let mut record = self.get(id).await?;
        let previous = record.role;
        record.role = Some(role);

        let record = self.store.update_user(&record).await?;
        tracing::info!(
            user_id = %id,
            from = previous.map(|r| r.code()),
            to = role.code(),
            "User role changed"
        );
        Ok(record)
    }

    pub async fn update_address(&self, id: &UserId, address: Address) -> StorefrontResult<UserRecord> {
        validate_address(&address)?;

        let mut record = self.get(id).await?;
        record.address = Some(address);

        let record = self.store.update_user(&record).await?;
        tracing::info!(user_id = %id, "User address updated");
        Ok(record)
    }

    pub async fn update_profile(&self, id: &UserId, patch: ProfilePatch) -> StorefrontResult<UserRecord> {
        if patch.is_empty() {
            return Err(StorefrontError::EmptyUpdate);
        }

        let mut record = self.get(id).await?;
        patch.apply(&mut record);

        let record = self.store.update_user(&record).await?;
        tracing::info!(user_id = %id, "User profile updated");
        Ok(record)
    }

    pub async fn summary(&self) -> StorefrontResult<UserSummary> {
        Ok(UserSummary::of(&self.store.list_users().await?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Blocked,
}

/// Admin table filter over loaded records
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
}

impl UserFilter {
    pub fn matches(&self, user: &UserRecord) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Active => !user.blocked,
            StatusFilter::Blocked => user.blocked,
        };

        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [user.email.as_deref(), user.display_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&term))
            }
        };

        status_ok && search_ok
    }

    pub fn apply(&self, users: Vec<UserRecord>) -> Vec<UserRecord> {
        users.into_iter().filter(|user| self.matches(user)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub total: usize,
    pub active: usize,
    pub blocked: usize,
    pub admins: usize,
}

impl UserSummary {
    pub fn of(users: &[UserRecord]) -> Self {
        let blocked = users.iter().filter(|u| u.blocked).count();
        Self {
            total: users.len(),
            active: users.len() - blocked,
            blocked,
            admins: users.iter().filter(|u| u.is_admin()).count(),
        }
    }
}
