//! In-Memory Document Store
//!
//! Used when no database is configured and as the store in tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use kernel::id::{CategoryId, ProductId, UserId};
use tokio::sync::RwLock;

use crate::domain::entity::{Category, Principal, Product, UserRecord};
use crate::domain::repository::{
    CategoryStore, Document, PagePosition, PagedCollection, ProductStore, UserStore,
};
use crate::domain::value_object::collection::Collection;
use crate::domain::value_object::user_role::UserRole;
use crate::error::{StorefrontError, StorefrontResult};

#[derive(Default)]
struct Collections {
    users: HashMap<String, UserRecord>,
    products: HashMap<String, Product>,
    categories: HashMap<String, Category>,
}

/// Cloneable handle; clones share the same data
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user record as-is, keeping its timestamps
    pub async fn seed_user(&self, record: UserRecord) {
        let mut data = self.inner.write().await;
        data.users.insert(record.id.as_str().to_string(), record);
    }

    /// Insert a product as-is, keeping its timestamps
    pub async fn seed_product(&self, product: Product) {
        let mut data = self.inner.write().await;
        data.products.insert(product.id.as_str().to_string(), product);
    }

    /// Insert a category as-is, keeping its timestamps
    pub async fn seed_category(&self, category: Category) {
        let mut data = self.inner.write().await;
        data.categories
            .insert(category.id.as_str().to_string(), category);
    }
}

/// Newest first, ties by id descending
fn newest_first<'a, T, I>(docs: I) -> Vec<T>
where
    T: Document + Clone + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut docs: Vec<T> = docs.cloned().collect();
    docs.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.document_id().cmp(a.document_id()))
    });
    docs
}

fn page_after<'a, T, I>(docs: I, after: Option<&PagePosition>, limit: usize) -> Vec<T>
where
    T: Document + Clone + 'a,
    I: Iterator<Item = &'a T>,
{
    newest_first(docs)
        .into_iter()
        .filter(|doc| after.is_none_or(|pos| pos.precedes(doc.created_at(), doc.document_id())))
        .take(limit)
        .collect()
}

impl PagedCollection<UserRecord> for MemoryDocumentStore {
    async fn fetch_after(
        &self,
        after: Option<&PagePosition>,
        limit: usize,
    ) -> StorefrontResult<Vec<UserRecord>> {
        let data = self.inner.read().await;
        Ok(page_after(data.users.values(), after, limit))
    }
}

impl PagedCollection<Product> for MemoryDocumentStore {
    async fn fetch_after(
        &self,
        after: Option<&PagePosition>,
        limit: usize,
    ) -> StorefrontResult<Vec<Product>> {
        let data = self.inner.read().await;
        Ok(page_after(data.products.values(), after, limit))
    }
}

impl PagedCollection<Category> for MemoryDocumentStore {
    async fn fetch_after(
        &self,
        after: Option<&PagePosition>,
        limit: usize,
    ) -> StorefrontResult<Vec<Category>> {
        let data = self.inner.read().await;
        Ok(page_after(data.categories.values(), after, limit))
    }
}

// ============================================================================
// User Store
// ============================================================================

impl UserStore for MemoryDocumentStore {
    async fn find_user(&self, id: &UserId) -> StorefrontResult<Option<UserRecord>> {
        let data = self.inner.read().await;
        Ok(data.users.get(id.as_str()).cloned())
    }

    async fn ensure_user(&self, principal: &Principal) -> StorefrontResult<UserRecord> {
        let mut data = self.inner.write().await;
        let now = Utc::now();

        let record = data
            .users
            .entry(principal.uid.as_str().to_string())
            .or_insert_with(|| {
                tracing::info!(user_id = %principal.uid, "Created user record");
                UserRecord::for_principal(principal, now)
            });

        if record.role.is_none() {
            record.role = Some(UserRole::User);
            record.updated_at = now;
        }

        Ok(record.clone())
    }

    async fn update_user(&self, record: &UserRecord) -> StorefrontResult<UserRecord> {
        let mut data = self.inner.write().await;
        let stored = data
            .users
            .get_mut(record.id.as_str())
            .ok_or_else(|| StorefrontError::not_found(Collection::Users, record.id.as_str()))?;

        let created_at = stored.created_at;
        *stored = UserRecord {
            created_at,
            updated_at: Utc::now(),
            ..record.clone()
        };
        Ok(stored.clone())
    }

    async fn list_users(&self) -> StorefrontResult<Vec<UserRecord>> {
        let data = self.inner.read().await;
        Ok(newest_first(data.users.values()))
    }
}

// ============================================================================
// Product Store
// ============================================================================

impl ProductStore for MemoryDocumentStore {
    async fn find_product(&self, id: &ProductId) -> StorefrontResult<Option<Product>> {
        let data = self.inner.read().await;
        Ok(data.products.get(id.as_str()).cloned())
    }

    async fn insert_product(&self, product: &Product) -> StorefrontResult<Product> {
        let mut data = self.inner.write().await;
        if data.products.contains_key(product.id.as_str()) {
            return Err(StorefrontError::Internal(format!(
                "duplicate product id {}",
                product.id
            )));
        }

        let now = Utc::now();
        let stored = Product {
            created_at: now,
            updated_at: now,
            ..product.clone()
        };
        data.products
            .insert(stored.id.as_str().to_string(), stored.clone());
        Ok(stored)
    }

    async fn update_product(&self, product: &Product) -> StorefrontResult<Product> {
        let mut data = self.inner.write().await;
        let stored = data
            .products
            .get_mut(product.id.as_str())
            .ok_or_else(|| StorefrontError::not_found(Collection::Products, product.id.as_str()))?;

        let created_at = stored.created_at;
        *stored = Product {
            created_at,
            updated_at: Utc::now(),
            ..product.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_product(&self, id: &ProductId) -> StorefrontResult<()> {
        let mut data = self.inner.write().await;
        data.products
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| StorefrontError::not_found(Collection::Products, id.as_str()))
    }

    async fn products_in_category(&self, category: &CategoryId) -> StorefrontResult<Vec<Product>> {
        let data = self.inner.read().await;
        Ok(newest_first(
            data.products.values().filter(|p| &p.category == category),
        ))
    }
}

// ============================================================================
// Category Store
// ============================================================================

impl CategoryStore for MemoryDocumentStore {
    async fn find_category(&self, id: &CategoryId) -> StorefrontResult<Option<Category>> {
        let data = self.inner.read().await;
        Ok(data.categories.get(id.as_str()).cloned())
    }

    async fn insert_category(&self, category: &Category) -> StorefrontResult<Category> {
        let mut data = self.inner.write().await;
        if data.categories.contains_key(category.id.as_str()) {
            return Err(StorefrontError::Internal(format!(
                "duplicate category id {}",
                category.id
            )));
        }

        let now = Utc::now();
        let stored = Category {
            created_at: now,
            updated_at: now,
            ..category.clone()
        };
        data.categories
            .insert(stored.id.as_str().to_string(), stored.clone());
        Ok(stored)
    }

    async fn update_category(&self, category: &Category) -> StorefrontResult<Category> {
        let mut data = self.inner.write().await;
        let stored = data.categories.get_mut(category.id.as_str()).ok_or_else(|| {
            StorefrontError::not_found(Collection::Categories, category.id.as_str())
        })?;

        let created_at = stored.created_at;
        *stored = Category {
            created_at,
            updated_at: Utc::now(),
            ..category.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_category(&self, id: &CategoryId) -> StorefrontResult<()> {
        let mut data = self.inner.write().await;
        data.categories
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| StorefrontError::not_found(Collection::Categories, id.as_str()))
    }

    async fn list_categories(&self) -> StorefrontResult<Vec<Category>> {
        let data = self.inner.read().await;
        Ok(newest_first(data.categories.values()))
    }
}
