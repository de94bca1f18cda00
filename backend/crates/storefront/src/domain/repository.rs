//! Repository Traits
//!
//! Interfaces of the document store. Implementations are in the
//! infrastructure layer.

use chrono::{DateTime, Utc};
use kernel::id::{CategoryId, ProductId, UserId};

use crate::domain::entity::{Category, Principal, Product, UserRecord};
use crate::domain::value_object::collection::Collection;
use crate::error::StorefrontResult;

/// A record that lives in one collection and can be paged through
pub trait Document: Send + Sync {
    const COLLECTION: Collection;

    fn document_id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    fn position(&self) -> PagePosition {
        PagePosition {
            created_at: self.created_at(),
            id: self.document_id().to_string(),
        }
    }
}

impl Document for Product {
    const COLLECTION: Collection = Collection::Products;

    fn document_id(&self) -> &str {
        self.id.as_str()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Document for Category {
    const COLLECTION: Collection = Collection::Categories;

    fn document_id(&self) -> &str {
        self.id.as_str()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Document for UserRecord {
    const COLLECTION: Collection = Collection::Users;

    fn document_id(&self) -> &str {
        self.id.as_str()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Position in the `(created_at DESC, id DESC)` ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePosition {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

impl PagePosition {
    /// Whether a document at (`created_at`, `id`) sorts strictly after this position
    pub fn precedes(&self, created_at: DateTime<Utc>, id: &str) -> bool {
        created_at < self.created_at || (created_at == self.created_at && id < self.id.as_str())
    }
}

/// Keyset paging primitive, newest first
#[trait_variant::make(PagedCollection: Send)]
pub trait LocalPagedCollection<T: Document> {
    /// Up to `limit` documents strictly after `after` (from the newest when `None`)
    async fn fetch_after(&self, after: Option<&PagePosition>, limit: usize)
    -> StorefrontResult<Vec<T>>;
}

/// User record store
#[trait_variant::make(UserStore: Send)]
pub trait LocalUserStore {
    /// Find user record by id
    async fn find_user(&self, id: &UserId) -> StorefrontResult<Option<UserRecord>>;

    /// Load the record for a principal, creating it when absent.
    ///
    /// A new record gets role `user`; a missing role is filled with `user`.
    /// An existing role is never overwritten.
    async fn ensure_user(&self, principal: &Principal) -> StorefrontResult<UserRecord>;

    /// Replace a record; `NotFound` if absent
    async fn update_user(&self, record: &UserRecord) -> StorefrontResult<UserRecord>;

    /// Every user record, newest first
    async fn list_users(&self) -> StorefrontResult<Vec<UserRecord>>;
}

/// Product store
#[trait_variant::make(ProductStore: Send)]
pub trait LocalProductStore {
    async fn find_product(&self, id: &ProductId) -> StorefrontResult<Option<Product>>;

    /// Insert a new product; timestamps are set by the store
    async fn insert_product(&self, product: &Product) -> StorefrontResult<Product>;

    /// Replace a product; `NotFound` if absent
    async fn update_product(&self, product: &Product) -> StorefrontResult<Product>;

    /// Delete a product; `NotFound` if absent
    async fn delete_product(&self, id: &ProductId) -> StorefrontResult<()>;

    /// Products of one category, newest first
    async fn products_in_category(&self, category: &CategoryId)
    -> StorefrontResult<Vec<Product>>;
}

/// Category store
#[trait_variant::make(CategoryStore: Send)]
pub trait LocalCategoryStore {
    async fn find_category(&self, id: &CategoryId) -> StorefrontResult<Option<Category>>;

    async fn insert_category(&self, category: &Category) -> StorefrontResult<Category>;

    async fn update_category(&self, category: &Category) -> StorefrontResult<Category>;

    async fn delete_category(&self, id: &CategoryId) -> StorefrontResult<()>;

    /// Every category, newest first
    async fn list_categories(&self) -> StorefrontResult<Vec<Category>>;
}

/// Everything the storefront needs from one document store
pub trait DocumentStore:
    UserStore
    + ProductStore
    + CategoryStore
    + PagedCollection<UserRecord>
    + PagedCollection<Product>
    + PagedCollection<Category>
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<S> DocumentStore for S where
    S: UserStore
        + ProductStore
        + CategoryStore
        + PagedCollection<UserRecord>
        + PagedCollection<Product>
        + PagedCollection<Category>
        + Clone
        + Send
        + Sync
        + 'static
{
}
