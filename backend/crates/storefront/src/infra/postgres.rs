//! PostgreSQL Document Store

use chrono::{DateTime, Utc};
use kernel::id::{CategoryId, ProductId, UserId};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::domain::entity::{Address, Category, Principal, Product, ProductImage, UserRecord};
use crate::domain::repository::{
    CategoryStore, PagePosition, PagedCollection, ProductStore, UserStore,
};
use crate::domain::value_object::collection::Collection;
use crate::domain::value_object::user_role::UserRole;
use crate::error::{StorefrontError, StorefrontResult};

/// PostgreSQL-backed store for users, products and categories
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connectivity check for readiness
    pub async fn ping(&self) -> StorefrontResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Split a keyset position into query binds
fn keyset(after: Option<&PagePosition>) -> (Option<DateTime<Utc>>, Option<String>) {
    match after {
        Some(pos) => (Some(pos.created_at), Some(pos.id.clone())),
        None => (None, None),
    }
}

fn limit_of(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

// ============================================================================
// User Store
// ============================================================================

impl UserStore for PgDocumentStore {
    async fn find_user(&self, id: &UserId) -> StorefrontResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                email,
                role,
                blocked,
                display_name,
                phone_number,
                photo_url,
                address,
                created_at,
                updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_record).transpose()
    }

    async fn ensure_user(&self, principal: &Principal) -> StorefrontResult<UserRecord> {
        let now = Utc::now();

        // An existing role is kept; only a missing one is filled in
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (
                id,
                email,
                role,
                blocked,
                display_name,
                photo_url,
                created_at,
                updated_at
            ) VALUES ($1, $2, 'user', FALSE, $3, $4, $5, $5)
            ON CONFLICT (id) DO UPDATE SET
                role = COALESCE(users.role, 'user'),
                updated_at = CASE
                    WHEN users.role IS NULL THEN EXCLUDED.updated_at
                    ELSE users.updated_at
                END
            RETURNING
                id,
                email,
                role,
                blocked,
                display_name,
                phone_number,
                photo_url,
                address,
                created_at,
                updated_at
            "#,
        )
        .bind(principal.uid.as_str())
        .bind(principal.email.as_deref())
        .bind(principal.display_name.as_deref())
        .bind(principal.photo_url.as_deref())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row.into_record()
    }

    async fn update_user(&self, record: &UserRecord) -> StorefrontResult<UserRecord> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                email = $2,
                role = $3,
                blocked = $4,
                display_name = $5,
                phone_number = $6,
                photo_url = $7,
                address = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING
                id,
                email,
                role,
                blocked,
                display_name,
                phone_number,
                photo_url,
                address,
                created_at,
                updated_at
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.email.as_deref())
        .bind(record.role.map(|role| role.code()))
        .bind(record.blocked)
        .bind(record.display_name.as_deref())
        .bind(record.phone_number.as_deref())
        .bind(record.photo_url.as_deref())
        .bind(record.address.as_ref().map(Json))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorefrontError::not_found(Collection::Users, record.id.as_str()))?
            .into_record()
    }

    async fn list_users(&self) -> StorefrontResult<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                email,
                role,
                blocked,
                display_name,
                phone_number,
                photo_url,
                address,
                created_at,
                updated_at
            FROM users
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_record).collect()
    }
}

impl PagedCollection<UserRecord> for PgDocumentStore {
    async fn fetch_after(
        &self,
        after: Option<&PagePosition>,
        limit: usize,
    ) -> StorefrontResult<Vec<UserRecord>> {
        let (created_at, id) = keyset(after);

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                email,
                role,
                blocked,
                display_name,
                phone_number,
                photo_url,
                address,
                created_at,
                updated_at
            FROM users
            WHERE $1::timestamptz IS NULL OR (created_at, id) < ($1, $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(created_at)
        .bind(id)
        .bind(limit_of(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_record).collect()
    }
}

// ============================================================================
// Product Store
// ============================================================================

impl ProductStore for PgDocumentStore {
    async fn find_product(&self, id: &ProductId) -> StorefrontResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT
                id,
                name,
                description,
                price,
                stock,
                category_id,
                images,
                features,
                listed,
                created_at,
                updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductRow::into_product).transpose()
    }

    async fn insert_product(&self, product: &Product) -> StorefrontResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (
                id,
                name,
                description,
                price,
                stock,
                category_id,
                images,
                features,
                listed,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING
                id,
                name,
                description,
                price,
                stock,
                category_id,
                images,
                features,
                listed,
                created_at,
                updated_at
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(i64::from(product.stock))
        .bind(product.category.as_str())
        .bind(Json(&product.images))
        .bind(Json(&product.features))
        .bind(product.listed)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row.into_product()
    }

    async fn update_product(&self, product: &Product) -> StorefrontResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products SET
                name = $2,
                description = $3,
                price = $4,
                stock = $5,
                category_id = $6,
                images = $7,
                features = $8,
                listed = $9,
                updated_at = $10
            WHERE id = $1
            RETURNING
                id,
                name,
                description,
                price,
                stock,
                category_id,
                images,
                features,
                listed,
                created_at,
                updated_at
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(i64::from(product.stock))
        .bind(product.category.as_str())
        .bind(Json(&product.images))
        .bind(Json(&product.features))
        .bind(product.listed)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorefrontError::not_found(Collection::Products, product.id.as_str()))?
            .into_product()
    }

    async fn delete_product(&self, id: &ProductId) -> StorefrontResult<()> {
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StorefrontError::not_found(Collection::Products, id.as_str()));
        }
        Ok(())
    }

    async fn products_in_category(&self, category: &CategoryId) -> StorefrontResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT
                id,
                name,
                description,
                price,
                stock,
                category_id,
                images,
                features,
                listed,
                created_at,
                updated_at
            FROM products
            WHERE category_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }
}

impl PagedCollection<Product> for PgDocumentStore {
    async fn fetch_after(
        &self,
        after: Option<&PagePosition>,
        limit: usize,
    ) -> StorefrontResult<Vec<Product>> {
        let (created_at, id) = keyset(after);

        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT
                id,
                name,
                description,
                price,
                stock,
                category_id,
                images,
                features,
                listed,
                created_at,
                updated_at
            FROM products
            WHERE $1::timestamptz IS NULL OR (created_at, id) < ($1, $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(created_at)
        .bind(id)
        .bind(limit_of(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }
}

// ============================================================================
// Category Store
// ============================================================================

impl CategoryStore for PgDocumentStore {
    async fn find_category(&self, id: &CategoryId) -> StorefrontResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, description, is_active, created_at, updated_at
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CategoryRow::into_category))
    }

    async fn insert_category(&self, category: &Category) -> StorefrontResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (id, name, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, name, description, is_active, created_at, updated_at
            "#,
        )
        .bind(category.id.as_str())
        .bind(&category.name)
        .bind(category.description.as_deref())
        .bind(category.is_active)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_category())
    }

    async fn update_category(&self, category: &Category) -> StorefrontResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            UPDATE categories SET
                name = $2,
                description = $3,
                is_active = $4,
                updated_at = $5
            WHERE id = $1
            RETURNING id, name, description, is_active, created_at, updated_at
            "#,
        )
        .bind(category.id.as_str())
        .bind(&category.name)
        .bind(category.description.as_deref())
        .bind(category.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CategoryRow::into_category).ok_or_else(|| {
            StorefrontError::not_found(Collection::Categories, category.id.as_str())
        })
    }

    async fn delete_category(&self, id: &CategoryId) -> StorefrontResult<()> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StorefrontError::not_found(Collection::Categories, id.as_str()));
        }
        Ok(())
    }

    async fn list_categories(&self) -> StorefrontResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, description, is_active, created_at, updated_at
            FROM categories
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CategoryRow::into_category).collect())
    }
}

impl PagedCollection<Category> for PgDocumentStore {
    async fn fetch_after(
        &self,
        after: Option<&PagePosition>,
        limit: usize,
    ) -> StorefrontResult<Vec<Category>> {
        let (created_at, id) = keyset(after);

        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, description, is_active, created_at, updated_at
            FROM categories
            WHERE $1::timestamptz IS NULL OR (created_at, id) < ($1, $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(created_at)
        .bind(id)
        .bind(limit_of(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CategoryRow::into_category).collect())
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: Option<String>,
    role: Option<String>,
    blocked: bool,
    display_name: Option<String>,
    phone_number: Option<String>,
    photo_url: Option<String>,
    address: Option<Json<Address>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_record(self) -> StorefrontResult<UserRecord> {
        let role = match self.role.as_deref() {
            None => None,
            Some(code) => Some(UserRole::from_code(code).ok_or_else(|| {
                StorefrontError::CorruptDocument {
                    collection: Collection::Users,
                    id: self.id.clone(),
                    reason: format!("unknown role {code:?}"),
                }
            })?),
        };

        Ok(UserRecord {
            id: UserId::new(self.id),
            email: self.email,
            role,
            blocked: self.blocked,
            display_name: self.display_name,
            phone_number: self.phone_number,
            photo_url: self.photo_url,
            address: self.address.map(|Json(address)| address),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    description: String,
    price: f64,
    stock: i64,
    category_id: String,
    images: Json<Vec<ProductImage>>,
    features: Json<Vec<String>>,
    listed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> StorefrontResult<Product> {
        let stock = u32::try_from(self.stock).map_err(|_| StorefrontError::CorruptDocument {
            collection: Collection::Products,
            id: self.id.clone(),
            reason: format!("stock out of range: {}", self.stock),
        })?;

        Ok(Product {
            id: ProductId::new(self.id),
            name: self.name,
            description: self.description,
            price: self.price,
            stock,
            category: CategoryId::new(self.category_id),
            images: self.images.0,
            features: self.features.0,
            listed: self.listed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRow {
    fn into_category(self) -> Category {
        Category {
            id: CategoryId::new(self.id),
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
