//! Product Management and Catalog
//!
//! Admin CRUD over products plus the in-memory catalog operations
//! (filtering, sorting, recommendations) used by the public pages.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use kernel::id::{CategoryId, ProductId};
use kernel::page::{Cursor, Page};
use serde::Deserialize;

use crate::application::config::StorefrontConfig;
use crate::application::pagination::PaginatedReader;
use crate::application::validation::{validate_product_draft, validate_product_patch};
use crate::domain::entity::{Product, ProductDraft, ProductImage, ProductPatch};
use crate::domain::image_host::{ImageHost, extract_public_id};
use crate::domain::repository::{PagedCollection, ProductStore};
use crate::domain::value_object::collection::Collection;
use crate::error::{StorefrontError, StorefrontResult};

/// Product service
pub struct ProductService<S, I> {
    store: Arc<S>,
    images: Arc<I>,
    config: Arc<StorefrontConfig>,
}

impl<S, I> ProductService<S, I>
where
    S: ProductStore + PagedCollection<Product>,
    I: ImageHost,
{
    pub fn new(store: Arc<S>, images: Arc<I>, config: Arc<StorefrontConfig>) -> Self {
        Self {
            store,
            images,
            config,
        }
    }

    pub async fn get(&self, id: &ProductId) -> StorefrontResult<Product> {
        self.store
            .find_product(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found(Collection::Products, id.as_str()))
    }

    /// One page, newest first
    pub async fn list(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> StorefrontResult<Page<Product>> {
        PaginatedReader::new(Arc::clone(&self.store))
            .read::<Product>(page_size, cursor)
            .await
    }

    pub async fn create(&self, draft: ProductDraft) -> StorefrontResult<Product> {
        let stock = validate_product_draft(&draft, &self.config)?;

        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            name: draft.name.trim().to_string(),
            description: draft.description.trim().to_string(),
            price: draft.price,
            stock,
            category: CategoryId::new(draft.category.trim()),
            images: draft.images,
            features: clean_features(draft.features),
            listed: draft.listed.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let product = self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, category = %product.category, "Product created");
        Ok(product)
    }

    /// Apply a partial update. Images dropped by the patch are removed from
    /// the image host after the write; failures there are logged only.
    pub async fn update(&self, id: &ProductId, patch: ProductPatch) -> StorefrontResult<Product> {
        if patch.is_empty() {
            return Err(StorefrontError::EmptyUpdate);
        }
        let stock = validate_product_patch(&patch, &self.config)?;

        let mut product = self.get(id).await?;
        let mut removed = Vec::new();

        if let Some(name) = patch.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(stock) = stock {
            product.stock = stock;
        }
        if let Some(category) = patch.category {
            product.category = CategoryId::new(category.trim());
        }
        if let Some(images) = patch.images {
            removed = product
                .images
                .iter()
                .filter(|old| !images.iter().any(|new| new.url == old.url))
                .cloned()
                .collect();
            product.images = images;
        }
        if let Some(features) = patch.features {
            product.features = clean_features(features);
        }
        if let Some(listed) = patch.listed {
            product.listed = listed;
        }

        let product = self.store.update_product(&product).await?;
        tracing::info!(product_id = %product.id, images_removed = removed.len(), "Product updated");

        self.discard_images(&removed).await;
        Ok(product)
    }

    /// Delete the record, then its images
    pub async fn delete(&self, id: &ProductId) -> StorefrontResult<()> {
        let product = self.get(id).await?;
        self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, "Product deleted");

        self.discard_images(&product.images).await;
        Ok(())
    }

    /// Flip `listed`; the record is never deleted
    pub async fn toggle_listing(&self, id: &ProductId) -> StorefrontResult<Product> {
        let mut product = self.get(id).await?;
        product.listed = !product.listed;

        let product = self.store.update_product(&product).await?;
        tracing::info!(product_id = %id, listed = product.listed, "Product listing toggled");
        Ok(product)
    }

    /// Listed products of the same category, excluding `product`
    pub async fn recommended_for(&self, product: &Product) -> StorefrontResult<Vec<Product>> {
        let candidates = self.store.products_in_category(&product.category).await?;
        Ok(recommended(product, candidates, self.config.recommended_limit))
    }

    async fn discard_images(&self, images: &[ProductImage]) {
        for image in images {
            let Some(public_id) = image
                .public_id
                .clone()
                .or_else(|| extract_public_id(&image.url))
            else {
                tracing::debug!(url = %image.url, "Image has no public id, skipping deletion");
                continue;
            };

            match self.images.delete(&public_id).await {
                Ok(true) => tracing::debug!(public_id = %public_id, "Image deleted"),
                Ok(false) => tracing::debug!(public_id = %public_id, "Image not deleted"),
                Err(err) => {
                    tracing::warn!(public_id = %public_id, error = %err, "Image deletion failed, ignoring");
                }
            }
        }
    }
}

fn clean_features(features: Vec<String>) -> Vec<String> {
    features
        .into_iter()
        .map(|feature| feature.trim().to_string())
        .filter(|feature| !feature.is_empty())
        .collect()
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

/// Catalog filter applied to an already loaded list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    /// Category id; `all` or absent means every category
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    /// Hide unlisted products
    #[serde(skip)]
    pub listed_only: bool,
}

impl CatalogFilter {
    pub fn public() -> Self {
        Self {
            listed_only: true,
            ..Self::default()
        }
    }

    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "all");
        let needle = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut products: Vec<Product> = products
            .into_iter()
            .filter(|p| !self.listed_only || p.listed)
            .filter(|p| category.is_none_or(|c| p.category.as_str() == c))
            .filter(|p| needle.as_deref().is_none_or(|n| matches_search(p, n)))
            .collect();

        match self.sort {
            ProductSort::Newest => products.sort_by(newest_first),
            ProductSort::PriceAsc => products.sort_by(|a, b| a.price.total_cmp(&b.price)),
            ProductSort::PriceDesc => products.sort_by(|a, b| b.price.total_cmp(&a.price)),
            ProductSort::Name => {
                products.sort_by_key(|p| p.name.to_lowercase());
            }
        }
        products
    }
}

fn matches_search(product: &Product, needle: &str) -> bool {
    product.name.to_lowercase().contains(needle)
        || product.description.to_lowercase().contains(needle)
        || product
            .features
            .iter()
            .any(|feature| feature.to_lowercase().contains(needle))
}

fn newest_first(a: &Product, b: &Product) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Same category, different id, listed; at most `limit`, newest first
pub fn recommended(product: &Product, candidates: Vec<Product>, limit: usize) -> Vec<Product> {
    let mut picks: Vec<Product> = candidates
        .into_iter()
        .filter(|p| p.category == product.category && p.id != product.id && p.listed)
        .collect();
    picks.sort_by(newest_first);
    picks.truncate(limit);
    picks
}
