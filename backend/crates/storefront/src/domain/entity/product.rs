//! Product Entity

use chrono::{DateTime, Utc};
use kernel::id::{CategoryId, ProductId};
use serde::{Deserialize, Serialize};

/// One uploaded product image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    /// Image host key, needed to delete the asset
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u32,
    pub category: CategoryId,
    pub images: Vec<ProductImage>,
    pub features: Vec<String>,
    /// Unlisted products stay in the store but leave the public catalog
    pub listed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn cover_image(&self) -> Option<&ProductImage> {
        self.images.first()
    }
}

/// Fields of a new product
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    pub category: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub listed: Option<bool>,
}

/// Partial product update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub images: Option<Vec<ProductImage>>,
    pub features: Option<Vec<String>>,
    pub listed: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
            && self.images.is_none()
            && self.features.is_none()
            && self.listed.is_none()
    }
}
