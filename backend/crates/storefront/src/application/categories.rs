//! Category Management

use std::sync::Arc;

use chrono::Utc;
use kernel::id::CategoryId;
use kernel::page::{Cursor, Page};

use crate::application::pagination::PaginatedReader;
use crate::application::validation::{validate_category_draft, validate_category_patch};
use crate::domain::entity::{Category, CategoryDraft, CategoryPatch};
use crate::domain::repository::{CategoryStore, PagedCollection};
use crate::domain::value_object::collection::Collection;
use crate::error::{StorefrontError, StorefrontResult};

pub struct CategoryService<S> {
    store: Arc<S>,
}

impl<S> CategoryService<S>
where
    S: CategoryStore + PagedCollection<Category>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &CategoryId) -> StorefrontResult<Category> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found(Collection::Categories, id.as_str()))
    }

    pub async fn list(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> StorefrontResult<Page<Category>> {
        PaginatedReader::new(Arc::clone(&self.store))
            .read::<Category>(page_size, cursor)
            .await
    }

    /// Active categories for the public filter bar, newest first
    pub async fn list_active(&self) -> StorefrontResult<Vec<Category>> {
        let mut categories = self.store.list_categories().await?;
        categories.retain(|category| category.is_active);
        Ok(categories)
    }

    pub async fn create(&self, draft: CategoryDraft) -> StorefrontResult<Category> {
        validate_category_draft(&draft)?;

        let now = Utc::now();
        let category = Category {
            id: CategoryId::generate(),
            name: draft.name.trim().to_string(),
            description: normalize_description(draft.description),
            is_active: draft.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let category = self.store.insert_category(&category).await?;
        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    pub async fn update(&self, id: &CategoryId, patch: CategoryPatch) -> StorefrontResult<Category> {
        if patch.is_empty() {
            return Err(StorefrontError::EmptyUpdate);
        }
        validate_category_patch(&patch)?;

        let mut category = self.get(id).await?;
        if let Some(name) = patch.name {
            category.name = name.trim().to_string();
        }
        if patch.description.is_some() {
            category.description = normalize_description(patch.description);
        }
        if let Some(is_active) = patch.is_active {
            category.is_active = is_active;
        }

        let category = self.store.update_category(&category).await?;
        tracing::info!(category_id = %id, "Category updated");
        Ok(category)
    }

    pub async fn delete(&self, id: &CategoryId) -> StorefrontResult<()> {
        self.store.delete_category(id).await?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
