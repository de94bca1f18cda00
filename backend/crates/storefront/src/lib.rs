//! Storefront Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, store and collaborator traits
//! - `application/` - Session manager, paginated reader, route guards, services
//! - `infra/` - Document stores, identity provider and image host clients
//! - `presentation/` - HTTP handlers, DTOs, pages, router, session registry
//!
//! ## Session Model
//! - Each browser session owns one `SessionManager`
//! - The manager follows the identity provider's session changes and resolves
//!   role and block status from the user record
//! - A blocked account is signed out as soon as its record is read
//! - Guards never redirect while the session is still resolving

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::{IdentityToolkitConfig, ImageHostConfig, StorefrontConfig};
pub use application::session_manager::SessionManager;
pub use error::{StorefrontError, StorefrontResult};
pub use infra::{CloudinaryClient, IdentityToolkitClient, MemoryDocumentStore, PgDocumentStore};
pub use presentation::router::storefront_router;
pub use presentation::{ProviderFactory, StorefrontState};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}
