//! Presentation Layer
//!
//! HTTP handlers, DTOs, pages, router, guard middleware, and the browser
//! session registry.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod registry;
pub mod router;

pub use handlers::{SessionUser, StorefrontState};
pub use registry::{ProviderFactory, SessionRegistry};
pub use router::storefront_router;
