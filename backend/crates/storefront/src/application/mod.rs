//! Application Layer
//!
//! Session lifecycle, paginated reads, route guards, and the back-office
//! services.

pub mod categories;
pub mod config;
pub mod guards;
pub mod pagination;
pub mod products;
pub mod session_manager;
pub mod users;
pub mod validation;

// Re-exports
pub use categories::CategoryService;
pub use config::{IdentityToolkitConfig, ImageHostConfig, SessionLifetime, StorefrontConfig};
pub use guards::{GuardOutcome, require_authenticated, require_role};
pub use pagination::{FetchTicket, PageAccumulator, PaginatedReader};
pub use products::{CatalogFilter, ProductService, ProductSort};
pub use session_manager::SessionManager;
pub use users::{StatusFilter, UserAdminService, UserFilter, UserSummary};
pub use validation::{FieldError, ValidationErrors};
