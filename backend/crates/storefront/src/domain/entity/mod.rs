//! Domain Entities

pub mod auth_state;
pub mod category;
pub mod principal;
pub mod product;
pub mod user_record;

pub use auth_state::AuthState;
pub use category::{Category, CategoryDraft, CategoryPatch};
pub use principal::Principal;
pub use product::{Product, ProductDraft, ProductImage, ProductPatch};
pub use user_record::{Address, ProfilePatch, UserRecord};
