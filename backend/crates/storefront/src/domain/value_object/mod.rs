//! Value Objects

pub mod collection;
pub mod email;
pub mod user_role;

pub use collection::Collection;
pub use email::Email;
pub use user_role::UserRole;
