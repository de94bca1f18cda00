//! Infrastructure Layer
//!
//! Document stores and the external identity and image services.

pub mod cloudinary;
pub mod identity_toolkit;
pub mod memory;
pub mod postgres;

pub use cloudinary::CloudinaryClient;
pub use identity_toolkit::IdentityToolkitClient;
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
