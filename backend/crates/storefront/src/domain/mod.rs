//! Domain Layer
//!
//! Entities, value objects, and the traits of the external collaborators
//! (document store, identity provider, image host).

pub mod entity;
pub mod identity;
pub mod image_host;
pub mod repository;
pub mod value_object;
