//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no storefront semantics:
//! - Cookie building and extraction
//! - Signed opaque tokens (HMAC-SHA256) for browser session cookies
//! - Digests used to sign image-host requests

pub mod cookie;
pub mod crypto;
