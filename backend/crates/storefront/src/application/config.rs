//! Application Configuration
//!
//! Configuration for the storefront application layer and its external
//! collaborators.

use std::time::Duration;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// How long a browser session lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifetime {
    /// From creation, matches the cookie's Max-Age
    pub absolute: Duration,
    /// Since the last request
    pub idle: Duration,
}

/// Storefront application configuration
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Browser-session cookie name
    pub session_cookie_name: String,
    /// Session secret key for HMAC signing (32 bytes)
    pub session_secret: [u8; 32],
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Browser-session lifetime (12 hours)
    pub session_ttl: Duration,
    /// Idle browser sessions are evicted after this (2 hours)
    pub session_idle_ttl: Duration,
    /// Page size of the admin tables
    pub admin_page_size: usize,
    /// Page size of the public catalog
    pub catalog_page_size: usize,
    /// Maximum images per product
    pub max_product_images: usize,
    /// Minimum accepted password length
    pub min_password_length: usize,
    /// Number of recommended products on a detail page
    pub recommended_limit: usize,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "storefront_session".to_string(),
            session_secret: [0u8; 32],
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            session_ttl: Duration::from_secs(12 * 3600),
            session_idle_ttl: Duration::from_secs(2 * 3600),
            admin_page_size: 20,
            catalog_page_size: 10,
            max_product_images: 5,
            min_password_length: 6,
            recommended_limit: 4,
        }
    }
}

impl StorefrontConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: platform::crypto::random_secret(),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Cookie attributes of the browser-session cookie
    pub fn session_cookie(&self) -> platform::cookie::CookieConfig {
        platform::cookie::CookieConfig {
            secure: self.cookie_secure,
            same_site: self.cookie_same_site,
            max_age_secs: i64::try_from(self.session_ttl.as_secs()).ok(),
            ..platform::cookie::CookieConfig::named(&self.session_cookie_name)
        }
    }

    pub fn session_lifetime(&self) -> SessionLifetime {
        SessionLifetime {
            absolute: self.session_ttl,
            idle: self.session_idle_ttl.min(self.session_ttl),
        }
    }
}

/// Identity-Toolkit compatible REST endpoint
#[derive(Debug, Clone)]
pub struct IdentityToolkitConfig {
    pub api_key: String,
    /// e.g. `https://identitytoolkit.googleapis.com/v1`
    pub base_url: String,
}

impl IdentityToolkitConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://identitytoolkit.googleapis.com/v1";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Image host account
#[derive(Debug, Clone)]
pub struct ImageHostConfig {
    pub cloud_name: String,
    /// Unsigned upload preset
    pub upload_preset: String,
    /// Needed for signed deletion only
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// e.g. `https://api.cloudinary.com/v1_1`
    pub base_url: String,
}

impl ImageHostConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.cloudinary.com/v1_1";

    pub fn new(cloud_name: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
            api_key: None,
            api_secret: None,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Key and secret, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some((key, secret))
            }
            _ => None,
        }
    }
}
