//! Document collections

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three collections of the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Products,
    Users,
    Categories,
}

impl Collection {
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Users => "users",
            Collection::Categories => "categories",
        }
    }

    /// Singular display name, used in error messages
    #[inline]
    pub const fn singular(&self) -> &'static str {
        match self {
            Collection::Products => "Product",
            Collection::Users => "User",
            Collection::Categories => "Category",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
