//! Server-Rendered Pages
//!
//! Askama templates for the page routes. Guarding happens in the
//! middleware; these handlers only render.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use kernel::id::ProductId;

use crate::application::{CatalogFilter, UserSummary};
use crate::domain::entity::Product;
use crate::domain::identity::IdentityProvider;
use crate::domain::image_host::{ImageHost, ImageTransform, build_optimized_url};
use crate::domain::repository::DocumentStore;
use crate::domain::value_object::collection::Collection;
use crate::error::{StorefrontError, StorefrontResult};
use crate::presentation::handlers::StorefrontState;

// =============================================================================
// Views
// =============================================================================

/// Product card data for templates
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_str().to_string(),
            name: product.name.clone(),
            price: format!("{:.2}", product.price),
            image: product
                .cover_image()
                .map(|image| build_optimized_url(&image.url, &ImageTransform::default())),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Neutral page shown while the session is still resolving
#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
pub struct LoadingTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate;

/// Public catalog listing
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub products: Vec<ProductView>,
}

/// Product detail with recommendations
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
    pub description: String,
    pub features: Vec<String>,
    pub recommended: Vec<ProductView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminTemplate {
    pub summary: UserSummary,
}

// =============================================================================
// Routes
// =============================================================================

/// GET /
pub async fn home() -> HomeTemplate {
    HomeTemplate
}

/// GET /login
pub async fn login_page() -> LoginTemplate {
    LoginTemplate
}

/// GET /signup
pub async fn signup_page() -> SignupTemplate {
    SignupTemplate
}

/// GET /products
pub async fn products_page<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
) -> StorefrontResult<ProductsIndexTemplate>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let page = state
        .products()
        .list(state.config.catalog_page_size, None)
        .await?;
    let products = CatalogFilter::public()
        .apply(page.items)
        .iter()
        .map(ProductView::from)
        .collect();

    Ok(ProductsIndexTemplate { products })
}

/// GET /products/{id}
pub async fn product_page<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
) -> StorefrontResult<ProductShowTemplate>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let service = state.products();
    let product = service.get(&ProductId::new(id)).await?;
    if !product.listed {
        return Err(StorefrontError::not_found(
            Collection::Products,
            product.id.as_str(),
        ));
    }
    let recommended = service
        .recommended_for(&product)
        .await?
        .iter()
        .map(ProductView::from)
        .collect();

    Ok(ProductShowTemplate {
        product: ProductView::from(&product),
        description: product.description,
        features: product.features,
        recommended,
    })
}

/// GET /admin
pub async fn admin_page<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
) -> StorefrontResult<AdminTemplate>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let summary = state.users().summary().await?;
    Ok(AdminTemplate { summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::ProductImage;

    fn mug(name: &str) -> Product {
        let now = chrono::Utc::now();
        Product {
            id: ProductId::new("p1"),
            name: name.to_string(),
            description: "Stoneware & glaze".to_string(),
            price: 450.0,
            stock: 3,
            category: kernel::id::CategoryId::new("mugs"),
            images: vec![ProductImage {
                url: "https://res.cloudinary.com/demo/image/upload/v1/mug.jpg".to_string(),
                public_id: Some("mug".to_string()),
                width: None,
                height: None,
            }],
            features: vec!["<b>Dishwasher</b> safe".to_string()],
            listed: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_loading_page_has_no_redirect() {
        let html = LoadingTemplate.render().unwrap();
        assert!(html.contains("Loading"));
        assert!(!html.contains("/login"));
    }

    #[test]
    fn test_product_view_formats_price_and_image() {
        let view = ProductView::from(&mug("Mug"));
        assert_eq!(view.price, "450.00");
        assert!(view.image.unwrap().contains("/upload/w_400,h_500"));
    }

    #[test]
    fn test_product_page_escapes_user_content() {
        let product = mug("<script>alert(1)</script>");
        let html = ProductShowTemplate {
            product: ProductView::from(&product),
            description: product.description.clone(),
            features: product.features.clone(),
            recommended: vec![ProductView::from(&product)],
        }
        .render()
        .unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<b>Dishwasher</b>"));
        assert!(html.contains("Stoneware &amp; glaze"));
    }

    #[test]
    fn test_admin_page_lists_counts() {
        let html = AdminTemplate {
            summary: UserSummary {
                total: 4,
                active: 3,
                blocked: 1,
                admins: 2,
            },
        }
        .render()
        .unwrap();
        assert!(html.contains("<dd>4</dd>"));
        assert!(html.contains("<dd>1</dd>"));
    }
}
