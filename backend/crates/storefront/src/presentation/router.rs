//! Storefront Router

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
};

use crate::domain::identity::IdentityProvider;
use crate::domain::image_host::ImageHost;
use crate::domain::repository::DocumentStore;
use crate::presentation::handlers::{self, StorefrontState};
use crate::presentation::middleware::{
    require_admin_api, require_admin_page, require_session_api, require_session_page,
};
use crate::presentation::pages;

/// Upload limit for the multipart image endpoint
const IMAGE_UPLOAD_LIMIT: usize = 25 * 1024 * 1024;

/// Auth endpoints, mounted at `/api/auth`
pub fn auth_router<P, S, I>() -> Router<StorefrontState<P, S, I>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Router::new()
        .route("/login", post(handlers::login::<P, S, I>))
        .route("/login/federated", post(handlers::login_federated::<P, S, I>))
        .route("/signup", post(handlers::signup::<P, S, I>))
        .route("/logout", post(handlers::logout::<P, S, I>))
        .route("/password-reset", post(handlers::password_reset::<P, S, I>))
        .route("/refresh", post(handlers::refresh::<P, S, I>))
        .route("/status", get(handlers::status::<P, S, I>))
}

/// Public catalog, mounted at `/api/catalog`
pub fn catalog_router<P, S, I>() -> Router<StorefrontState<P, S, I>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Router::new()
        .route("/products", get(handlers::catalog_products::<P, S, I>))
        .route("/products/{id}", get(handlers::catalog_product::<P, S, I>))
        .route("/categories", get(handlers::catalog_categories::<P, S, I>))
}

/// Signed-in user's own record, mounted at `/api/account`
pub fn account_router<P, S, I>(state: StorefrontState<P, S, I>) -> Router<StorefrontState<P, S, I>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/profile",
            get(handlers::my_profile::<P, S, I>).patch(handlers::update_my_profile::<P, S, I>),
        )
        .route("/address", put(handlers::update_my_address::<P, S, I>))
        .route_layer(from_fn_with_state(state, require_session_api::<P, S, I>))
}

/// Back-office endpoints, mounted at `/api/admin`
pub fn admin_router<P, S, I>(state: StorefrontState<P, S, I>) -> Router<StorefrontState<P, S, I>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Router::new()
        // Users
        .route("/users", get(handlers::list_users::<P, S, I>))
        .route("/users/summary", get(handlers::user_summary::<P, S, I>))
        .route("/users/{id}", get(handlers::get_user::<P, S, I>))
        .route("/users/{id}/toggle-block", post(handlers::toggle_user_block::<P, S, I>))
        .route("/users/{id}/role", put(handlers::set_user_role::<P, S, I>))
        .route("/users/{id}/address", put(handlers::update_user_address::<P, S, I>))
        .route("/users/{id}/profile", patch(handlers::update_user_profile::<P, S, I>))
        // Products
        .route(
            "/products",
            get(handlers::list_products::<P, S, I>).post(handlers::create_product::<P, S, I>),
        )
        .route(
            "/products/{id}",
            get(handlers::get_product::<P, S, I>)
                .patch(handlers::update_product::<P, S, I>)
                .delete(handlers::delete_product::<P, S, I>),
        )
        .route(
            "/products/{id}/toggle-listing",
            post(handlers::toggle_product_listing::<P, S, I>),
        )
        .route(
            "/images",
            post(handlers::upload_images::<P, S, I>).layer(DefaultBodyLimit::max(IMAGE_UPLOAD_LIMIT)),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories::<P, S, I>).post(handlers::create_category::<P, S, I>),
        )
        .route(
            "/categories/{id}",
            patch(handlers::update_category::<P, S, I>).delete(handlers::delete_category::<P, S, I>),
        )
        .route_layer(from_fn_with_state(state, require_admin_api::<P, S, I>))
}

/// Page routes
pub fn page_router<P, S, I>(state: StorefrontState<P, S, I>) -> Router<StorefrontState<P, S, I>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let public = Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login_page))
        .route("/signup", get(pages::signup_page));

    let signed_in = Router::new()
        .route("/products", get(pages::products_page::<P, S, I>))
        .route("/products/{id}", get(pages::product_page::<P, S, I>))
        .route_layer(from_fn_with_state(
            state.clone(),
            require_session_page::<P, S, I>,
        ));

    let admin = Router::new()
        .route("/admin", get(pages::admin_page::<P, S, I>))
        .route_layer(from_fn_with_state(state, require_admin_page::<P, S, I>));

    public.merge(signed_in).merge(admin)
}

/// The complete storefront application
pub fn storefront_router<P, S, I>(state: StorefrontState<P, S, I>) -> Router
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Router::new()
        .nest("/api/auth", auth_router())
        .nest("/api/catalog", catalog_router())
        .nest("/api/account", account_router(state.clone()))
        .nest("/api/admin", admin_router(state.clone()))
        .merge(page_router(state.clone()))
        .with_state(state)
}
