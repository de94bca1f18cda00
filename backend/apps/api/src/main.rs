//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{self, Method, header};
use base64::Engine;
use base64::engine::general_purpose;
use sqlx::postgres::PgPoolOptions;
use storefront::domain::repository::DocumentStore;
use storefront::{
    CloudinaryClient, IdentityToolkitClient, IdentityToolkitConfig, ImageHostConfig,
    MemoryDocumentStore, PgDocumentStore, ProviderFactory, StorefrontConfig, StorefrontState,
    storefront_router,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,storefront=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = storefront_config()?;

    // Collaborators share one connection pool
    let http = reqwest::Client::builder()
        .user_agent(concat!("storefront-api/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let identity = IdentityToolkitConfig {
        base_url: env::var("IDENTITY_BASE_URL")
            .unwrap_or_else(|_| IdentityToolkitConfig::DEFAULT_BASE_URL.to_string()),
        ..IdentityToolkitConfig::new(
            env::var("IDENTITY_API_KEY").context("IDENTITY_API_KEY must be set")?,
        )
    };
    let identity = IdentityToolkitClient::new(http.clone(), Arc::new(identity));
    let factory: ProviderFactory<IdentityToolkitClient> = Arc::new(move || identity.fork());

    let image_host = ImageHostConfig {
        api_key: env::var("IMAGE_API_KEY").ok(),
        api_secret: env::var("IMAGE_API_SECRET").ok(),
        ..ImageHostConfig::new(
            env::var("IMAGE_CLOUD_NAME").context("IMAGE_CLOUD_NAME must be set")?,
            env::var("IMAGE_UPLOAD_PRESET").context("IMAGE_UPLOAD_PRESET must be set")?,
        )
    };
    if image_host.credentials().is_none() {
        tracing::warn!("Image host credentials not configured, replaced images will not be deleted");
    }
    let images = CloudinaryClient::new(http, Arc::new(image_host));

    // Document store
    match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            let store = PgDocumentStore::new(pool);
            serve(StorefrontState::new(store, images, config, factory)).await
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using the in-memory document store");
            let store = MemoryDocumentStore::new();
            serve(StorefrontState::new(store, images, config, factory)).await
        }
    }
}

/// Storefront configuration from the environment
fn storefront_config() -> anyhow::Result<StorefrontConfig> {
    let base = if cfg!(debug_assertions) {
        StorefrontConfig::development()
    } else {
        StorefrontConfig::default()
    };

    let session_secret = match env::var("SESSION_SECRET") {
        Ok(secret_b64) => {
            let secret_bytes = Engine::decode(&general_purpose::STANDARD, &secret_b64)?;
            <[u8; 32]>::try_from(secret_bytes.as_slice())
                .context("SESSION_SECRET must decode to 32 bytes")?
        }
        Err(_) if cfg!(debug_assertions) => base.session_secret,
        Err(_) => anyhow::bail!("SESSION_SECRET must be set in production"),
    };

    Ok(StorefrontConfig {
        session_secret,
        ..base
    })
}

async fn serve<S>(state: StorefrontState<IdentityToolkitClient, S, CloudinaryClient>) -> anyhow::Result<()>
where
    S: DocumentStore,
{
    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = storefront_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()
        .context("BIND_ADDR must be a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
