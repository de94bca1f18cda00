//! HTTP Handlers

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use kernel::id::{CategoryId, ProductId, UserId};
use kernel::page::{Cursor, Page};
use uuid::Uuid;

use crate::application::config::StorefrontConfig;
use crate::application::session_manager::SessionManager;
use crate::application::validation::{LoginForm, ResetForm, SignupForm, ValidationErrors};
use crate::application::{
    CatalogFilter, CategoryService, ProductService, UserAdminService, UserFilter,
};
use crate::domain::entity::{
    Address, AuthState, CategoryDraft, CategoryPatch, ProductDraft, ProductImage, ProductPatch,
    ProfilePatch,
};
use crate::domain::identity::{FederatedCredential, IdentityProvider};
use crate::domain::image_host::ImageHost;
use crate::domain::repository::DocumentStore;
use crate::domain::value_object::user_role::UserRole;
use crate::error::{StorefrontError, StorefrontResult};
use crate::presentation::dto::{
    AuthStatusResponse, FederatedLoginRequest, MessageResponse, PageQuery, ProductDetailResponse,
    RoleChangeRequest,
};
use crate::presentation::registry::{ProviderFactory, SessionRegistry};

/// Upper bound for a client-requested page size
const MAX_PAGE_SIZE: usize = 100;

/// How long an auth endpoint waits for the session to reflect the provider
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Folder product images are uploaded into
const IMAGE_FOLDER: &str = "products";

/// Shared state for storefront handlers
pub struct StorefrontState<P, S, I> {
    pub store: Arc<S>,
    pub images: Arc<I>,
    pub config: Arc<StorefrontConfig>,
    pub sessions: Arc<SessionRegistry<P, S>>,
}

impl<P, S, I> Clone for StorefrontState<P, S, I> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            images: Arc::clone(&self.images),
            config: Arc::clone(&self.config),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// A browser session resolved for one request
pub struct SessionHandle<P, S> {
    pub id: Uuid,
    pub manager: Arc<SessionManager<P, S>>,
    /// The session was created by this request
    pub created: bool,
}

/// Identity attached to requests that passed an API guard
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub uid: UserId,
    pub role: UserRole,
}

impl<P, S, I> StorefrontState<P, S, I>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    pub fn new(store: S, images: I, config: StorefrontConfig, factory: ProviderFactory<P>) -> Self {
        let store = Arc::new(store);
        let sessions = SessionRegistry::new(
            factory,
            Arc::clone(&store),
            config.session_secret,
            config.session_lifetime(),
        );
        Self {
            store,
            images: Arc::new(images),
            config: Arc::new(config),
            sessions: Arc::new(sessions),
        }
    }

    pub fn products(&self) -> ProductService<S, I> {
        ProductService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.images),
            Arc::clone(&self.config),
        )
    }

    pub fn categories(&self) -> CategoryService<S> {
        CategoryService::new(Arc::clone(&self.store))
    }

    pub fn users(&self) -> UserAdminService<S> {
        UserAdminService::new(Arc::clone(&self.store))
    }

    /// The registered session named by the request cookie
    pub async fn current_session(&self, headers: &HeaderMap) -> Option<SessionHandle<P, S>> {
        let id = self
            .sessions
            .session_id(headers, &self.config.session_cookie_name)?;
        let manager = self.sessions.lookup(id).await?;
        Some(SessionHandle {
            id,
            manager,
            created: false,
        })
    }

    /// The request's session, created when the cookie names none
    pub async fn session_for(&self, headers: &HeaderMap) -> SessionHandle<P, S> {
        let id = self
            .sessions
            .session_id(headers, &self.config.session_cookie_name);
        let (id, manager, created) = self.sessions.get_or_create(id).await;
        SessionHandle {
            id,
            manager,
            created,
        }
    }

    /// Drop a session this request created but will not hand out
    async fn abandon(&self, handle: &SessionHandle<P, S>) {
        if handle.created {
            self.sessions.remove(handle.id).await;
        }
    }

    /// `Set-Cookie` for a newly created session, nothing otherwise
    fn cookie_for(&self, handle: &SessionHandle<P, S>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if handle.created {
            let token = self.sessions.issue_token(handle.id);
            if let Some(value) = self.config.session_cookie().set_cookie_header(&token) {
                headers.insert(header::SET_COOKIE, value);
            }
        }
        headers
    }

    /// Auth state of the request's browser session
    pub async fn auth_state(&self, headers: &HeaderMap) -> (AuthState, Option<SessionHandle<P, S>>) {
        match self.current_session(headers).await {
            Some(handle) => (handle.manager.state(), Some(handle)),
            None => (AuthState::signed_out(), None),
        }
    }

    fn page_size(&self, requested: Option<usize>, default: usize) -> usize {
        requested.unwrap_or(default).min(MAX_PAGE_SIZE)
    }
}

fn cursor_of(query: &PageQuery) -> Option<Cursor> {
    query
        .cursor
        .as_deref()
        .filter(|cursor| !cursor.is_empty())
        .map(Cursor::new)
}

/// Wait until the session reflects the provider, bounded by `SETTLE_TIMEOUT`
async fn settle<P, S>(manager: &SessionManager<P, S>) -> AuthState
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
{
    match tokio::time::timeout(SETTLE_TIMEOUT, manager.synchronized()).await {
        Ok(state) => state,
        Err(_) => {
            tracing::warn!("Session did not settle in time, returning current state");
            manager.state()
        }
    }
}

fn blocked(state: &AuthState) -> bool {
    !state.is_authenticated()
        && state
            .last_error
            .as_ref()
            .is_some_and(|err| err.code == StorefrontError::AccountBlocked.code())
}

// ============================================================================
// Auth
// ============================================================================

/// Finish a sign-in style operation: settle, reject blocked accounts, and
/// hand out the cookie of a new session
async fn complete_sign_in<P, S, I>(
    state: &StorefrontState<P, S, I>,
    handle: SessionHandle<P, S>,
    outcome: StorefrontResult<crate::domain::entity::Principal>,
) -> StorefrontResult<(HeaderMap, Json<AuthStatusResponse>)>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    if let Err(err) = outcome {
        state.abandon(&handle).await;
        return Err(err);
    }

    let auth = settle(&handle.manager).await;
    if blocked(&auth) {
        state.abandon(&handle).await;
        return Err(StorefrontError::AccountBlocked);
    }

    Ok((state.cookie_for(&handle), Json(AuthStatusResponse::from(auth))))
}

/// POST /api/auth/login
pub async fn login<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    headers: HeaderMap,
    Json(form): Json<LoginForm>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let credentials = form.validate(&state.config)?;

    let handle = state.session_for(&headers).await;
    let outcome = handle
        .manager
        .login(credentials.email.as_str(), &credentials.password)
        .await;

    complete_sign_in(&state, handle, outcome).await
}

/// POST /api/auth/login/federated
pub async fn login_federated<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    headers: HeaderMap,
    Json(req): Json<FederatedLoginRequest>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let handle = state.session_for(&headers).await;
    let outcome = handle
        .manager
        .login_with_provider(FederatedCredential::from(req))
        .await;

    complete_sign_in(&state, handle, outcome).await
}

/// POST /api/auth/signup
pub async fn signup<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    headers: HeaderMap,
    Json(form): Json<SignupForm>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let credentials = form.validate(&state.config)?;

    let handle = state.session_for(&headers).await;
    let outcome = handle
        .manager
        .signup(credentials.email.as_str(), &credentials.password)
        .await;

    let (cookie, body) = complete_sign_in(&state, handle, outcome).await?;
    Ok((StatusCode::CREATED, cookie, body))
}

/// POST /api/auth/logout
pub async fn logout<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    headers: HeaderMap,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    if let Some(handle) = state.current_session(&headers).await {
        handle.manager.logout().await?;
        state.sessions.remove(handle.id).await;
    }

    let mut out = HeaderMap::new();
    if let Some(value) = state.config.session_cookie().delete_cookie_header() {
        out.insert(header::SET_COOKIE, value);
    }
    Ok((StatusCode::NO_CONTENT, out))
}

/// POST /api/auth/password-reset
pub async fn password_reset<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    headers: HeaderMap,
    Json(form): Json<ResetForm>,
) -> StorefrontResult<Json<MessageResponse>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let email = form.validate()?;

    let manager = match state.current_session(&headers).await {
        Some(handle) => handle.manager,
        None => state.sessions.detached(),
    };
    manager.reset_password(email.as_str()).await?;

    Ok(Json(MessageResponse {
        message: "Password reset email sent. Check your inbox.".to_string(),
    }))
}

/// POST /api/auth/refresh
pub async fn refresh<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    headers: HeaderMap,
) -> StorefrontResult<Json<AuthStatusResponse>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let handle = state
        .current_session(&headers)
        .await
        .ok_or(StorefrontError::NotAuthenticated)?;

    let auth = handle.manager.refresh_authorization().await?;
    Ok(Json(AuthStatusResponse::from(auth)))
}

/// GET /api/auth/status
pub async fn status<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    headers: HeaderMap,
) -> Json<AuthStatusResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let (auth, _) = state.auth_state(&headers).await;
    Json(AuthStatusResponse::from(auth))
}

// ============================================================================
// Catalog (public)
// ============================================================================

/// GET /api/catalog/products
pub async fn catalog_products<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CatalogFilter>,
) -> StorefrontResult<Json<Page<crate::domain::entity::Product>>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let page_size = state.page_size(page.page_size, state.config.catalog_page_size);
    let result = state
        .products()
        .list(page_size, cursor_of(&page).as_ref())
        .await?;

    let filter = CatalogFilter {
        listed_only: true,
        ..filter
    };
    Ok(Json(Page {
        items: filter.apply(result.items),
        next_cursor: result.next_cursor,
    }))
}

/// GET /api/catalog/products/{id}
pub async fn catalog_product<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
) -> StorefrontResult<Json<ProductDetailResponse>>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let service = state.products();
    let product = service.get(&ProductId::new(id)).await?;
    if !product.listed {
        return Err(StorefrontError::not_found(
            crate::domain::value_object::collection::Collection::Products,
            product.id.as_str(),
        ));
    }

    let recommended = service.recommended_for(&product).await?;
    Ok(Json(ProductDetailResponse {
        product,
        recommended,
    }))
}

/// GET /api/catalog/categories
pub async fn catalog_categories<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(state.categories().list_active().await?))
}

// ============================================================================
// Account (signed-in user)
// ============================================================================

/// GET /api/account/profile
pub async fn my_profile<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Extension(user): Extension<SessionUser>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(state.users().get(&user.uid).await?))
}

/// PATCH /api/account/profile
pub async fn update_my_profile<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Extension(user): Extension<SessionUser>,
    Json(patch): Json<ProfilePatch>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(state.users().update_profile(&user.uid, patch).await?))
}

/// PUT /api/account/address
pub async fn update_my_address<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Extension(user): Extension<SessionUser>,
    Json(address): Json<Address>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(state.users().update_address(&user.uid, address).await?))
}

// ============================================================================
// Admin: Users
// ============================================================================

/// GET /api/admin/users
pub async fn list_users<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<UserFilter>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let page_size = state.page_size(page.page_size, state.config.admin_page_size);
    let result = state
        .users()
        .list(page_size, cursor_of(&page).as_ref())
        .await?;

    Ok(Json(Page {
        items: filter.apply(result.items),
        next_cursor: result.next_cursor,
    }))
}

/// GET /api/admin/users/summary
pub async fn user_summary<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(state.users().summary().await?))
}

/// GET /api/admin/users/{id}
pub async fn get_user<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(state.users().get(&UserId::new(id)).await?))
}

/// POST /api/admin/users/{id}/toggle-block
pub async fn toggle_user_block<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let record = state.users().toggle_blocked(&UserId::new(id)).await?;
    let refreshed = state.sessions.refresh_user(&record.id).await;
    tracing::debug!(user_id = %record.id, sessions = refreshed, "Live sessions re-authorized");
    Ok(Json(record))
}

/// PUT /api/admin/users/{id}/role
pub async fn set_user_role<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
    Json(req): Json<RoleChangeRequest>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let record = state.users().set_role(&UserId::new(id), req.role).await?;
    state.sessions.refresh_user(&record.id).await;
    Ok(Json(record))
}

/// PUT /api/admin/users/{id}/address
pub async fn update_user_address<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
    Json(address): Json<Address>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(
        state.users().update_address(&UserId::new(id), address).await?,
    ))
}

/// PATCH /api/admin/users/{id}/profile
pub async fn update_user_profile<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
    Json(patch): Json<ProfilePatch>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(
        state.users().update_profile(&UserId::new(id), patch).await?,
    ))
}

// ============================================================================
// Admin: Products
// ============================================================================

/// GET /api/admin/products
pub async fn list_products<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CatalogFilter>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let page_size = state.page_size(page.page_size, state.config.admin_page_size);
    let result = state
        .products()
        .list(page_size, cursor_of(&page).as_ref())
        .await?;

    Ok(Json(Page {
        items: filter.apply(result.items),
        next_cursor: result.next_cursor,
    }))
}

/// POST /api/admin/products
pub async fn create_product<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Json(draft): Json<ProductDraft>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let product = state.products().create(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/admin/products/{id}
pub async fn get_product<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(state.products().get(&ProductId::new(id)).await?))
}

/// PATCH /api/admin/products/{id}
pub async fn update_product<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(
        state.products().update(&ProductId::new(id), patch).await?,
    ))
}

/// DELETE /api/admin/products/{id}
pub async fn delete_product<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
) -> StorefrontResult<StatusCode>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    state.products().delete(&ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/products/{id}/toggle-listing
pub async fn toggle_product_listing<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(
        state.products().toggle_listing(&ProductId::new(id)).await?,
    ))
}

/// POST /api/admin/images
///
/// Multipart upload; every part carrying a file name is uploaded.
pub async fn upload_images<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    mut multipart: Multipart,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(bad_upload)?;
        files.push((file_name, bytes.to_vec()));
    }

    let mut errors = ValidationErrors::new();
    if files.is_empty() {
        errors.add("images", "Select at least one image");
    } else if files.len() > state.config.max_product_images {
        errors.add(
            "images",
            format!(
                "You can upload at most {} images",
                state.config.max_product_images
            ),
        );
    }
    errors.into_result(())?;

    let mut uploaded: Vec<ProductImage> = Vec::with_capacity(files.len());
    for (file_name, bytes) in files {
        uploaded.push(state.images.upload(bytes, &file_name, IMAGE_FOLDER).await?);
    }

    Ok((StatusCode::CREATED, Json(uploaded)))
}

fn bad_upload(err: axum::extract::multipart::MultipartError) -> StorefrontError {
    tracing::debug!(error = %err, "Unreadable multipart body");
    let mut errors = ValidationErrors::new();
    errors.add("images", "Could not read the uploaded files");
    StorefrontError::Validation(errors)
}

// ============================================================================
// Admin: Categories
// ============================================================================

/// GET /api/admin/categories
pub async fn list_categories<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Query(page): Query<PageQuery>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let page_size = state.page_size(page.page_size, state.config.admin_page_size);
    Ok(Json(
        state
            .categories()
            .list(page_size, cursor_of(&page).as_ref())
            .await?,
    ))
}

/// POST /api/admin/categories
pub async fn create_category<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Json(draft): Json<CategoryDraft>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    let category = state.categories().create(draft).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/admin/categories/{id}
pub async fn update_category<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
    Json(patch): Json<CategoryPatch>,
) -> StorefrontResult<impl IntoResponse>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    Ok(Json(
        state.categories().update(&CategoryId::new(id), patch).await?,
    ))
}

/// DELETE /api/admin/categories/{id}
pub async fn delete_category<P, S, I>(
    State(state): State<StorefrontState<P, S, I>>,
    Path(id): Path<String>,
) -> StorefrontResult<StatusCode>
where
    P: IdentityProvider + Send + Sync + 'static,
    S: DocumentStore,
    I: ImageHost + Send + Sync + 'static,
{
    state.categories().delete(&CategoryId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
