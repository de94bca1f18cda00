//! Scenario tests for the storefront crate
//! Session lifecycle, paging, guards and the HTTP surface end to end

#[cfg(test)]
mod fakes {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    use kernel::id::{CategoryId, ProductId, UserId};
    use tokio::sync::watch;

    use crate::domain::entity::{AuthState, Category, Principal, Product, ProductImage, UserRecord};
    use crate::domain::identity::{FederatedCredential, IdentityProvider, ProviderError};
    use crate::domain::image_host::{ImageHost, ImageHostError};
    use crate::domain::repository::{PagePosition, PagedCollection, UserStore};
    use crate::error::{StorefrontError, StorefrontResult};
    use crate::infra::MemoryDocumentStore;

    fn rejected(code: &str) -> ProviderError {
        ProviderError::Rejected {
            code: code.to_string(),
            message: code.to_string(),
        }
    }

    /// Accounts shared by every provider instance of one test
    #[derive(Default)]
    pub struct Directory {
        accounts: StdMutex<HashMap<String, (String, Principal)>>,
        resets: StdMutex<Vec<String>>,
    }

    impl Directory {
        pub fn add(&self, email: &str, password: &str, uid: &str) -> Principal {
            let principal = Principal::new(uid, email);
            self.accounts.lock().unwrap().insert(
                email.to_string(),
                (password.to_string(), principal.clone()),
            );
            principal
        }

        pub fn resets(&self) -> Vec<String> {
            self.resets.lock().unwrap().clone()
        }
    }

    /// Identity provider answering from a [`Directory`]
    pub struct ScriptedProvider {
        directory: Arc<Directory>,
        session: watch::Sender<Option<Principal>>,
        sign_outs: AtomicUsize,
        fail_sign_out: AtomicBool,
    }

    impl ScriptedProvider {
        pub fn new(directory: Arc<Directory>) -> Self {
            let (session, _) = watch::channel(None);
            Self {
                directory,
                session,
                sign_outs: AtomicUsize::new(0),
                fail_sign_out: AtomicBool::new(false),
            }
        }

        /// Publish a session change as the provider would
        pub fn emit(&self, principal: Option<Principal>) {
            self.session.send_replace(principal);
        }

        pub fn sign_out_count(&self) -> usize {
            self.sign_outs.load(Ordering::SeqCst)
        }

        pub fn fail_sign_out(&self, fail: bool) {
            self.fail_sign_out.store(fail, Ordering::SeqCst);
        }
    }

    impl IdentityProvider for ScriptedProvider {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<Principal, ProviderError> {
            let account = self.directory.accounts.lock().unwrap().get(email).cloned();
            match account {
                None => Err(rejected("EMAIL_NOT_FOUND")),
                Some((expected, _)) if expected != password => Err(rejected("INVALID_PASSWORD")),
                Some((_, principal)) => {
                    self.emit(Some(principal.clone()));
                    Ok(principal)
                }
            }
        }

        async fn sign_in_with_federated(
            &self,
            credential: FederatedCredential,
        ) -> Result<Principal, ProviderError> {
            let token = credential.id_token.ok_or(ProviderError::Cancelled)?;
            let principal = Principal::new(format!("fed-{token}"), format!("{token}@federated.test"));
            self.emit(Some(principal.clone()));
            Ok(principal)
        }

        async fn create_account(
            &self,
            email: &str,
            password: &str,
        ) -> Result<Principal, ProviderError> {
            let principal = {
                let mut accounts = self.directory.accounts.lock().unwrap();
                if accounts.contains_key(email) {
                    return Err(rejected("EMAIL_EXISTS"));
                }
                let principal = Principal::new(format!("uid-{}", accounts.len() + 1), email);
                accounts.insert(email.to_string(), (password.to_string(), principal.clone()));
                principal
            };
            self.emit(Some(principal.clone()));
            Ok(principal)
        }

        async fn sign_out(&self) -> Result<(), ProviderError> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_out.load(Ordering::SeqCst) {
                return Err(ProviderError::Transport("connection reset".to_string()));
            }
            self.emit(None);
            Ok(())
        }

        async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
            if !self.directory.accounts.lock().unwrap().contains_key(email) {
                return Err(rejected("EMAIL_NOT_FOUND"));
            }
            self.directory.resets.lock().unwrap().push(email.to_string());
            Ok(())
        }

        fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
            self.session.subscribe()
        }

        fn current_principal(&self) -> Option<Principal> {
            self.session.borrow().clone()
        }
    }

    /// Store whose every call fails
    pub struct OfflineStore;

    fn offline() -> StorefrontError {
        StorefrontError::Internal("store offline".to_string())
    }

    impl UserStore for OfflineStore {
        async fn find_user(&self, _id: &UserId) -> StorefrontResult<Option<UserRecord>> {
            Err(offline())
        }

        async fn ensure_user(&self, _principal: &Principal) -> StorefrontResult<UserRecord> {
            Err(offline())
        }

        async fn update_user(&self, _record: &UserRecord) -> StorefrontResult<UserRecord> {
            Err(offline())
        }

        async fn list_users(&self) -> StorefrontResult<Vec<UserRecord>> {
            Err(offline())
        }
    }

    impl PagedCollection<Product> for OfflineStore {
        async fn fetch_after(
            &self,
            _after: Option<&PagePosition>,
            _limit: usize,
        ) -> StorefrontResult<Vec<Product>> {
            Err(offline())
        }
    }

    /// Memory store whose record lookups wait for `gate`
    pub struct GatedStore {
        pub inner: MemoryDocumentStore,
        pub gate: Arc<tokio::sync::Mutex<()>>,
    }

    impl UserStore for GatedStore {
        async fn find_user(&self, id: &UserId) -> StorefrontResult<Option<UserRecord>> {
            self.inner.find_user(id).await
        }

        async fn ensure_user(&self, principal: &Principal) -> StorefrontResult<UserRecord> {
            let _open = self.gate.lock().await;
            self.inner.ensure_user(principal).await
        }

        async fn update_user(&self, record: &UserRecord) -> StorefrontResult<UserRecord> {
            self.inner.update_user(record).await
        }

        async fn list_users(&self) -> StorefrontResult<Vec<UserRecord>> {
            self.inner.list_users().await
        }
    }

    /// Image host that keeps a log instead of talking to a CDN
    #[derive(Default)]
    pub struct RecordingImageHost {
        deleted: StdMutex<Vec<String>>,
        pub fail_deletes: bool,
    }

    impl RecordingImageHost {
        pub fn failing() -> Self {
            Self {
                fail_deletes: true,
                ..Self::default()
            }
        }

        pub fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    impl ImageHost for RecordingImageHost {
        async fn upload(
            &self,
            bytes: Vec<u8>,
            file_name: &str,
            folder: &str,
        ) -> Result<ProductImage, ImageHostError> {
            let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
            let public_id = format!("{folder}/{stem}");
            Ok(ProductImage {
                url: format!("https://res.cloudinary.com/demo/image/upload/v1/{public_id}.jpg"),
                public_id: Some(public_id),
                width: Some(u32::try_from(bytes.len()).unwrap_or(0)),
                height: None,
            })
        }

        async fn delete(&self, public_id: &str) -> Result<bool, ImageHostError> {
            if self.fail_deletes {
                return Err(ImageHostError::Delete("quota exceeded".to_string()));
            }
            self.deleted.lock().unwrap().push(public_id.to_string());
            Ok(true)
        }
    }

    pub fn product(index: usize) -> Product {
        use chrono::TimeZone;

        // Triples share a timestamp so the id tie-break is exercised
        let at = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::minutes((index / 3) as i64);
        Product {
            id: ProductId::new(format!("p{index:03}")),
            name: format!("Product {index}"),
            description: String::new(),
            price: 100.0 + index as f64,
            stock: 5,
            category: CategoryId::new("mugs"),
            images: Vec::new(),
            features: Vec::new(),
            listed: true,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn category(id: &str, name: &str) -> Category {
        let now = chrono::Utc::now();
        Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Wait for a published state matching `pred`
    pub async fn wait_for_state<P, U>(
        manager: &crate::SessionManager<P, U>,
        pred: impl Fn(&AuthState) -> bool,
    ) -> AuthState
    where
        P: IdentityProvider + Send + Sync + 'static,
        U: UserStore + Send + Sync + 'static,
    {
        let mut states = manager.subscribe();
        let reached = async { states.wait_for(|state| pred(state)).await.map(|s| s.clone()) };
        tokio::time::timeout(Duration::from_secs(2), reached)
            .await
            .expect("state not reached in time")
            .expect("session manager dropped")
    }

    pub async fn seed_products(store: &MemoryDocumentStore, count: usize) -> Vec<Product> {
        let mut products = Vec::with_capacity(count);
        for index in 0..count {
            let product = product(index);
            store.seed_product(product.clone()).await;
            products.push(product);
        }
        products
    }

    pub async fn seed_categories(store: &MemoryDocumentStore, names: &[(&str, &str)]) {
        for (id, name) in names {
            store.seed_category(category(id, name)).await;
        }
    }
}

#[cfg(test)]
mod session_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use kernel::id::UserId;
    use tokio_test::{assert_err, assert_ok};

    use super::fakes::*;
    use crate::SessionManager;
    use crate::application::UserAdminService;
    use crate::domain::entity::{Principal, UserRecord};
    use crate::domain::identity::FederatedCredential;
    use crate::domain::repository::UserStore;
    use crate::domain::value_object::user_role::UserRole;
    use crate::error::{AuthFailure, StorefrontError};
    use crate::infra::MemoryDocumentStore;

    fn setup() -> (Arc<Directory>, Arc<ScriptedProvider>, MemoryDocumentStore) {
        let directory = Arc::new(Directory::default());
        let provider = Arc::new(ScriptedProvider::new(Arc::clone(&directory)));
        (directory, provider, MemoryDocumentStore::new())
    }

    #[tokio::test]
    async fn test_starts_initializing_then_settles_signed_out() {
        let (_, provider, store) = setup();
        let manager = SessionManager::start(provider, Arc::new(store));

        assert!(manager.state().is_initializing);
        let state = manager.initialized().await;
        assert!(!state.is_initializing);
        assert!(state.identity.is_none());
        assert_eq!(state.role, None);
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_user_record() {
        let (directory, provider, store) = setup();
        directory.add("asha@shop.in", "secret1", "u-asha");
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store.clone()));
        manager.initialized().await;

        let principal = assert_ok!(manager.login("asha@shop.in", "secret1").await);
        let state = manager.synchronized().await;

        assert_eq!(state.identity.as_ref().map(|p| &p.uid), Some(&principal.uid));
        assert_eq!(state.role, Some(UserRole::User));
        assert!(!state.is_loading);

        let record = store.find_user(&principal.uid).await.unwrap().unwrap();
        assert_eq!(record.role, Some(UserRole::User));
        assert!(!record.blocked);
    }

    #[tokio::test]
    async fn test_sign_in_keeps_existing_admin_role() {
        let (directory, provider, store) = setup();
        let principal = directory.add("root@shop.in", "secret1", "u-root");
        store
            .seed_user(UserRecord {
                role: Some(UserRole::Admin),
                ..UserRecord::for_principal(&principal, Utc::now())
            })
            .await;
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store.clone()));

        assert_ok!(manager.login("root@shop.in", "secret1").await);
        let state = manager.synchronized().await;

        assert!(state.is_admin());
        let record = store.find_user(&principal.uid).await.unwrap().unwrap();
        assert_eq!(record.role, Some(UserRole::Admin));
    }

    #[tokio::test]
    async fn test_blocked_account_is_signed_out_once() {
        let (directory, provider, store) = setup();
        let principal = directory.add("mal@shop.in", "secret1", "u-mal");
        store
            .seed_user(UserRecord {
                blocked: true,
                ..UserRecord::for_principal(&principal, Utc::now())
            })
            .await;
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store));
        manager.initialized().await;

        assert_ok!(manager.login("mal@shop.in", "secret1").await);
        let state = manager.synchronized().await;

        assert!(state.identity.is_none());
        assert_eq!(state.role, None);
        assert_eq!(
            state.last_error.as_ref().map(|e| e.code.as_str()),
            Some("account-blocked")
        );

        // The provider's own sign-out notification must not clear the error
        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = manager.state();
        assert!(state.identity.is_none());
        assert!(state.last_error.is_some());
        assert_eq!(provider.sign_out_count(), 1);
    }

    #[tokio::test]
    async fn test_initializing_never_returns() {
        let (directory, provider, store) = setup();
        let principal = directory.add("asha@shop.in", "secret1", "u-asha");
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store));

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut states = manager.subscribe();
        let recorder = {
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                loop {
                    let initializing = states.borrow_and_update().is_initializing;
                    seen.lock().unwrap().push(initializing);
                    if states.changed().await.is_err() {
                        break;
                    }
                }
            })
        };

        manager.initialized().await;
        provider.emit(Some(principal.clone()));
        wait_for_state(&manager, |s| s.identity.is_some()).await;
        provider.emit(None);
        wait_for_state(&manager, |s| s.identity.is_none()).await;
        provider.emit(Some(principal));
        wait_for_state(&manager, |s| s.identity.is_some()).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        recorder.abort();

        let seen = seen.lock().unwrap().clone();
        let first_settled = seen.iter().position(|initializing| !initializing).unwrap();
        assert!(seen[first_settled..].iter().all(|initializing| !initializing));
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_to_user_role() {
        let directory = Arc::new(Directory::default());
        let principal = directory.add("asha@shop.in", "secret1", "u-asha");
        let provider = Arc::new(ScriptedProvider::new(directory));
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(OfflineStore));

        provider.emit(Some(principal.clone()));
        let state = wait_for_state(&manager, |s| s.identity.is_some()).await;

        assert_eq!(state.identity, Some(principal));
        assert_eq!(state.role, Some(UserRole::User));
        assert!(!state.is_admin());
        assert_eq!(state.last_error.map(|e| e.code), Some("internal".to_string()));
    }

    #[tokio::test]
    async fn test_wrong_password_is_latched() {
        let (directory, provider, store) = setup();
        directory.add("asha@shop.in", "secret1", "u-asha");
        let manager = SessionManager::start(provider, Arc::new(store));
        manager.initialized().await;

        let err = assert_err!(manager.login("asha@shop.in", "nope123").await);
        assert!(matches!(err, StorefrontError::Auth(AuthFailure::WrongCredentials)));

        let state = manager.state();
        assert!(!state.is_loading);
        assert!(state.identity.is_none());
        assert_eq!(
            state.last_error.map(|e| e.code),
            Some("wrong-credentials".to_string())
        );

        let err = assert_err!(manager.login("ghost@shop.in", "secret1").await);
        assert!(matches!(err, StorefrontError::Auth(AuthFailure::NoSuchAccount)));
    }

    #[tokio::test]
    async fn test_next_operation_clears_last_error() {
        let (directory, provider, store) = setup();
        directory.add("asha@shop.in", "secret1", "u-asha");
        let manager = SessionManager::start(provider, Arc::new(store));
        manager.initialized().await;

        assert_err!(manager.login("asha@shop.in", "nope123").await);
        assert!(manager.state().last_error.is_some());

        assert_ok!(manager.login("asha@shop.in", "secret1").await);
        let state = manager.synchronized().await;
        assert!(state.is_authenticated());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_signup_then_duplicate() {
        let (_, provider, store) = setup();
        let manager = SessionManager::start(provider, Arc::new(store.clone()));
        manager.initialized().await;

        let principal = assert_ok!(manager.signup("new@shop.in", "secret1").await);
        let state = manager.synchronized().await;
        assert_eq!(state.role, Some(UserRole::User));
        assert!(store.find_user(&principal.uid).await.unwrap().is_some());

        let err = assert_err!(manager.signup("new@shop.in", "secret1").await);
        assert!(matches!(err, StorefrontError::Auth(AuthFailure::EmailAlreadyInUse)));
    }

    #[tokio::test]
    async fn test_logout_clears_identity() {
        let (directory, provider, store) = setup();
        directory.add("asha@shop.in", "secret1", "u-asha");
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store));
        assert_ok!(manager.login("asha@shop.in", "secret1").await);
        manager.synchronized().await;

        assert_ok!(manager.logout().await);
        let state = manager.state();
        assert!(state.identity.is_none());
        assert_eq!(state.role, None);
        assert!(!state.is_loading);

        let state = manager.synchronized().await;
        assert!(state.identity.is_none());
        assert_eq!(manager.current_uid(), None);
    }

    #[tokio::test]
    async fn test_failed_logout_restores_session() {
        let (directory, provider, store) = setup();
        directory.add("asha@shop.in", "secret1", "u-asha");
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store));
        assert_ok!(manager.login("asha@shop.in", "secret1").await);
        manager.synchronized().await;

        provider.fail_sign_out(true);
        let err = assert_err!(manager.logout().await);
        assert!(matches!(err, StorefrontError::Auth(AuthFailure::NetworkFailure)));

        let state = manager.state();
        assert!(state.is_authenticated());
        assert_eq!(state.role, Some(UserRole::User));
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_stale_resolution_is_dropped() {
        let directory = Arc::new(Directory::default());
        let principal = directory.add("asha@shop.in", "secret1", "u-asha");
        let provider = Arc::new(ScriptedProvider::new(directory));
        let gate = Arc::new(tokio::sync::Mutex::new(()));
        let store = GatedStore {
            inner: MemoryDocumentStore::new(),
            gate: Arc::clone(&gate),
        };

        provider.emit(Some(principal));
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store));
        let state = manager.initialized().await;
        assert!(state.is_authenticated());

        // Hold record lookups so the refresh stalls mid-resolution
        let held = gate.lock().await;
        let refresh = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.refresh_authorization().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        provider.emit(None);
        wait_for_state(&manager, |s| s.identity.is_none()).await;

        drop(held);
        let refreshed = refresh.await.unwrap();
        assert!(refreshed.is_ok());

        let state = manager.state();
        assert!(state.identity.is_none());
        assert_eq!(state.role, None);
    }

    #[tokio::test]
    async fn test_federated_sign_in_and_cancel() {
        let (_, provider, store) = setup();
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store));
        manager.initialized().await;

        let err = assert_err!(
            manager
                .login_with_provider(FederatedCredential {
                    provider_id: "google.com".to_string(),
                    id_token: None,
                })
                .await
        );
        assert!(matches!(err, StorefrontError::Auth(AuthFailure::CancelledByUser)));
        assert_eq!(
            manager.state().last_error.map(|e| e.code),
            Some("cancelled-by-user".to_string())
        );

        let principal = assert_ok!(
            manager
                .login_with_provider(FederatedCredential::google("tok-1"))
                .await
        );
        let state = manager.synchronized().await;
        assert_eq!(state.identity.map(|p| p.uid), Some(principal.uid));
        assert_eq!(state.role, Some(UserRole::User));
    }

    #[tokio::test]
    async fn test_refresh_applies_block_and_role_changes() {
        let (directory, provider, store) = setup();
        let principal = directory.add("asha@shop.in", "secret1", "u-asha");
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store.clone()));
        assert_ok!(manager.login("asha@shop.in", "secret1").await);
        manager.synchronized().await;

        let admin = UserAdminService::new(Arc::new(store.clone()));
        assert_ok!(admin.set_role(&principal.uid, UserRole::Admin).await);
        let state = assert_ok!(manager.refresh_authorization().await);
        assert!(state.is_admin());

        assert_ok!(admin.toggle_blocked(&principal.uid).await);
        let err = assert_err!(manager.refresh_authorization().await);
        assert!(matches!(err, StorefrontError::AccountBlocked));

        let state = manager.state();
        assert!(state.identity.is_none());
        assert!(!state.is_admin());
        assert_eq!(provider.sign_out_count(), 1);
    }

    #[tokio::test]
    async fn test_password_reset() {
        let (directory, provider, store) = setup();
        directory.add("asha@shop.in", "secret1", "u-asha");
        let manager = SessionManager::start(provider, Arc::new(store));

        assert_ok!(manager.reset_password("asha@shop.in").await);
        assert_eq!(directory.resets(), vec!["asha@shop.in".to_string()]);

        let err = assert_err!(manager.reset_password("ghost@shop.in").await);
        assert!(matches!(err, StorefrontError::Auth(AuthFailure::NoSuchAccount)));
        assert!(!manager.state().is_loading);
    }

    #[tokio::test]
    async fn test_current_uid_follows_provider() {
        let (_, provider, store) = setup();
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store));
        assert_eq!(manager.current_uid(), None);

        provider.emit(Some(Principal::new("u-9", "nine@shop.in")));
        assert_eq!(manager.current_uid(), Some(UserId::new("u-9")));
    }
}

#[cfg(test)]
mod pagination_tests {
    use std::sync::Arc;

    use kernel::page::Cursor;
    use tokio_test::{assert_err, assert_ok};

    use super::fakes::*;
    use crate::application::pagination::encode_cursor;
    use crate::application::{PageAccumulator, PaginatedReader};
    use crate::domain::entity::{Category, Product};
    use crate::domain::repository::PagePosition;
    use crate::domain::value_object::collection::Collection;
    use crate::error::StorefrontError;
    use crate::infra::MemoryDocumentStore;

    fn newest_first(mut products: Vec<Product>) -> Vec<String> {
        products.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_str().cmp(a.id.as_str()))
        });
        products.into_iter().map(|p| p.id.as_str().to_string()).collect()
    }

    async fn walk(
        reader: &PaginatedReader<MemoryDocumentStore>,
        page_size: usize,
    ) -> (Vec<usize>, Vec<String>) {
        let mut sizes = Vec::new();
        let mut ids = Vec::new();
        let mut cursor: Option<Cursor> = None;
        loop {
            let page = reader
                .read::<Product>(page_size, cursor.as_ref())
                .await
                .unwrap();
            sizes.push(page.items.len());
            ids.extend(page.items.iter().map(|p| p.id.as_str().to_string()));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        (sizes, ids)
    }

    #[tokio::test]
    async fn test_pages_in_order_until_short_page() {
        let store = MemoryDocumentStore::new();
        let products = seed_products(&store, 45).await;
        let reader = PaginatedReader::new(Arc::new(store));

        let (sizes, ids) = walk(&reader, 20).await;
        assert_eq!(sizes, vec![20, 20, 5]);
        assert_eq!(ids, newest_first(products));
    }

    #[tokio::test]
    async fn test_exact_multiple_costs_one_empty_page() {
        let store = MemoryDocumentStore::new();
        seed_products(&store, 40).await;
        let reader = PaginatedReader::new(Arc::new(store));

        let (sizes, ids) = walk(&reader, 20).await;
        assert_eq!(sizes, vec![20, 20, 0]);
        assert_eq!(ids.len(), 40);
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let reader = PaginatedReader::new(Arc::new(MemoryDocumentStore::new()));
        let page = assert_ok!(reader.read::<Category>(10, None).await);
        assert!(page.items.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_rejects_bad_arguments() {
        let store = MemoryDocumentStore::new();
        seed_products(&store, 3).await;
        let reader = PaginatedReader::new(Arc::new(store));

        let err = assert_err!(reader.read::<Product>(0, None).await);
        assert!(matches!(err, StorefrontError::InvalidPageSize));

        let position = PagePosition {
            created_at: chrono::Utc::now(),
            id: "u-1".to_string(),
        };
        let foreign = encode_cursor(Collection::Users, &position).unwrap();
        let err = assert_err!(reader.read::<Product>(10, Some(&foreign)).await);
        assert!(matches!(err, StorefrontError::InvalidCursor(_)));

        let garbage = Cursor::new("%%%");
        let err = assert_err!(reader.read::<Product>(10, Some(&garbage)).await);
        assert!(matches!(err, StorefrontError::InvalidCursor(_)));
    }

    #[tokio::test]
    async fn test_store_failure_yields_no_page() {
        let reader = PaginatedReader::new(Arc::new(OfflineStore));
        let err = assert_err!(reader.read::<Product>(20, None).await);
        assert!(matches!(err, StorefrontError::Internal(_)));
    }

    #[tokio::test]
    async fn test_accumulator_collects_whole_collection() {
        let store = MemoryDocumentStore::new();
        let products = seed_products(&store, 45).await;
        let reader = PaginatedReader::new(Arc::new(store));

        let mut accumulator = PageAccumulator::new(20);
        let mut reads = 0;
        while let Some(ticket) = accumulator.next_ticket() {
            let page = reader.read::<Product>(20, ticket.cursor()).await.unwrap();
            assert!(accumulator.accept(ticket, page));
            reads += 1;
        }

        assert_eq!(reads, 3);
        assert!(!accumulator.has_more());
        let ids: Vec<String> = accumulator
            .into_items()
            .into_iter()
            .map(|p| p.id.as_str().to_string())
            .collect();
        assert_eq!(ids, newest_first(products));
    }

    #[tokio::test]
    async fn test_categories_page_newest_first() {
        let store = MemoryDocumentStore::new();
        seed_categories(&store, &[("c1", "Mugs"), ("c2", "Plates"), ("c3", "Bowls")]).await;
        let reader = PaginatedReader::new(Arc::new(store));

        let page = assert_ok!(reader.read::<Category>(2, None).await);
        assert_eq!(page.items.len(), 2);
        assert!(page.next_cursor.is_some());
        assert!(page.items[0].created_at >= page.items[1].created_at);
    }
}

#[cfg(test)]
mod guard_tests {
    use std::sync::Arc;

    use super::fakes::*;
    use crate::SessionManager;
    use crate::application::{GuardOutcome, require_authenticated, require_role};
    use crate::domain::value_object::user_role::UserRole;
    use crate::infra::MemoryDocumentStore;

    #[tokio::test]
    async fn test_guards_follow_session() {
        let directory = Arc::new(Directory::default());
        directory.add("asha@shop.in", "secret1", "u-asha");
        let provider = Arc::new(ScriptedProvider::new(directory));
        let store = MemoryDocumentStore::new();
        let manager = SessionManager::start(Arc::clone(&provider), Arc::new(store.clone()));

        // Listener has not run yet
        let state = manager.state();
        assert_eq!(require_authenticated(&state), GuardOutcome::Pending);
        assert_eq!(require_role(&state, UserRole::Admin), GuardOutcome::Pending);

        let state = manager.initialized().await;
        assert_eq!(require_authenticated(&state), GuardOutcome::RedirectToLogin);

        manager.login("asha@shop.in", "secret1").await.unwrap();
        let state = manager.synchronized().await;
        assert_eq!(require_authenticated(&state), GuardOutcome::Allow);
        assert_eq!(require_role(&state, UserRole::Admin), GuardOutcome::RedirectToLogin);
        assert_eq!(require_role(&state, UserRole::User), GuardOutcome::Allow);
    }
}

#[cfg(test)]
mod product_tests {
    use std::sync::Arc;

    use kernel::id::ProductId;
    use tokio_test::{assert_err, assert_ok};

    use super::fakes::*;
    use crate::application::{ProductService, StorefrontConfig};
    use crate::domain::entity::{ProductDraft, ProductImage, ProductPatch};
    use crate::error::StorefrontError;
    use crate::infra::MemoryDocumentStore;

    fn image(name: &str) -> ProductImage {
        ProductImage {
            url: format!("https://res.cloudinary.com/demo/image/upload/v17/products/{name}.jpg"),
            public_id: None,
            width: None,
            height: None,
        }
    }

    fn draft(images: Vec<ProductImage>) -> ProductDraft {
        ProductDraft {
            name: "  Stoneware Mug ".to_string(),
            description: "Hand glazed".to_string(),
            price: 349.0,
            stock: 12,
            category: "mugs".to_string(),
            images,
            features: vec!["Dishwasher safe".to_string(), "   ".to_string()],
            listed: None,
        }
    }

    fn service(
        host: RecordingImageHost,
    ) -> (
        ProductService<MemoryDocumentStore, RecordingImageHost>,
        Arc<RecordingImageHost>,
    ) {
        let host = Arc::new(host);
        let service = ProductService::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::clone(&host),
            Arc::new(StorefrontConfig::development()),
        );
        (service, host)
    }

    #[tokio::test]
    async fn test_create_normalizes_fields() {
        let (service, _) = service(RecordingImageHost::default());
        let product = assert_ok!(service.create(draft(vec![image("a")])).await);

        assert_eq!(product.name, "Stoneware Mug");
        assert_eq!(product.features, vec!["Dishwasher safe".to_string()]);
        assert!(product.listed);
        assert_eq!(assert_ok!(service.get(&product.id).await), product);
    }

    #[tokio::test]
    async fn test_update_deletes_dropped_images() {
        let (service, host) = service(RecordingImageHost::default());
        let product = service.create(draft(vec![image("a"), image("b")])).await.unwrap();

        let patch = ProductPatch {
            images: Some(vec![image("b")]),
            ..ProductPatch::default()
        };
        let updated = assert_ok!(service.update(&product.id, patch).await);
        assert_eq!(updated.images.len(), 1);
        assert_eq!(host.deleted(), vec!["products/a".to_string()]);

        assert_ok!(service.delete(&product.id).await);
        assert_eq!(host.deleted(), vec!["products/a".to_string(), "products/b".to_string()]);
        let err = assert_err!(service.get(&product.id).await);
        assert!(matches!(err, StorefrontError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_image_failures_do_not_fail_delete() {
        let (service, _) = service(RecordingImageHost::failing());
        let product = service.create(draft(vec![image("a")])).await.unwrap();
        assert_ok!(service.delete(&product.id).await);
    }

    #[tokio::test]
    async fn test_empty_patch_and_missing_product() {
        let (service, _) = service(RecordingImageHost::default());
        let product = service.create(draft(Vec::new())).await.unwrap();

        let err = assert_err!(service.update(&product.id, ProductPatch::default()).await);
        assert!(matches!(err, StorefrontError::EmptyUpdate));

        let patch = ProductPatch {
            price: Some(10.0),
            ..ProductPatch::default()
        };
        let err = assert_err!(service.update(&ProductId::new("nope"), patch).await);
        assert!(matches!(err, StorefrontError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_stock_out_of_range_is_rejected() {
        let (service, _) = service(RecordingImageHost::default());
        let product = service.create(draft(Vec::new())).await.unwrap();
        assert_eq!(product.stock, 12);

        for stock in [-1, i64::from(u32::MAX) + 1] {
            let patch = ProductPatch {
                stock: Some(stock),
                ..ProductPatch::default()
            };
            let err = assert_err!(service.update(&product.id, patch).await);
            assert!(matches!(err, StorefrontError::Validation(_)));
        }
        assert_eq!(service.get(&product.id).await.unwrap().stock, 12);

        let patch = ProductPatch {
            stock: Some(i64::from(u32::MAX)),
            ..ProductPatch::default()
        };
        let updated = assert_ok!(service.update(&product.id, patch).await);
        assert_eq!(updated.stock, u32::MAX);

        let err = assert_err!(
            service
                .create(ProductDraft {
                    stock: -5,
                    ..draft(Vec::new())
                })
                .await
        );
        assert!(matches!(err, StorefrontError::Validation(_)));
    }

    #[tokio::test]
    async fn test_toggle_listing() {
        let (service, _) = service(RecordingImageHost::default());
        let product = service.create(draft(Vec::new())).await.unwrap();

        let hidden = assert_ok!(service.toggle_listing(&product.id).await);
        assert!(!hidden.listed);
        let shown = assert_ok!(service.toggle_listing(&product.id).await);
        assert!(shown.listed);
    }
}

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, Response, StatusCode, header};
    use chrono::Utc;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::fakes::*;
    use crate::domain::entity::UserRecord;
    use crate::domain::value_object::user_role::UserRole;
    use crate::infra::MemoryDocumentStore;
    use crate::{ProviderFactory, StorefrontConfig, StorefrontState, storefront_router};

    struct TestApp {
        router: Router,
        store: MemoryDocumentStore,
        directory: Arc<Directory>,
    }

    fn app() -> TestApp {
        let store = MemoryDocumentStore::new();
        let directory = Arc::new(Directory::default());
        let accounts = Arc::clone(&directory);
        let factory: ProviderFactory<ScriptedProvider> =
            Arc::new(move || ScriptedProvider::new(Arc::clone(&accounts)));
        let state = StorefrontState::new(
            store.clone(),
            RecordingImageHost::default(),
            StorefrontConfig::development(),
            factory,
        );
        TestApp {
            router: storefront_router(state),
            store,
            directory,
        }
    }

    impl TestApp {
        async fn send(
            &self,
            method: Method,
            uri: &str,
            cookie: Option<&str>,
            body: Option<Value>,
        ) -> Response<Body> {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(cookie) = cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.router.clone().oneshot(request).await.unwrap()
        }

        /// Sign in and return the session cookie
        async fn login(&self, email: &str, password: &str) -> String {
            let response = self
                .send(
                    Method::POST,
                    "/api/auth/login",
                    None,
                    Some(json!({ "email": email, "password": password })),
                )
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            session_cookie(&response).expect("login sets a session cookie")
        }

        async fn seed_admin(&self, email: &str, uid: &str) {
            let principal = self.directory.add(email, "secret1", uid);
            self.store
                .seed_user(UserRecord {
                    role: Some(UserRole::Admin),
                    ..UserRecord::for_principal(&principal, Utc::now())
                })
                .await;
        }
    }

    fn session_cookie(response: &Response<Body>) -> Option<String> {
        let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
        value.split(';').next().map(str::to_string)
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn test_public_pages_render() {
        let app = app();
        for uri in ["/", "/login", "/signup"] {
            let response = app.send(Method::GET, uri, None, None).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
            assert!(content_type.starts_with("text/html"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_guarded_page_redirects_to_login() {
        let app = app();
        let response = app.send(Method::GET, "/products", None, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_admin_api_requires_session() {
        let app = app();
        let response = app.send(Method::GET, "/api/admin/users", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-auth-required"], "true");
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_status() {
        let app = app();
        app.directory.add("asha@shop.in", "secret1", "u-asha");

        let anonymous = json_body(app.send(Method::GET, "/api/auth/status", None, None).await).await;
        assert_eq!(anonymous["authenticated"], false);
        assert_eq!(anonymous["isInitializing"], false);

        let cookie = app.login("asha@shop.in", "secret1").await;
        let status = json_body(
            app.send(Method::GET, "/api/auth/status", Some(&cookie), None)
                .await,
        )
        .await;
        assert_eq!(status["authenticated"], true);
        assert_eq!(status["isAdmin"], false);
        assert_eq!(status["role"], "user");
        assert_eq!(status["user"]["email"], "asha@shop.in");

        let response = app.send(Method::GET, "/products", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejected_logins() {
        let app = app();
        app.directory.add("asha@shop.in", "secret1", "u-asha");

        let response = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "asha@shop.in", "password": "wrong12" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(session_cookie(&response).is_none());
        assert_eq!(json_body(response).await["code"], "wrong-credentials");

        let response = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "not-an-email", "password": "secret1" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], "validation-failed");
    }

    #[tokio::test]
    async fn test_blocked_account_cannot_sign_in() {
        let app = app();
        let principal = app.directory.add("mal@shop.in", "secret1", "u-mal");
        app.store
            .seed_user(UserRecord {
                blocked: true,
                ..UserRecord::for_principal(&principal, Utc::now())
            })
            .await;

        let response = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "mal@shop.in", "password": "secret1" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(session_cookie(&response).is_none());
        assert_eq!(json_body(response).await["code"], "account-blocked");
    }

    #[tokio::test]
    async fn test_signup_creates_user_record() {
        let app = app();
        let response = app
            .send(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({
                    "email": "new@shop.in",
                    "password": "secret1",
                    "confirmPassword": "secret1"
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(session_cookie(&response).is_some());

        let body = json_body(response).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["role"], "user");
    }

    #[tokio::test]
    async fn test_admin_manages_catalog() {
        let app = app();
        app.seed_admin("root@shop.in", "u-root").await;
        app.directory.add("asha@shop.in", "secret1", "u-asha");
        let admin = app.login("root@shop.in", "secret1").await;
        let user = app.login("asha@shop.in", "secret1").await;

        let response = app
            .send(Method::GET, "/api/admin/users", Some(&user), None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = app.send(Method::GET, "/admin", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = app
            .send(
                Method::POST,
                "/api/admin/categories",
                Some(&admin),
                Some(json!({ "name": "Mugs" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let category = json_body(response).await;
        let category_id = category["id"].as_str().unwrap().to_string();

        let response = app
            .send(
                Method::POST,
                "/api/admin/products",
                Some(&admin),
                Some(json!({
                    "name": "Stoneware Mug",
                    "price": 349.0,
                    "stock": 10,
                    "category": category_id
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let catalog = json_body(
            app.send(Method::GET, "/api/catalog/products", None, None)
                .await,
        )
        .await;
        assert_eq!(catalog["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(catalog["items"][0]["name"], "Stoneware Mug");

        let response = app.send(Method::GET, "/admin", Some(&admin), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_blocking_ends_live_session() {
        let app = app();
        app.seed_admin("root@shop.in", "u-root").await;
        app.directory.add("asha@shop.in", "secret1", "u-asha");
        let admin = app.login("root@shop.in", "secret1").await;
        let user = app.login("asha@shop.in", "secret1").await;

        let response = app
            .send(Method::GET, "/api/account/profile", Some(&user), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .send(
                Method::POST,
                "/api/admin/users/u-asha/toggle-block",
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["blocked"], true);

        let status = json_body(
            app.send(Method::GET, "/api/auth/status", Some(&user), None)
                .await,
        )
        .await;
        assert_eq!(status["authenticated"], false);
        assert_eq!(status["lastError"]["code"], "account-blocked");

        let response = app
            .send(Method::GET, "/api/account/profile", Some(&user), None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // The forced-out session is gone once its reason was reported
        let status = json_body(
            app.send(Method::GET, "/api/auth/status", Some(&user), None)
                .await,
        )
        .await;
        assert_eq!(status["authenticated"], false);
        assert!(status["lastError"].is_null());
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = app();
        app.directory.add("asha@shop.in", "secret1", "u-asha");
        let cookie = app.login("asha@shop.in", "secret1").await;

        let response = app
            .send(Method::POST, "/api/auth/logout", Some(&cookie), None)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(header::SET_COOKIE));

        let status = json_body(
            app.send(Method::GET, "/api/auth/status", Some(&cookie), None)
                .await,
        )
        .await;
        assert_eq!(status["authenticated"], false);

        let response = app.send(Method::GET, "/products", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let app = app();
        let response = app
            .send(Method::GET, "/api/catalog/products?pageSize=0", None, None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "invalid-page-size");
    }
}

#[cfg(test)]
mod registry_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use chrono::Utc;
    use kernel::id::UserId;

    use super::fakes::*;
    use crate::application::SessionLifetime;
    use crate::domain::entity::UserRecord;
    use crate::infra::MemoryDocumentStore;
    use crate::presentation::{ProviderFactory, SessionRegistry};

    const HOUR: Duration = Duration::from_secs(3600);

    fn registry_with(
        directory: &Arc<Directory>,
        store: Arc<MemoryDocumentStore>,
        lifetime: SessionLifetime,
    ) -> SessionRegistry<ScriptedProvider, MemoryDocumentStore> {
        let accounts = Arc::clone(directory);
        let factory: ProviderFactory<ScriptedProvider> =
            Arc::new(move || ScriptedProvider::new(Arc::clone(&accounts)));
        SessionRegistry::new(factory, store, [7u8; 32], lifetime)
    }

    fn registry(directory: &Arc<Directory>) -> SessionRegistry<ScriptedProvider, MemoryDocumentStore> {
        let lifetime = SessionLifetime {
            absolute: 12 * HOUR,
            idle: 2 * HOUR,
        };
        registry_with(directory, Arc::new(MemoryDocumentStore::new()), lifetime)
    }

    #[tokio::test]
    async fn test_tokens_verify_only_when_untampered() {
        let registry = registry(&Arc::new(Directory::default()));
        let (id, _, created) = registry.get_or_create(None).await;
        assert!(created);

        let token = registry.issue_token(id);
        assert_eq!(registry.verify(&token), Some(id));

        let mut forged = token.clone();
        forged.replace_range(0..1, if token.starts_with('0') { "1" } else { "0" });
        assert_eq!(registry.verify(&forged), None);
        assert_eq!(registry.verify("garbage"), None);
    }

    #[tokio::test]
    async fn test_sessions_are_reused_and_removed() {
        let registry = registry(&Arc::new(Directory::default()));
        let (id, first, _) = registry.get_or_create(None).await;
        let (same, second, created) = registry.get_or_create(Some(id)).await;
        assert_eq!(same, id);
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove(id).await.is_some());
        assert!(registry.is_empty().await);

        // An unknown id gets a fresh session
        let (fresh, _, created) = registry.get_or_create(Some(id)).await;
        assert_ne!(fresh, id);
        assert!(created);
    }

    #[tokio::test]
    async fn test_refresh_user_targets_matching_sessions() {
        let directory = Arc::new(Directory::default());
        directory.add("asha@shop.in", "secret1", "u-asha");
        directory.add("ravi@shop.in", "secret1", "u-ravi");
        let registry = registry(&directory);

        let (_, asha, _) = registry.get_or_create(None).await;
        let (_, ravi, _) = registry.get_or_create(None).await;
        asha.login("asha@shop.in", "secret1").await.unwrap();
        ravi.login("ravi@shop.in", "secret1").await.unwrap();

        assert_eq!(registry.refresh_user(&UserId::new("u-asha")).await, 1);
        assert_eq!(registry.refresh_user(&UserId::new("u-nobody")).await, 0);
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_and_expired_sessions() {
        let registry = registry(&Arc::new(Directory::default()));
        for _ in 0..3 {
            registry.get_or_create(None).await;
        }

        assert_eq!(registry.sweep(Instant::now()).await, 0);
        assert_eq!(registry.len().await, 3);

        assert_eq!(registry.sweep(Instant::now() + 3 * HOUR).await, 3);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_sessions_make_room_for_new_ones() {
        let directory = Arc::new(Directory::default());
        directory.add("asha@shop.in", "secret1", "u-asha");
        let lifetime = SessionLifetime {
            absolute: HOUR,
            idle: Duration::from_millis(250),
        };
        let registry = registry_with(&directory, Arc::new(MemoryDocumentStore::new()), lifetime);

        let mut first = None;
        for _ in 0..20 {
            let (id, manager, _) = registry.get_or_create(None).await;
            manager.login("asha@shop.in", "secret1").await.unwrap();
            first.get_or_insert(id);
        }
        assert_eq!(registry.len().await, 20);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let (_, _, created) = registry.get_or_create(None).await;
        assert!(created);
        assert_eq!(registry.len().await, 1);
        assert!(registry.lookup(first.unwrap()).await.is_none());
    }

    #[tokio::test]
    async fn test_blocked_sessions_are_retired_after_one_read() {
        let directory = Arc::new(Directory::default());
        let principal = directory.add("asha@shop.in", "secret1", "u-asha");
        let store = Arc::new(MemoryDocumentStore::new());
        let registry = registry_with(
            &directory,
            Arc::clone(&store),
            SessionLifetime {
                absolute: 12 * HOUR,
                idle: 2 * HOUR,
            },
        );

        let (id, manager, _) = registry.get_or_create(None).await;
        manager.login("asha@shop.in", "secret1").await.unwrap();
        manager.synchronized().await;

        store
            .seed_user(UserRecord {
                blocked: true,
                ..UserRecord::for_principal(&principal, Utc::now())
            })
            .await;
        assert_eq!(registry.refresh_user(&UserId::new("u-asha")).await, 1);

        let retired = registry.lookup(id).await.unwrap();
        let state = retired.state();
        assert!(state.identity.is_none());
        assert_eq!(
            state.last_error.as_ref().map(|e| e.code.as_str()),
            Some("account-blocked")
        );

        assert!(registry.lookup(id).await.is_none());
        assert!(registry.is_empty().await);
    }
}
