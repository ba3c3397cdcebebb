use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::ClientError;
use crate::session::identity::Identity;
use crate::session::storage::{DurableStorage, REFRESH_TOKEN_KEY, SESSION_KEYS, TOKEN_KEY, USER_INFO_KEY};

/// Snapshot of the current session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub identity: Option<Identity>,
    pub logged_in: bool,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.identity.is_none()
    }
}

/// Session changes other components react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    TokenUpdated,
    IdentityChanged,
    /// Session was cleared; the UI must go back to the login page
    LoggedOut,
}

/// How `restore` left the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing persisted
    Anonymous,
    /// Token and cached identity snapshot restored
    Cached,
    /// Token restored, identity fetched live
    Fetched,
    /// Token restored but the identity fetch failed; session cleared
    Expired,
}

/// Live source of the current identity, consulted when no snapshot is cached
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn fetch_identity(&self) -> Result<Identity, ClientError>;
}

/// Owner of the session. All mutation goes through these actions.
pub struct SessionStore {
    state: RwLock<Session>,
    storage: Arc<dyn DurableStorage>,
    events: broadcast::Sender<SessionEvent>,
    identity_epoch: AtomicU64,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            state: RwLock::new(Session::default()),
            storage,
            events,
            identity_epoch: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    /// A session is authenticated as soon as it holds an access token
    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }

    /// Bumped on every `set_identity`; route tables are keyed on it
    pub fn identity_epoch(&self) -> u64 {
        self.identity_epoch.load(Ordering::SeqCst)
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.persist(TOKEN_KEY, &token);
        self.write().access_token = Some(token);
        self.emit(SessionEvent::TokenUpdated);
    }

    pub fn set_refresh_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.persist(REFRESH_TOKEN_KEY, &token);
        self.write().refresh_token = Some(token);
    }

    /// Forget the refresh token, in memory and in durable storage
    pub fn clear_refresh_token(&self) {
        if let Err(e) = self.storage.remove(REFRESH_TOKEN_KEY) {
            tracing::warn!("Failed to remove '{}' from session storage: {}", REFRESH_TOKEN_KEY, e);
        }
        self.write().refresh_token = None;
    }

    /// Replace the identity wholesale
    pub fn set_identity(&self, identity: Identity) {
        match serde_json::to_string(&identity) {
            Ok(json) => self.persist(USER_INFO_KEY, &json),
            Err(e) => tracing::warn!("Failed to serialize identity snapshot: {}", e),
        }
        self.apply_identity(identity);
    }

    /// Merge permissions issued alongside the menu without changing the identity epoch
    pub fn grant_permissions(&self, permissions: &BTreeSet<String>) {
        let mut state = self.write();
        if let Some(identity) = state.identity.as_mut() {
            identity.permissions.extend(permissions.iter().cloned());
        }
    }

    /// Clear memory and durable state. Returns whether anything was cleared.
    pub fn logout(&self) -> bool {
        let cleared = {
            let mut state = self.write();
            let had_session = !state.is_empty() || state.logged_in;
            *state = Session::default();
            had_session
        };

        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!("Failed to remove '{}' from session storage: {}", key, e);
            }
        }

        if cleared {
            tracing::info!("Session cleared");
            self.emit(SessionEvent::LoggedOut);
        }
        cleared
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.read()
            .identity
            .as_ref()
            .map(|identity| identity.has_permission(permission))
            .unwrap_or(false)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.read()
            .identity
            .as_ref()
            .map(|identity| identity.has_role(role))
            .unwrap_or(false)
    }

    pub fn roles(&self) -> BTreeSet<String> {
        self.read()
            .identity
            .as_ref()
            .map(|identity| identity.roles.clone())
            .unwrap_or_default()
    }

    /// Rebuild the session from durable storage at process start
    pub async fn restore(&self, source: &dyn IdentitySource) -> RestoreOutcome {
        let Some(token) = self.load(TOKEN_KEY) else {
            tracing::debug!("No persisted access token; starting anonymous");
            return RestoreOutcome::Anonymous;
        };

        {
            let mut state = self.write();
            state.access_token = Some(token);
            state.refresh_token = self.load(REFRESH_TOKEN_KEY);
        }

        if let Some(cached) = self.load(USER_INFO_KEY) {
            match serde_json::from_str::<Identity>(&cached) {
                Ok(identity) => {
                    tracing::debug!("Restored cached identity for '{}'", identity.username);
                    self.apply_identity(identity);
                    return RestoreOutcome::Cached;
                }
                Err(e) => tracing::warn!("Discarding unreadable identity snapshot: {}", e),
            }
        }

        match source.fetch_identity().await {
            Ok(identity) => {
                self.set_identity(identity);
                RestoreOutcome::Fetched
            }
            Err(e) => {
                tracing::warn!("Failed to fetch identity while restoring session: {}", e);
                self.logout();
                RestoreOutcome::Expired
            }
        }
    }

    fn apply_identity(&self, identity: Identity) {
        {
            let mut state = self.write();
            state.identity = Some(identity);
            state.logged_in = true;
        }
        self.identity_epoch.fetch_add(1, Ordering::SeqCst);
        self.emit(SessionEvent::IdentityChanged);
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read '{}' from session storage: {}", key, e);
                None
            }
        }
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            tracing::warn!("Failed to persist '{}' to session storage: {}", key, e);
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStorage;
    use std::sync::atomic::AtomicUsize;

    struct CountingSource {
        calls: AtomicUsize,
        result: Result<Identity, ()>,
    }

    #[async_trait]
    impl IdentitySource for CountingSource {
        async fn fetch_identity(&self) -> Result<Identity, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map_err(|_| ClientError::http(500, "identity service down"))
        }
    }

    fn store_with(storage: Arc<MemoryStorage>) -> SessionStore {
        SessionStore::new(storage)
    }

    #[test]
    fn test_has_permission_is_membership() {
        let store = store_with(Arc::new(MemoryStorage::new()));
        assert!(!store.has_permission("system:user:list"));

        store.set_identity(Identity::new(1, "admin").with_permissions(["system:user:list"]));
        assert!(store.has_permission("system:user:list"));
        assert!(!store.has_permission("system:user:delete"));

        store.logout();
        assert!(!store.has_permission("system:user:list"));
    }

    #[test]
    fn test_logout_is_idempotent_and_clears_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(storage.clone());
        let mut events = store.subscribe();

        store.set_token("access");
        store.set_refresh_token("refresh");
        store.set_identity(Identity::new(1, "admin"));
        assert_eq!(storage.len(), 3);

        assert!(store.logout());
        assert!(!store.logout());
        assert!(storage.is_empty());
        assert_eq!(store.snapshot(), Session::default());

        let mut logged_out = 0;
        while let Ok(event) = events.try_recv() {
            if event == SessionEvent::LoggedOut {
                logged_out += 1;
            }
        }
        assert_eq!(logged_out, 1);
    }

    #[test]
    fn test_identity_epoch_and_permission_grants() {
        let store = store_with(Arc::new(MemoryStorage::new()));
        store.set_identity(Identity::new(1, "admin").with_roles(["admin"]));
        let epoch = store.identity_epoch();

        store.grant_permissions(&["flow:manage".to_string()].into_iter().collect());
        assert!(store.has_permission("flow:manage"));
        assert_eq!(store.identity_epoch(), epoch);

        store.set_identity(Identity::new(2, "ops"));
        assert!(store.identity_epoch() > epoch);
    }

    #[tokio::test]
    async fn test_restore_prefers_cached_identity() {
        let cached = serde_json::to_string(&Identity::new(4, "cached")).unwrap();
        let storage = Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, "access"),
            (USER_INFO_KEY, cached.as_str()),
        ]));
        let store = store_with(storage);
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            result: Ok(Identity::new(5, "live")),
        };

        assert_eq!(store.restore(&source).await, RestoreOutcome::Cached);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.identity().unwrap().username, "cached");
        assert!(store.snapshot().logged_in);
    }

    #[tokio::test]
    async fn test_restore_without_snapshot_fetches_once_and_logs_out_on_failure() {
        let storage = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, "access"), (REFRESH_TOKEN_KEY, "r")]));
        let store = store_with(storage.clone());
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            result: Err(()),
        };

        assert_eq!(store.restore(&source).await, RestoreOutcome::Expired);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.snapshot(), Session::default());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_restore_anonymous() {
        let store = store_with(Arc::new(MemoryStorage::new()));
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            result: Ok(Identity::new(1, "x")),
        };
        assert_eq!(store.restore(&source).await, RestoreOutcome::Anonymous);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(!store.is_authenticated());
    }
}
