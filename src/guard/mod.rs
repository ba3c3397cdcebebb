// Navigation guard
//
// Every navigation attempt passes through `navigate`. The first authenticated
// navigation after a login (or identity change) fetches the menu and builds
// the route table; later ones only resolve against it.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::ClientError;
use crate::menu::{MenuResolver, MenuSource};
use crate::routing::synth::normalize_path;
use crate::routing::table::strip_target;
use crate::routing::{synthesize, visible_menu, ComponentRegistry, ResolvedRoute, RouteDefinition, RouteTable};
use crate::session::{IdentitySource, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GuardState {
    Unauthenticated,
    /// Logged in, route table not yet built for the current identity
    AuthenticatedNoRoutes,
    AuthenticatedReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RedirectReason {
    LoginRequired,
    AlreadyLoggedIn,
    /// The matched route declares a redirect
    RouteRedirect,
    /// Building the routes failed; the session was ended
    SessionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum NavigationOutcome {
    Proceed { route: ResolvedRoute, title: String },
    Redirect { to: String, reason: RedirectReason },
}

impl NavigationOutcome {
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            NavigationOutcome::Redirect { to, .. } => Some(to),
            NavigationOutcome::Proceed { .. } => None,
        }
    }
}

pub struct NavigationGuard {
    session: Arc<SessionStore>,
    identity: Arc<dyn IdentitySource>,
    menus: Arc<MenuResolver>,
    registry: Arc<ComponentRegistry>,
    routes: RwLock<RouteTable>,
    definitions: RwLock<Vec<RouteDefinition>>,
    menu_source: RwLock<Option<MenuSource>>,
    // Serializes route synthesis between concurrent navigations
    synthesis: Mutex<()>,
    login_path: String,
    landing_path: String,
    title_suffix: String,
}

impl NavigationGuard {
    pub fn new(
        config: &AppConfig,
        session: Arc<SessionStore>,
        identity: Arc<dyn IdentitySource>,
        menus: Arc<MenuResolver>,
        registry: Arc<ComponentRegistry>,
    ) -> Self {
        Self {
            session,
            identity,
            menus,
            registry,
            routes: RwLock::new(RouteTable::new(&config.auth)),
            definitions: RwLock::new(Vec::new()),
            menu_source: RwLock::new(None),
            synthesis: Mutex::new(()),
            login_path: normalize_path(&config.auth.login_path),
            landing_path: normalize_path(&config.auth.landing_path),
            title_suffix: config.routing.title_suffix.clone(),
        }
    }

    pub fn state(&self) -> GuardState {
        if !self.session.is_authenticated() {
            return GuardState::Unauthenticated;
        }
        let synthesized = self.read_routes().synthesized_epoch();
        if self.session.identity().is_some() && synthesized == Some(self.session.identity_epoch()) {
            GuardState::AuthenticatedReady
        } else {
            GuardState::AuthenticatedNoRoutes
        }
    }

    /// Decide what happens to a navigation towards `target`
    pub async fn navigate(&self, target: &str) -> NavigationOutcome {
        let path = strip_target(target);
        let to_login = path == self.login_path;

        if !self.session.is_authenticated() {
            self.reset();
            if to_login {
                return self.resolve(target);
            }
            tracing::debug!("Navigation to {} requires login", path);
            return self.redirect(&self.login_path, RedirectReason::LoginRequired);
        }

        if to_login {
            return self.redirect(&self.landing_path, RedirectReason::AlreadyLoggedIn);
        }

        if self.state() == GuardState::AuthenticatedNoRoutes {
            if let Err(e) = self.prepare_routes().await {
                tracing::warn!("Could not prepare routes, ending session: {}", e);
                self.session.logout();
                self.reset();
                return self.redirect(&self.login_path, RedirectReason::SessionFailed);
            }
        }

        // Re-dispatch against the populated table
        self.resolve(target)
    }

    /// Build the route table for the current identity, once
    pub async fn prepare_routes(&self) -> Result<(), ClientError> {
        let _synthesis = self.synthesis.lock().await;
        if self.state() != GuardState::AuthenticatedNoRoutes {
            return Ok(());
        }

        if self.session.identity().is_none() {
            let identity = self.identity.fetch_identity().await?;
            self.session.set_identity(identity);
        }
        let epoch = self.session.identity_epoch();

        let snapshot = self.menus.fetch_menu().await?;
        // The session may have ended underneath the fetch
        if !self.session.is_authenticated() {
            return Err(ClientError::SessionExpired);
        }
        self.session.grant_permissions(&snapshot.permissions);
        let definitions = synthesize(&snapshot.menu_tree, &self.session.roles(), &self.registry);

        {
            let mut table = self.write_routes();
            table.reset();
            table.register(&definitions);
            table.mark_synthesized(epoch);
        }
        *self.definitions.write().unwrap_or_else(PoisonError::into_inner) = definitions;
        *self.menu_source.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.source);

        tracing::info!("Route table ready for identity epoch {}", epoch);
        Ok(())
    }

    /// Drop the synthesized routes; the guard falls back to its initial state
    pub fn reset(&self) {
        let had_routes = {
            let mut table = self.write_routes();
            let had = table.synthesized_epoch().is_some() || table.dynamic_len() > 0;
            table.reset();
            had
        };
        if had_routes {
            self.definitions.write().unwrap_or_else(PoisonError::into_inner).clear();
            *self.menu_source.write().unwrap_or_else(PoisonError::into_inner) = None;
        }
    }

    pub fn route_table(&self) -> RouteTable {
        self.read_routes().clone()
    }

    /// Synthesized route tree of the current session
    pub fn routes(&self) -> Vec<RouteDefinition> {
        self.definitions.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Sidebar tree of the current session
    pub fn sidebar(&self) -> Vec<RouteDefinition> {
        visible_menu(&self.definitions.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn menu_source(&self) -> Option<MenuSource> {
        *self.menu_source.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, target: &str) -> NavigationOutcome {
        let route = self.read_routes().resolve(target);
        if let Some(redirect) = route.record.redirect.clone() {
            if normalize_path(&redirect) != route.path {
                return self.redirect(&redirect, RedirectReason::RouteRedirect);
            }
        }
        let title = self.title_for(&route.record.meta.title);
        NavigationOutcome::Proceed { route, title }
    }

    fn redirect(&self, to: &str, reason: RedirectReason) -> NavigationOutcome {
        NavigationOutcome::Redirect {
            to: to.to_string(),
            reason,
        }
    }

    fn title_for(&self, title: &str) -> String {
        if title.is_empty() {
            self.title_suffix.clone()
        } else {
            format!("{} - {}", title, self.title_suffix)
        }
    }

    fn read_routes(&self) -> RwLockReadGuard<'_, RouteTable> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_routes(&self) -> RwLockWriteGuard<'_, RouteTable> {
        self.routes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthApi, INFO_PATH};
    use crate::http::ApiClient;
    use crate::menu::NAV_PATH;
    use crate::session::{Identity, MemoryStorage};
    use crate::testing::ScriptedBackend;
    use serde_json::json;

    struct Fixture {
        backend: Arc<ScriptedBackend>,
        session: Arc<SessionStore>,
        guard: NavigationGuard,
    }

    fn fixture() -> Fixture {
        let config = AppConfig::for_base_url("http://localhost:8080/api");
        let backend = Arc::new(ScriptedBackend::new());
        let session = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
        let client = Arc::new(ApiClient::new(backend.clone(), session.clone()));
        let auth = Arc::new(AuthApi::new(client.clone(), config.auth.clone(), "test"));
        let guard = NavigationGuard::new(
            &config,
            session.clone(),
            auth,
            Arc::new(MenuResolver::new(client)),
            Arc::new(ComponentRegistry::console_defaults()),
        );
        Fixture {
            backend,
            session,
            guard,
        }
    }

    fn nav_payload() -> serde_json::Value {
        json!({
            "menuList": [
                {"id": 1, "path": "/dashboard", "name": "Dashboard", "component": "modules/dashboard/Dashboard.vue",
                 "meta": {"title": "Home"}},
                {"id": 2, "path": "/system", "name": "System", "component": "modules/system/index.vue",
                 "meta": {"title": "System"},
                 "children": [
                    {"id": 21, "path": "user", "name": "User", "component": "modules/system/user/UserList.vue",
                     "meta": {"title": "Users", "roles": ["admin"]}},
                    {"id": 22, "path": "role", "name": "Role", "component": "modules/system/role/RoleList.vue",
                     "meta": {"title": "Roles", "roles": ["admin"]}}
                 ]}
            ],
            "permissions": ["system:user:list"]
        })
    }

    #[tokio::test]
    async fn test_anonymous_redirected_to_login() {
        let f = fixture();
        assert_eq!(f.guard.state(), GuardState::Unauthenticated);

        let outcome = f.guard.navigate("/system/user").await;
        assert_eq!(
            outcome,
            NavigationOutcome::Redirect {
                to: "/login".into(),
                reason: RedirectReason::LoginRequired
            }
        );
        match f.guard.navigate("/login").await {
            NavigationOutcome::Proceed { route, title } => {
                assert_eq!(route.record.name, "Login");
                assert_eq!(title, "Login - Staoo Admin");
            }
            other => panic!("expected login page, got {:?}", other),
        }
        assert_eq!(f.backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_logged_in_user_bounced_off_login() {
        let f = fixture();
        f.session.set_token("t");
        let outcome = f.guard.navigate("/login").await;
        assert_eq!(outcome.redirect_target(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn test_first_navigation_builds_routes_once() {
        let f = fixture();
        f.backend.on_ok(NAV_PATH, nav_payload());
        f.session.set_token("t");
        f.session.set_identity(Identity::new(1, "admin").with_roles(["admin"]));

        match f.guard.navigate("/system/user").await {
            NavigationOutcome::Proceed { route, title } => {
                assert_eq!(route.record.name, "User");
                assert_eq!(title, "Users - Staoo Admin");
            }
            other => panic!("expected proceed, got {:?}", other),
        }
        assert_eq!(f.guard.state(), GuardState::AuthenticatedReady);
        assert!(f.session.has_permission("system:user:list"));

        f.guard.navigate("/system/role").await;
        f.guard.navigate("/dashboard").await;
        assert_eq!(f.backend.calls_to(NAV_PATH), 1);
        assert_eq!(f.backend.calls_to(INFO_PATH), 0);
    }

    #[tokio::test]
    async fn test_identity_fetched_when_missing() {
        let f = fixture();
        f.backend.on_ok(NAV_PATH, nav_payload());
        f.backend.on_ok(INFO_PATH, json!({"id": 3, "username": "ann", "roles": ["user"]}));
        f.session.set_token("t");

        let outcome = f.guard.navigate("/system/user").await;
        // Restricted for role `user`
        match outcome {
            NavigationOutcome::Proceed { route, .. } => assert!(route.is_not_found()),
            other => panic!("expected not-found page, got {:?}", other),
        }
        assert_eq!(f.backend.calls_to(INFO_PATH), 1);
        let sidebar: Vec<String> = f.guard.sidebar().iter().map(|r| r.name.clone()).collect();
        assert_eq!(sidebar, vec!["Dashboard", "System"]);
        assert!(f.guard.sidebar()[1].children.is_empty());
    }

    #[tokio::test]
    async fn test_failure_while_preparing_ends_session() {
        let f = fixture();
        f.backend.on_status(INFO_PATH, 500);
        f.session.set_token("t");
        let mut events = f.session.subscribe();

        let outcome = f.guard.navigate("/dashboard").await;
        assert_eq!(
            outcome,
            NavigationOutcome::Redirect {
                to: "/login".into(),
                reason: RedirectReason::SessionFailed
            }
        );
        assert!(!f.session.is_authenticated());
        assert_eq!(events.try_recv().unwrap(), crate::session::SessionEvent::LoggedOut);
        assert_eq!(f.guard.state(), GuardState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_refresh_server_error_while_preparing_ends_session() {
        let f = fixture();
        f.backend.require_token("fresh");
        f.backend.on_refresh_status(503);
        f.backend.on_ok(NAV_PATH, nav_payload());
        f.session.set_token("stale");
        f.session.set_refresh_token("refresh-1");
        f.session.set_identity(Identity::new(1, "admin").with_roles(["admin"]));
        let mut events = f.session.subscribe();

        let outcome = f.guard.navigate("/dashboard").await;
        assert_eq!(
            outcome,
            NavigationOutcome::Redirect {
                to: "/login".into(),
                reason: RedirectReason::SessionFailed
            }
        );
        assert!(!f.session.is_authenticated());
        assert_eq!(f.guard.state(), GuardState::Unauthenticated);
        assert_eq!(f.guard.route_table().synthesized_epoch(), None);
        assert!(f.guard.routes().is_empty());

        let mut logouts = 0;
        while let Ok(event) = events.try_recv() {
            if event == crate::session::SessionEvent::LoggedOut {
                logouts += 1;
            }
        }
        assert_eq!(logouts, 1);
    }

    #[tokio::test]
    async fn test_root_redirects_to_landing() {
        let f = fixture();
        f.backend.on_ok(NAV_PATH, nav_payload());
        f.session.set_token("t");
        f.session.set_identity(Identity::new(1, "admin"));

        let outcome = f.guard.navigate("/").await;
        assert_eq!(
            outcome,
            NavigationOutcome::Redirect {
                to: "/dashboard".into(),
                reason: RedirectReason::RouteRedirect
            }
        );
    }

    #[tokio::test]
    async fn test_identity_change_regenerates_routes() {
        let f = fixture();
        f.backend.on_ok(NAV_PATH, nav_payload());
        f.session.set_token("t");
        f.session.set_identity(Identity::new(1, "ann").with_roles(["user"]));
        assert!(f.guard.navigate("/system/user").await.redirect_target().is_none());
        assert!(!f.guard.route_table().has_route("/system/user", "User"));

        f.session.set_identity(Identity::new(1, "ann").with_roles(["admin"]));
        assert_eq!(f.guard.state(), GuardState::AuthenticatedNoRoutes);
        f.guard.navigate("/system/user").await;
        assert!(f.guard.route_table().has_route("/system/user", "User"));
        assert_eq!(f.backend.calls_to(NAV_PATH), 2);
    }

    #[tokio::test]
    async fn test_logout_resets_routes() {
        let f = fixture();
        f.backend.on_ok(NAV_PATH, nav_payload());
        f.session.set_token("t");
        f.session.set_identity(Identity::new(1, "admin"));
        f.guard.navigate("/dashboard").await;
        assert!(f.guard.route_table().dynamic_len() > 0);

        f.session.logout();
        f.guard.navigate("/dashboard").await;
        assert_eq!(f.guard.route_table().dynamic_len(), 0);
        assert!(f.guard.routes().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_navigations_fetch_menu_once() {
        let f = fixture();
        f.backend.on_ok(NAV_PATH, nav_payload());
        f.backend.with_latency(NAV_PATH, std::time::Duration::from_millis(30));
        f.session.set_token("t");
        f.session.set_identity(Identity::new(1, "admin").with_roles(["admin"]));

        let (a, b) = tokio::join!(f.guard.navigate("/system/user"), f.guard.navigate("/system/role"));
        assert!(a.redirect_target().is_none());
        assert!(b.redirect_target().is_none());
        assert_eq!(f.backend.calls_to(NAV_PATH), 1);
    }
}
