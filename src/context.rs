// Application context: the single owner of the session, transport and route table
use std::sync::Arc;

use crate::auth::AuthApi;
use crate::config::AppConfig;
use crate::error::ClientError;
use crate::guard::NavigationGuard;
use crate::http::{ApiClient, HttpBackend, ReqwestBackend};
use crate::menu::MenuResolver;
use crate::routing::ComponentRegistry;
use crate::services::{
    DepartmentService, FormTemplate, MenuAdminService, ProcessTemplate, RoleService, SubscriptionService,
    TemplateService, TenantService, ThirdPartyAppService, UserService,
};
use crate::session::{DurableStorage, FileStorage, RestoreOutcome, SessionStore};

/// Everything one console process shares, built once and handed out by `Arc`
pub struct AppContext {
    pub config: AppConfig,
    pub session: Arc<SessionStore>,
    pub client: Arc<ApiClient>,
    pub auth: Arc<AuthApi>,
    pub menus: Arc<MenuResolver>,
    pub registry: Arc<ComponentRegistry>,
    pub guard: Arc<NavigationGuard>,
}

impl AppContext {
    /// Wire the context over an explicit transport and storage
    pub fn new(config: AppConfig, backend: Arc<dyn HttpBackend>, storage: Arc<dyn DurableStorage>) -> Self {
        Self::with_registry(config, backend, storage, ComponentRegistry::console_defaults())
    }

    pub fn with_registry(
        config: AppConfig,
        backend: Arc<dyn HttpBackend>,
        storage: Arc<dyn DurableStorage>,
        registry: ComponentRegistry,
    ) -> Self {
        let session = Arc::new(SessionStore::new(storage));
        let client = Arc::new(ApiClient::new(backend, session.clone()));
        let auth = Arc::new(AuthApi::new(
            client.clone(),
            config.auth.clone(),
            config.api.user_agent.clone(),
        ));
        let menus = Arc::new(MenuResolver::new(client.clone()));
        let registry = Arc::new(registry);
        let guard = Arc::new(NavigationGuard::new(
            &config,
            session.clone(),
            auth.clone(),
            menus.clone(),
            registry.clone(),
        ));

        Self {
            config,
            session,
            client,
            auth,
            menus,
            registry,
            guard,
        }
    }

    /// reqwest transport and file-backed session storage, as configured
    pub fn from_config(config: AppConfig) -> Result<Self, ClientError> {
        let backend = Arc::new(ReqwestBackend::new(&config.api)?);
        let storage = match &config.storage.dir {
            Some(dir) => FileStorage::in_dir(dir)?,
            None => FileStorage::default_location()?,
        };
        tracing::debug!("Session storage at {}", storage.path().display());
        Ok(Self::new(config, backend, Arc::new(storage)))
    }

    /// Rebuild the session persisted by a previous run
    pub async fn restore(&self) -> RestoreOutcome {
        self.session.restore(self.auth.as_ref()).await
    }

    /// End the session on the server and locally, and drop the synthesized routes
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.auth.logout().await?;
        self.guard.reset();
        Ok(())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.client.clone())
    }

    pub fn roles(&self) -> RoleService {
        RoleService::new(self.client.clone())
    }

    pub fn departments(&self) -> DepartmentService {
        DepartmentService::new(self.client.clone())
    }

    pub fn menu_admin(&self) -> MenuAdminService {
        MenuAdminService::new(self.client.clone())
    }

    pub fn tenants(&self) -> TenantService {
        TenantService::new(self.client.clone())
    }

    pub fn process_templates(&self) -> TemplateService<ProcessTemplate> {
        TemplateService::process(self.client.clone())
    }

    pub fn form_templates(&self) -> TemplateService<FormTemplate> {
        TemplateService::form(self.client.clone())
    }

    pub fn third_party_apps(&self) -> ThirdPartyAppService {
        ThirdPartyAppService::new(self.client.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionService {
        SubscriptionService::new(self.client.clone())
    }
}
