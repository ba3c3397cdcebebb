// Component registry: declared component identifiers -> view factories
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Page,
    Layout,
    /// Renders its children only
    Passthrough,
    NotFound,
}

/// Lazily-loadable view a route renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRef {
    pub kind: ViewKind,
    pub module: String,
}

impl ViewRef {
    pub fn page(module: impl Into<String>) -> Self {
        Self {
            kind: ViewKind::Page,
            module: module.into(),
        }
    }

    pub fn layout(module: impl Into<String>) -> Self {
        Self {
            kind: ViewKind::Layout,
            module: module.into(),
        }
    }

    pub fn passthrough() -> Self {
        Self {
            kind: ViewKind::Passthrough,
            module: "router-view".to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            kind: ViewKind::NotFound,
            module: NOT_FOUND_MODULE.to_string(),
        }
    }
}

const NOT_FOUND_MODULE: &str = "modules/error/NotFound.vue";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("component '{component}' failed to load: {reason}")]
    LoadFailed { component: String, reason: String },
}

pub type ViewFactory = Arc<dyn Fn() -> Result<ViewRef, ResolveError> + Send + Sync>;

/// Known views, keyed by component identifier, with a not-found fallback
#[derive(Clone)]
pub struct ComponentRegistry {
    exact: HashMap<String, ViewFactory>,
    canonical: HashMap<String, ViewFactory>,
    fallback: ViewFactory,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self {
            exact: HashMap::new(),
            canonical: HashMap::new(),
            fallback: Arc::new(|| Ok(ViewRef::not_found())),
        }
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every view the console ships
    pub fn console_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_layout("layouts/Layout.vue");
        registry.register_page("modules/login/Login.vue");
        registry.register_page(NOT_FOUND_MODULE);
        for module in [
            "modules/dashboard/Dashboard.vue",
            "modules/system/index.vue",
            "modules/system/user/UserList.vue",
            "modules/system/role/RoleList.vue",
            "modules/system/department/DepartmentList.vue",
            "modules/system/menu/MenuList.vue",
            "modules/system/tenant/TenantList.vue",
            "modules/flow/process-template/ProcessTemplateList.vue",
            "modules/flow/process-template/ProcessTemplateEdit.vue",
            "modules/flow/form-template/FormTemplateList.vue",
            "modules/flow/form-template/FormTemplateEdit.vue",
            "modules/third-party/app/ThirdPartyAppList.vue",
            "modules/third-party/subscription/DataSubscriptionList.vue",
        ] {
            registry.register_page(module);
        }
        // Backend menus name the shell "Layout"
        registry.register("Layout", Arc::new(|| Ok(ViewRef::layout("layouts/Layout.vue"))));
        registry
    }

    pub fn register(&mut self, id: &str, factory: ViewFactory) {
        self.canonical.insert(canonical_key(id), factory.clone());
        self.exact.insert(id.to_string(), factory);
    }

    pub fn register_page(&mut self, module: &str) {
        let owned = module.to_string();
        self.register(module, Arc::new(move || Ok(ViewRef::page(owned.clone()))));
    }

    pub fn register_layout(&mut self, module: &str) {
        let owned = module.to_string();
        self.register(module, Arc::new(move || Ok(ViewRef::layout(owned.clone()))));
    }

    /// Replace the view used for identifiers nothing else matches
    pub fn set_fallback(&mut self, factory: ViewFactory) {
        self.fallback = factory;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.exact.contains_key(id) || self.canonical.contains_key(&canonical_key(id))
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Resolve a node's declared component.
    ///
    /// No component means a passthrough view; an unknown one resolves to the
    /// fallback. Only a failing factory is an error.
    pub fn resolve(&self, component: Option<&str>) -> Result<ViewRef, ResolveError> {
        let Some(id) = component.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(ViewRef::passthrough());
        };

        if let Some(factory) = self.exact.get(id) {
            return factory();
        }
        if let Some(factory) = self.canonical.get(&canonical_key(id)) {
            return factory();
        }

        tracing::warn!("Unknown component '{}', rendering the not-found view", id);
        (self.fallback)()
    }
}

/// `@/modules/system/user/UserList.vue` -> `system/user/userlist`
pub fn canonical_key(id: &str) -> String {
    let mut key = id.trim();
    for prefix in ["@/", "/", "./", "modules/", "views/"] {
        key = key.strip_prefix(prefix).unwrap_or(key);
    }
    let key = key.strip_suffix(".vue").unwrap_or(key);
    let key = key.strip_suffix("/index").unwrap_or(key);
    key.to_lowercase()
}
