use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::routing::registry::ViewRef;
use crate::routing::synth::{normalize_path, RouteDefinition, RouteMeta};

pub const ROOT_ROUTE: &str = "Root";
pub const LOGIN_ROUTE: &str = "Login";
pub const NOT_FOUND_ROUTE: &str = "NotFound";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("route '{name}' has an invalid path '{path}'")]
    InvalidPath { name: String, path: String },
    #[error("route at '{path}' has no name")]
    MissingName { path: String },
}

/// A live entry of the route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub path: String,
    pub name: String,
    pub view: ViewRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub meta: RouteMeta,
    /// Name of the enclosing route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// False for the routes the table is created with
    pub dynamic: bool,
}

/// A navigation target matched against the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    /// Path that was asked for, normalized
    pub path: String,
    pub record: RouteRecord,
}

impl ResolvedRoute {
    pub fn is_not_found(&self) -> bool {
        self.record.name == NOT_FOUND_ROUTE
    }
}

/// What one `register` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterReport {
    pub added: usize,
    pub duplicates: usize,
    pub failed: Vec<RegisterError>,
}

/// The navigation engine's live route table
#[derive(Debug, Clone)]
pub struct RouteTable {
    records: Vec<RouteRecord>,
    not_found: RouteRecord,
    synthesized_for: Option<u64>,
}

fn meta(title: &str) -> RouteMeta {
    RouteMeta {
        title: title.to_string(),
        icon: None,
        hidden: true,
        roles: BTreeSet::new(),
    }
}

impl RouteTable {
    /// Table holding only the static routes
    pub fn new(auth: &AuthConfig) -> Self {
        let records = vec![
            RouteRecord {
                path: "/".to_string(),
                name: ROOT_ROUTE.to_string(),
                view: ViewRef::layout("layouts/Layout.vue"),
                redirect: Some(auth.landing_path.clone()),
                meta: meta(""),
                parent: None,
                dynamic: false,
            },
            RouteRecord {
                path: normalize_path(&auth.login_path),
                name: LOGIN_ROUTE.to_string(),
                view: ViewRef::page("modules/login/Login.vue"),
                redirect: None,
                meta: meta("Login"),
                parent: None,
                dynamic: false,
            },
        ];
        Self {
            records,
            not_found: RouteRecord {
                path: "/:pathMatch(.*)*".to_string(),
                name: NOT_FOUND_ROUTE.to_string(),
                view: ViewRef::not_found(),
                redirect: None,
                meta: meta("Not Found"),
                parent: None,
                dynamic: false,
            },
            synthesized_for: None,
        }
    }

    pub fn records(&self) -> &[RouteRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dynamic_len(&self) -> usize {
        self.records.iter().filter(|r| r.dynamic).count()
    }

    pub fn has_route(&self, path: &str, name: &str) -> bool {
        let path = normalize_path(path);
        self.records.iter().any(|r| r.path == path && r.name == name)
    }

    /// Identity epoch the dynamic routes were synthesized for
    pub fn synthesized_epoch(&self) -> Option<u64> {
        self.synthesized_for
    }

    pub fn mark_synthesized(&mut self, epoch: u64) {
        self.synthesized_for = Some(epoch);
    }

    /// Drop every dynamic route; the static ones stay
    pub fn reset(&mut self) {
        let before = self.records.len();
        self.records.retain(|r| !r.dynamic);
        self.synthesized_for = None;
        if before != self.records.len() {
            tracing::debug!("Route table reset, {} dynamic route(s) removed", before - self.records.len());
        }
    }

    /// Add `routes` (and their children), skipping path+name pairs already present.
    ///
    /// A route that cannot be registered is logged and skipped along with its
    /// subtree; its siblings are still registered.
    pub fn register(&mut self, routes: &[RouteDefinition]) -> RegisterReport {
        let mut report = RegisterReport::default();
        for route in routes {
            self.register_one(route, None, &mut report);
        }
        tracing::debug!(
            "Registered {} route(s), {} duplicate(s) skipped, {} failure(s)",
            report.added,
            report.duplicates,
            report.failed.len()
        );
        report
    }

    fn register_one(&mut self, route: &RouteDefinition, parent: Option<&str>, report: &mut RegisterReport) {
        if let Err(e) = validate(route) {
            tracing::warn!("Skipping route: {}", e);
            report.failed.push(e);
            return;
        }

        if self.has_route(&route.path, &route.name) {
            report.duplicates += 1;
        } else {
            self.records.push(RouteRecord {
                path: normalize_path(&route.path),
                name: route.name.clone(),
                view: route.view.clone(),
                redirect: route.redirect.clone(),
                meta: route.meta.clone(),
                parent: parent.map(str::to_string),
                dynamic: true,
            });
            report.added += 1;
        }

        for child in &route.children {
            self.register_one(child, Some(&route.name), report);
        }
    }

    /// Match a navigation target; unmatched paths resolve to the not-found route
    pub fn resolve(&self, target: &str) -> ResolvedRoute {
        let path = strip_target(target);
        let record = self
            .records
            .iter()
            .find(|r| r.path == path)
            .or_else(|| self.records.iter().find(|r| pattern_matches(&r.path, &path)))
            .unwrap_or(&self.not_found)
            .clone();
        ResolvedRoute { path, record }
    }
}

fn validate(route: &RouteDefinition) -> Result<(), RegisterError> {
    if route.name.trim().is_empty() {
        return Err(RegisterError::MissingName {
            path: route.path.clone(),
        });
    }
    if !route.path.starts_with('/') || route.path.chars().any(char::is_whitespace) {
        return Err(RegisterError::InvalidPath {
            name: route.name.clone(),
            path: route.path.clone(),
        });
    }
    Ok(())
}

/// Path part of a navigation target, normalized
pub fn strip_target(target: &str) -> String {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    normalize_path(&target[..end])
}

/// `:param` segments match any single segment
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if !pattern.contains(':') {
        return false;
    }
    let pattern: Vec<&str> = pattern.split('/').collect();
    let path: Vec<&str> = path.split('/').collect();
    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(&path)
            .all(|(p, s)| p == s || (p.starts_with(':') && !s.is_empty()))
}
