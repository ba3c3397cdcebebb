// Menu tree -> route definitions
//
// Pure functions over immutable trees: every call builds a new tree and the
// input is never touched.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::menu::MenuNode;
use crate::routing::registry::{ComponentRegistry, ViewRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub hidden: bool,
    pub roles: BTreeSet<String>,
}

/// Read-only projection of a menu subtree with its resolved view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDefinition {
    /// Full path, parent segments included
    pub path: String,
    pub name: String,
    pub component: Option<String>,
    pub view: ViewRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub meta: RouteMeta,
    pub children: Vec<RouteDefinition>,
}

impl RouteDefinition {
    /// Pre-order walk over this route and its descendants
    pub fn flatten(&self) -> Vec<&RouteDefinition> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}

fn permits(node: &MenuNode, roles: &BTreeSet<String>) -> bool {
    let required = node.required_roles();
    required.is_empty() || !required.is_disjoint(roles)
}

/// Keep the nodes `roles` may see.
///
/// A node whose own role restriction excludes `roles` is dropped together
/// with its subtree. A node that had children, all of them filtered out, is
/// kept (with no children) only if it is addressable on its own.
pub fn filter_menu(nodes: &[MenuNode], roles: &BTreeSet<String>) -> Vec<MenuNode> {
    nodes
        .iter()
        .filter(|node| permits(node, roles))
        .filter_map(|node| {
            let children = filter_menu(&node.children, roles);
            if !node.children.is_empty() && children.is_empty() && !node.is_addressable() {
                tracing::debug!("Dropping menu group '{}' with no visible children", node.name);
                return None;
            }
            Some(MenuNode {
                children,
                ..node.clone()
            })
        })
        .collect()
}

/// Filter `menu` by `roles` and project it into route definitions.
///
/// A node whose view fails to resolve is skipped with its subtree; its
/// siblings are unaffected.
pub fn synthesize(menu: &[MenuNode], roles: &BTreeSet<String>, registry: &ComponentRegistry) -> Vec<RouteDefinition> {
    let visible = filter_menu(menu, roles);
    project(&visible, "/", registry)
}

fn project(nodes: &[MenuNode], parent_path: &str, registry: &ComponentRegistry) -> Vec<RouteDefinition> {
    nodes
        .iter()
        .filter_map(|node| {
            let view = match registry.resolve(node.component.as_deref()) {
                Ok(view) => view,
                Err(e) => {
                    tracing::warn!("Skipping route '{}': {}", node.name, e);
                    return None;
                }
            };
            let path = join_path(parent_path, &node.path);
            Some(RouteDefinition {
                children: project(&node.children, &path, registry),
                path,
                name: node.name.clone(),
                component: node.component.clone(),
                view,
                redirect: node.redirect.clone(),
                meta: RouteMeta {
                    title: node.meta.title.clone(),
                    icon: node.meta.icon.clone(),
                    hidden: node.meta.hidden,
                    roles: node.meta.roles.clone(),
                },
            })
        })
        .collect()
}

/// Join a child path onto its parent unless the child is absolute
pub fn join_path(parent: &str, child: &str) -> String {
    let child = child.trim();
    if child.starts_with('/') {
        return normalize_path(child);
    }
    if child.is_empty() {
        return normalize_path(parent);
    }
    normalize_path(&format!("{}/{}", parent.trim_end_matches('/'), child))
}

/// Collapse repeated slashes and drop a trailing one (except for `/`)
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Sidebar projection: hidden routes and their subtrees are omitted
pub fn visible_menu(routes: &[RouteDefinition]) -> Vec<RouteDefinition> {
    routes
        .iter()
        .filter(|route| !route.meta.hidden)
        .map(|route| RouteDefinition {
            children: visible_menu(&route.children),
            ..route.clone()
        })
        .collect()
}
