use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::http::ApiClient;
use crate::menu::model::{MenuNode, RawMenuItem};
use crate::types::null_as_default;

pub const NAV_PATH: &str = "/system/menu/nav";

/// Where a menu snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MenuSource {
    Server,
    /// The menu service was degraded; a minimal safe menu stands in
    Fallback,
}

/// Menu tree and permission list for the current identity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSnapshot {
    pub menu_tree: Vec<MenuNode>,
    pub permissions: BTreeSet<String>,
    pub source: MenuSource,
}

impl MenuSnapshot {
    pub fn is_fallback(&self) -> bool {
        self.source == MenuSource::Fallback
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavPayload {
    menu_list: Vec<RawMenuItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    permissions: Vec<String>,
}

/// Fetches the server-declared menu graph
pub struct MenuResolver {
    client: Arc<ApiClient>,
}

impl MenuResolver {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// One call to the nav endpoint.
    ///
    /// Failures that end the session propagate; anything else degrades to
    /// [`fallback_menu`] so navigation stays usable.
    pub async fn fetch_menu(&self) -> Result<MenuSnapshot, ClientError> {
        let data: Value = match self.client.get(NAV_PATH).await {
            Ok(data) => data,
            Err(e) if e.requires_login() => return Err(e),
            Err(e) => {
                tracing::warn!("Menu service unavailable, using fallback menu: {}", e);
                return Ok(fallback_menu());
            }
        };

        match serde_json::from_value::<NavPayload>(data) {
            Ok(payload) => Ok(normalize_payload(payload)),
            Err(e) => {
                tracing::warn!("Malformed menu payload, using fallback menu: {}", e);
                Ok(fallback_menu())
            }
        }
    }
}

fn normalize_payload(payload: NavPayload) -> MenuSnapshot {
    let mut permissions: BTreeSet<String> = payload.permissions.into_iter().filter(|p| !p.is_empty()).collect();
    for item in &payload.menu_list {
        item.collect_perms(&mut permissions);
    }

    let menu_tree: Vec<MenuNode> = payload
        .menu_list
        .into_iter()
        .filter_map(|item| item.normalize(None))
        .collect();

    tracing::debug!(
        "Fetched menu with {} top-level entries and {} permissions",
        menu_tree.len(),
        permissions.len()
    );
    MenuSnapshot {
        menu_tree,
        permissions,
        source: MenuSource::Server,
    }
}

/// Minimal safe menu: the dashboard only, no permissions
pub fn fallback_menu() -> MenuSnapshot {
    MenuSnapshot {
        menu_tree: vec![MenuNode::new(1, "/dashboard", "Dashboard")
            .with_component("modules/dashboard/Dashboard.vue")
            .with_title("Dashboard")],
        permissions: BTreeSet::new(),
        source: MenuSource::Fallback,
    }
}
