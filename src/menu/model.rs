use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::null_as_default;

/// Backend `menuType` of a button/permission entry
pub const MENU_TYPE_BUTTON: i64 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuMeta {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub hidden: bool,
    /// Empty means unrestricted
    pub roles: BTreeSet<String>,
}

/// One entry of the server-declared navigation tree, in canonical shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    pub id: i64,
    /// Display-only back reference; ownership is `children`
    pub parent_id: Option<i64>,
    pub path: String,
    pub name: String,
    pub component: Option<String>,
    pub redirect: Option<String>,
    pub meta: MenuMeta,
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn new(id: i64, path: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            parent_id: None,
            path: path.into(),
            meta: MenuMeta {
                title: name.clone(),
                ..MenuMeta::default()
            },
            name,
            component: None,
            redirect: None,
            children: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = title.into();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.meta.hidden = true;
        self
    }

    pub fn with_children(mut self, children: Vec<MenuNode>) -> Self {
        let id = self.id;
        self.children = children
            .into_iter()
            .map(|mut child| {
                child.parent_id = Some(id);
                child
            })
            .collect();
        self
    }

    pub fn required_roles(&self) -> &BTreeSet<String> {
        &self.meta.roles
    }

    /// True when the node can be navigated to on its own
    pub fn is_addressable(&self) -> bool {
        !self.path.trim().is_empty()
    }

    /// Pre-order count of this node and its descendants
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MenuNode::count).sum::<usize>()
    }
}

/// Console-shaped `meta` block
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
}

/// A menu entry as the server sends it.
///
/// Accepts both the console shape (`name`, `meta`) and the backend entity
/// shape (`menuName`, `menuType`, `visible`, `status`, `perms`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMenuItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub menu_name: Option<String>,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub meta: Option<RawMeta>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub visible: Option<i64>,
    #[serde(default)]
    pub menu_type: Option<i64>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub perms: Option<String>,
    #[serde(default)]
    pub order_num: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<RawMenuItem>,
}

impl RawMenuItem {
    fn is_button(&self) -> bool {
        self.menu_type == Some(MENU_TYPE_BUTTON)
    }

    fn is_disabled(&self) -> bool {
        self.status == Some(0)
    }

    /// Canonical node, or `None` for buttons and disabled entries
    pub fn normalize(self, parent_id: Option<i64>) -> Option<MenuNode> {
        if self.is_button() || self.is_disabled() {
            return None;
        }

        let id = self.id.unwrap_or_default();
        let path = self.path.unwrap_or_default();
        let meta = self.meta.unwrap_or_default();

        let name = non_empty(self.name)
            .or_else(|| non_empty(self.menu_name.clone()))
            .unwrap_or_else(|| name_from_path(&path));
        let title = non_empty(meta.title)
            .or_else(|| non_empty(self.menu_name))
            .unwrap_or_else(|| name.clone());

        let children = self
            .children
            .into_iter()
            .filter_map(|child| child.normalize(Some(id)))
            .collect();

        Some(MenuNode {
            id,
            parent_id: self.parent_id.filter(|p| *p != 0).or(parent_id),
            path,
            name,
            component: non_empty(self.component),
            redirect: non_empty(self.redirect),
            meta: MenuMeta {
                title,
                icon: non_empty(meta.icon).or_else(|| non_empty(self.icon)),
                hidden: meta.hidden.unwrap_or(false) || self.visible == Some(0),
                roles: meta.roles.into_iter().filter(|r| !r.is_empty()).collect(),
            },
            children,
        })
    }

    /// Permission strings carried by this entry and its descendants (buttons included)
    pub fn collect_perms(&self, into: &mut BTreeSet<String>) {
        if let Some(perms) = &self.perms {
            into.extend(
                perms
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            );
        }
        for child in &self.children {
            child.collect_perms(into);
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `/system/user-role` -> `SystemUserRole`
fn name_from_path(path: &str) -> String {
    path.split(|c: char| c == '/' || c == '-' || c == '_')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawMenuItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_console_shape() {
        let node = raw(json!({
            "id": 2,
            "parentId": null,
            "path": "/system",
            "name": "System",
            "component": "modules/system/index.vue",
            "meta": {"title": "System", "icon": "Setting", "roles": ["admin"]},
            "children": [
                {"id": 21, "path": "user", "name": "User", "component": "modules/system/user/UserList.vue",
                 "meta": {"title": "Users", "hidden": true}}
            ]
        }))
        .normalize(None)
        .unwrap();

        assert_eq!(node.parent_id, None);
        assert_eq!(node.meta.icon.as_deref(), Some("Setting"));
        assert!(node.required_roles().contains("admin"));
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].parent_id, Some(2));
        assert!(node.children[0].meta.hidden);
        assert_eq!(node.children[0].meta.title, "Users");
    }

    #[test]
    fn test_entity_shape_drops_buttons_and_disabled() {
        let node = raw(json!({
            "id": 10,
            "parentId": 0,
            "menuName": "Tenants",
            "path": "/system/tenant",
            "icon": "OfficeBuilding",
            "menuType": 1,
            "visible": 0,
            "status": 1,
            "perms": "system:tenant:list",
            "children": [
                {"id": 11, "menuName": "Add", "menuType": 2, "perms": "system:tenant:add"},
                {"id": 12, "menuName": "Old", "menuType": 1, "status": 0, "path": "old"},
                {"id": 13, "menuName": "Detail", "menuType": 1, "path": "detail", "status": 1}
            ]
        }));

        let mut perms = BTreeSet::new();
        node.collect_perms(&mut perms);
        assert!(perms.contains("system:tenant:add"));
        assert!(perms.contains("system:tenant:list"));

        let node = node.normalize(None).unwrap();
        assert_eq!(node.name, "Tenants");
        assert_eq!(node.meta.title, "Tenants");
        assert_eq!(node.meta.icon.as_deref(), Some("OfficeBuilding"));
        assert!(node.meta.hidden);
        assert_eq!(node.parent_id, None);
        let names: Vec<&str> = node.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Detail"]);
    }

    #[test]
    fn test_name_derived_from_path() {
        let node = raw(json!({"id": 5, "path": "/flow/process-template"}))
            .normalize(None)
            .unwrap();
        assert_eq!(node.name, "FlowProcessTemplate");
        assert_eq!(node.meta.title, "FlowProcessTemplate");
    }

    #[test]
    fn test_sibling_order_preserved() {
        let node = raw(json!({
            "id": 1, "path": "/a", "name": "A",
            "children": [
                {"id": 3, "path": "c", "name": "C"},
                {"id": 2, "path": "b", "name": "B"},
                {"id": 4, "path": "d", "name": "D"}
            ]
        }))
        .normalize(None)
        .unwrap();
        let ids: Vec<i64> = node.children.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 4]);
        assert_eq!(node.count(), 4);
    }
}
