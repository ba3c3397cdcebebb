use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::null_as_default;

/// The authenticated user as the console knows it (`/auth/info`, login `userInfo`).
///
/// Serialized in the server's `UserInfo` shape so the cached snapshot and the
/// wire payload are interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(rename = "nickname", default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permissions: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<Value>,
}

/// Tenant the identity is acting in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRef {
    pub id: Option<i64>,
    pub code: Option<String>,
}

impl Identity {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id,
            display_name: username.clone(),
            username,
            avatar: None,
            roles: BTreeSet::new(),
            permissions: BTreeSet::new(),
            tenant_id: None,
            tenant_code: None,
            department: None,
            extra_info: None,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn tenant(&self) -> Option<TenantRef> {
        if self.tenant_id.is_none() && self.tenant_code.is_none() {
            return None;
        }
        Some(TenantRef {
            id: self.tenant_id,
            code: self.tenant_code.clone(),
        })
    }
}
