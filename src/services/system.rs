use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest, UploadFile};
use crate::services::Resource;
use crate::types::{null_as_default, PageData, PageQuery};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub role_ids: Vec<i64>,
    /// Fields this client does not model, kept for round trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filters of the user list page
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dept_id: Option<i64>,
}

pub struct UserService {
    resource: Resource,
}

impl UserService {
    pub const BASE: &'static str = "/system/user";

    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            resource: Resource::new(client, Self::BASE),
        }
    }

    pub async fn list(&self, query: &UserQuery) -> Result<PageData<UserRecord>, ClientError> {
        self.resource.list(query).await
    }

    pub async fn detail(&self, id: i64) -> Result<UserRecord, ClientError> {
        self.resource.detail(id).await
    }

    pub async fn create(&self, user: &UserRecord) -> Result<Value, ClientError> {
        self.resource.create(user).await
    }

    pub async fn update(&self, id: i64, user: &UserRecord) -> Result<Value, ClientError> {
        self.resource.update(id, user).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.resource.remove(id).await
    }

    pub async fn batch_delete(&self, ids: &[i64]) -> Result<(), ClientError> {
        self.resource.batch_remove(ids).await
    }

    pub async fn change_status(&self, id: i64, status: i32) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .put(&self.resource.path(format!("{}/status", id)), &json!({ "status": status }))
            .await?;
        Ok(())
    }

    pub async fn reset_password(&self, id: i64, new_password: &str) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .put(
                &self.resource.path(format!("{}/reset-password", id)),
                &json!({ "newPassword": new_password }),
            )
            .await?;
        Ok(())
    }

    pub async fn import(&self, file: UploadFile) -> Result<Value, ClientError> {
        self.resource.client().upload(&self.resource.path("import"), file).await
    }

    /// Spreadsheet export of the users matching `query`
    pub async fn export(&self, query: &UserQuery) -> Result<Vec<u8>, ClientError> {
        let request = ApiRequest::get(self.resource.path("export")).query(query)?;
        self.resource.client().download(request).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_num: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_scope: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct RoleService {
    resource: Resource,
}

impl RoleService {
    pub const BASE: &'static str = "/system/role";

    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            resource: Resource::new(client, Self::BASE),
        }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<PageData<RoleRecord>, ClientError> {
        self.resource.list(query).await
    }

    pub async fn detail(&self, id: i64) -> Result<RoleRecord, ClientError> {
        self.resource.detail(id).await
    }

    pub async fn create(&self, role: &RoleRecord) -> Result<Value, ClientError> {
        self.resource.create(role).await
    }

    pub async fn update(&self, id: i64, role: &RoleRecord) -> Result<Value, ClientError> {
        self.resource.update(id, role).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.resource.remove(id).await
    }

    pub async fn batch_delete(&self, ids: &[i64]) -> Result<(), ClientError> {
        self.resource.batch_remove(ids).await
    }

    pub async fn menus(&self, role_id: i64) -> Result<Vec<i64>, ClientError> {
        self.resource.client().get(&self.resource.path(format!("{}/menus", role_id))).await
    }

    pub async fn set_menus(&self, role_id: i64, menu_ids: &[i64]) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .put(&self.resource.path(format!("{}/menus", role_id)), &json!({ "menuIds": menu_ids }))
            .await?;
        Ok(())
    }

    pub async fn data_permission(&self, role_id: i64) -> Result<Value, ClientError> {
        self.resource
            .client()
            .get(&self.resource.path(format!("{}/data-permission", role_id)))
            .await
    }

    pub async fn set_data_permission(&self, role_id: i64, permission: &Value) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .put(&self.resource.path(format!("{}/data-permission", role_id)), permission)
            .await?;
        Ok(())
    }

    pub async fn associate_users(&self, role_id: i64, user_ids: &[i64]) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .post(&self.resource.path(format!("{}/users", role_id)), &json!({ "userIds": user_ids }))
            .await?;
        Ok(())
    }

    pub async fn users(&self, role_id: i64, query: &PageQuery) -> Result<PageData<UserRecord>, ClientError> {
        self.resource
            .client()
            .get_with(&self.resource.path(format!("{}/users", role_id)), query)
            .await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub dept_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_num: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DepartmentRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct DepartmentService {
    resource: Resource,
}

impl DepartmentService {
    pub const BASE: &'static str = "/system/department";

    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            resource: Resource::new(client, Self::BASE),
        }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<Vec<DepartmentRecord>, ClientError> {
        self.resource.list(query).await
    }

    pub async fn detail(&self, id: i64) -> Result<DepartmentRecord, ClientError> {
        self.resource.detail(id).await
    }

    pub async fn create(&self, dept: &DepartmentRecord) -> Result<Value, ClientError> {
        self.resource.create(dept).await
    }

    pub async fn update(&self, id: i64, dept: &DepartmentRecord) -> Result<Value, ClientError> {
        self.resource.update(id, dept).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.resource.remove(id).await
    }

    pub async fn batch_delete(&self, ids: &[i64]) -> Result<(), ClientError> {
        self.resource.batch_remove(ids).await
    }

    pub async fn tree(&self) -> Result<Vec<DepartmentRecord>, ClientError> {
        self.resource.client().get(&self.resource.path("tree")).await
    }

    /// True when `name` is already taken under `parent_id`
    pub async fn name_exists(&self, name: &str, parent_id: i64, id: Option<i64>) -> Result<bool, ClientError> {
        let query = json!({ "departmentName": name, "parentId": parent_id, "id": id });
        self.resource.client().get_with(&self.resource.path("check-name"), &query).await
    }

    pub async fn users(&self, dept_id: i64, query: &PageQuery) -> Result<PageData<UserRecord>, ClientError> {
        self.resource
            .client()
            .get_with(&self.resource.path(format!("{}/users", dept_id)), query)
            .await
    }

    pub async fn move_to(&self, id: i64, new_parent_id: i64) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .put(&self.resource.path(format!("{}/move", id)), &json!({ "newParentId": new_parent_id }))
            .await?;
        Ok(())
    }
}

/// Menu entity as the admin pages edit it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub menu_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_type: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_num: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct MenuAdminService {
    resource: Resource,
}

impl MenuAdminService {
    pub const BASE: &'static str = "/system/menu";

    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            resource: Resource::new(client, Self::BASE),
        }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<Vec<MenuRecord>, ClientError> {
        self.resource.list(query).await
    }

    pub async fn detail(&self, id: i64) -> Result<MenuRecord, ClientError> {
        self.resource.detail(id).await
    }

    pub async fn create(&self, menu: &MenuRecord) -> Result<Value, ClientError> {
        self.resource.create(menu).await
    }

    pub async fn update(&self, id: i64, menu: &MenuRecord) -> Result<Value, ClientError> {
        self.resource.update(id, menu).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.resource.remove(id).await
    }

    pub async fn batch_delete(&self, ids: &[i64]) -> Result<(), ClientError> {
        self.resource.batch_remove(ids).await
    }

    pub async fn tree(&self) -> Result<Vec<MenuRecord>, ClientError> {
        self.resource.client().get(&self.resource.path("tree")).await
    }

    pub async fn name_exists(&self, name: &str, parent_id: i64, id: Option<i64>) -> Result<bool, ClientError> {
        let query = json!({ "menuName": name, "parentId": parent_id, "id": id });
        self.resource.client().get_with(&self.resource.path("check-name"), &query).await
    }

    pub async fn set_order(&self, id: i64, order_num: i32) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .put(&self.resource.path(format!("{}/order", id)), &json!({ "orderNum": order_num }))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub tenant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_users: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct TenantService {
    resource: Resource,
}

impl TenantService {
    pub const BASE: &'static str = "/system/tenant";

    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            resource: Resource::new(client, Self::BASE),
        }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<PageData<TenantRecord>, ClientError> {
        self.resource.list(query).await
    }

    pub async fn detail(&self, id: i64) -> Result<TenantRecord, ClientError> {
        self.resource.detail(id).await
    }

    pub async fn create(&self, tenant: &TenantRecord) -> Result<Value, ClientError> {
        self.resource.create(tenant).await
    }

    pub async fn update(&self, id: i64, tenant: &TenantRecord) -> Result<Value, ClientError> {
        self.resource.update(id, tenant).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.resource.remove(id).await
    }

    pub async fn batch_delete(&self, ids: &[i64]) -> Result<(), ClientError> {
        self.resource.batch_remove(ids).await
    }

    pub async fn change_status(&self, id: i64, status: i32) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .put(&self.resource.path(format!("{}/status", id)), &json!({ "status": status }))
            .await?;
        Ok(())
    }

    pub async fn name_exists(&self, name: &str, id: Option<i64>) -> Result<bool, ClientError> {
        let query = json!({ "tenantName": name, "id": id });
        self.resource.client().get_with(&self.resource.path("check-name"), &query).await
    }

    pub async fn users(&self, tenant_id: i64, query: &PageQuery) -> Result<PageData<UserRecord>, ClientError> {
        self.resource
            .client()
            .get_with(&self.resource.path(format!("{}/users", tenant_id)), query)
            .await
    }

    pub async fn assign_users(&self, tenant_id: i64, user_ids: &[i64]) -> Result<(), ClientError> {
        let _: Value = self
            .resource
            .client()
            .put(&self.resource.path(format!("{}/users", tenant_id)), &json!({ "userIds": user_ids }))
            .await?;
        Ok(())
    }
}
