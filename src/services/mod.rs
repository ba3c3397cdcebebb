// Typed wrappers over the console's CRUD endpoints
//
// They share the transport's auth handling and envelope unwrapping; none of
// them hold state of their own.

pub mod flow;
pub mod system;
pub mod third_party;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::http::ApiClient;

pub use flow::{FormTemplate, ProcessTemplate, TemplateQuery, TemplateService};
pub use system::{
    DepartmentRecord, DepartmentService, MenuAdminService, MenuRecord, RoleRecord, RoleService, TenantRecord,
    TenantService, UserQuery, UserRecord, UserService,
};
pub use third_party::{AppCredentials, DataSubscription, DataType, SubscriptionService, ThirdPartyApp, ThirdPartyAppService};

/// REST resource rooted at `base`: `list`, `/{id}` and `/batch` below it
#[derive(Clone)]
pub struct Resource {
    client: Arc<ApiClient>,
    base: &'static str,
}

impl Resource {
    pub fn new(client: Arc<ApiClient>, base: &'static str) -> Self {
        Self { client, base }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn path(&self, suffix: impl std::fmt::Display) -> String {
        format!("{}/{}", self.base, suffix)
    }

    pub async fn list<T, Q>(&self, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.client.get_with(&self.path("list"), query).await
    }

    pub async fn detail<T: DeserializeOwned>(&self, id: i64) -> Result<T, ClientError> {
        self.client.get(&self.path(id)).await
    }

    pub async fn create<T, B>(&self, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.client.post(self.base, body).await
    }

    pub async fn update<T, B>(&self, id: i64, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.client.put(&self.path(id), body).await
    }

    pub async fn remove(&self, id: i64) -> Result<(), ClientError> {
        let _: Value = self.client.delete(&self.path(id)).await?;
        Ok(())
    }

    pub async fn batch_remove(&self, ids: &[i64]) -> Result<(), ClientError> {
        let _: Value = self.client.delete_with(&self.path("batch"), &json!({ "ids": ids })).await?;
        Ok(())
    }
}
