// Workflow process and form templates
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest};
use crate::types::PageData;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    pub process_name: String,
    pub process_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    pub form_name: String,
    pub form_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateQuery {
    pub page_num: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

impl Default for TemplateQuery {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: 10,
            tenant_id: None,
            name: None,
            status: None,
        }
    }
}

/// Template endpoints: `list`, `getById`, `getByKey`, `save`, `update`,
/// `delete`, `batchDelete`, `publish`, `copy`
pub struct TemplateService<T> {
    client: Arc<ApiClient>,
    base: &'static str,
    _template: PhantomData<fn() -> T>,
}

impl TemplateService<ProcessTemplate> {
    pub const PROCESS_BASE: &'static str = "/api/flow/processTemplate";

    pub fn process(client: Arc<ApiClient>) -> Self {
        Self::with_base(client, Self::PROCESS_BASE)
    }
}

impl TemplateService<FormTemplate> {
    pub const FORM_BASE: &'static str = "/api/flow/formTemplate";

    pub fn form(client: Arc<ApiClient>) -> Self {
        Self::with_base(client, Self::FORM_BASE)
    }
}

impl<T> TemplateService<T>
where
    T: Serialize + DeserializeOwned,
{
    fn with_base(client: Arc<ApiClient>, base: &'static str) -> Self {
        Self {
            client,
            base,
            _template: PhantomData,
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}/{}", self.base, suffix)
    }

    pub async fn list(&self, query: &TemplateQuery) -> Result<PageData<T>, ClientError> {
        self.client.get_with(&self.path("list"), query).await
    }

    pub async fn by_id(&self, id: i64) -> Result<T, ClientError> {
        self.client.get(&self.path(&format!("getById/{}", id))).await
    }

    pub async fn by_key(&self, key: &str) -> Result<T, ClientError> {
        self.client.get(&self.path(&format!("getByKey/{}", key))).await
    }

    pub async fn save(&self, template: &T) -> Result<Value, ClientError> {
        self.client.post(&self.path("save"), template).await
    }

    pub async fn update(&self, template: &T) -> Result<Value, ClientError> {
        self.client.put(&self.path("update"), template).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let _: Value = self.client.delete(&self.path(&format!("delete/{}", id))).await?;
        Ok(())
    }

    /// Ids travel as a bare JSON array here, unlike the system resources
    pub async fn batch_delete(&self, ids: &[i64]) -> Result<(), ClientError> {
        let _: Value = self.client.delete_with(&self.path("batchDelete"), ids).await?;
        Ok(())
    }

    pub async fn publish(&self, id: i64) -> Result<(), ClientError> {
        let _: Value = self
            .client
            .send(ApiRequest::post(self.path(&format!("publish/{}", id))))
            .await?;
        Ok(())
    }

    /// Copy a template; `overrides` (new name/key) is sent as the body
    pub async fn copy(&self, id: i64, overrides: &Value) -> Result<Value, ClientError> {
        let mut body = overrides.clone();
        if let Value::Object(map) = &mut body {
            map.insert("id".to_string(), json!(id));
        }
        self.client.post(&self.path(&format!("copy/{}", id)), &body).await
    }
}
