use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest};
use crate::types::{null_as_default, PageData, PageQuery};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThirdPartyApp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_domain: Option<String>,
    /// "0" enabled, "1" disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub callback_urls: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCredentials {
    pub app_key: String,
    pub app_secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSubscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    pub value: String,
    pub label: String,
}

const APP_BASE: &str = "/api/third-party/app";
const SUBSCRIPTION_BASE: &str = "/api/third-party/subscription";

pub struct ThirdPartyAppService {
    client: Arc<ApiClient>,
}

impl ThirdPartyAppService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<PageData<ThirdPartyApp>, ClientError> {
        self.client.get_with(&format!("{}/list", APP_BASE), query).await
    }

    pub async fn detail(&self, id: i64) -> Result<ThirdPartyApp, ClientError> {
        self.client.get(&format!("{}/detail/{}", APP_BASE, id)).await
    }

    pub async fn create(&self, app: &ThirdPartyApp) -> Result<ThirdPartyApp, ClientError> {
        self.client.post(&format!("{}/create", APP_BASE), app).await
    }

    pub async fn update(&self, app: &ThirdPartyApp) -> Result<ThirdPartyApp, ClientError> {
        self.client.put(&format!("{}/update", APP_BASE), app).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let _: Value = self.client.delete(&format!("{}/delete/{}", APP_BASE, id)).await?;
        Ok(())
    }

    pub async fn set_status(&self, id: i64, status: i32) -> Result<(), ClientError> {
        let request = ApiRequest::put(format!("{}/status/{}", APP_BASE, id)).param("status", status);
        let _: Value = self.client.send(request).await?;
        Ok(())
    }

    /// Issue a fresh key/secret pair; the old one stops working
    pub async fn regenerate_credentials(&self, id: i64) -> Result<AppCredentials, ClientError> {
        self.client
            .send(ApiRequest::put(format!("{}/generate-credentials/{}", APP_BASE, id)))
            .await
    }

    pub async fn active(&self) -> Result<Vec<ThirdPartyApp>, ClientError> {
        self.client.get(&format!("{}/active-list", APP_BASE)).await
    }
}

pub struct SubscriptionService {
    client: Arc<ApiClient>,
}

impl SubscriptionService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<PageData<DataSubscription>, ClientError> {
        self.client.get_with(&format!("{}/list", SUBSCRIPTION_BASE), query).await
    }

    pub async fn detail(&self, id: i64) -> Result<DataSubscription, ClientError> {
        self.client.get(&format!("{}/detail/{}", SUBSCRIPTION_BASE, id)).await
    }

    pub async fn create(&self, subscription: &DataSubscription) -> Result<DataSubscription, ClientError> {
        self.client
            .post(&format!("{}/create", SUBSCRIPTION_BASE), subscription)
            .await
    }

    pub async fn update(&self, subscription: &DataSubscription) -> Result<DataSubscription, ClientError> {
        self.client
            .put(&format!("{}/update", SUBSCRIPTION_BASE), subscription)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let _: Value = self
            .client
            .delete(&format!("{}/delete/{}", SUBSCRIPTION_BASE, id))
            .await?;
        Ok(())
    }

    pub async fn set_status(&self, id: i64, status: i32) -> Result<(), ClientError> {
        let request = ApiRequest::put(format!("{}/status/{}", SUBSCRIPTION_BASE, id)).param("status", status);
        let _: Value = self.client.send(request).await?;
        Ok(())
    }

    pub async fn data_types(&self) -> Result<Vec<DataType>, ClientError> {
        self.client.get(&format!("{}/data-types", SUBSCRIPTION_BASE)).await
    }
}
