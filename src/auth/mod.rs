// Authentication endpoints
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AuthConfig;
use crate::error::ClientError;
use crate::http::{ApiClient, ApiRequest};
use crate::session::{Identity, IdentitySource, SessionStore};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const INFO_PATH: &str = "/auth/info";

/// Endpoints whose own 401 means bad credentials, never an expired token
pub const AUTH_PATH_PREFIXES: [&str; 2] = [LOGIN_PATH, REFRESH_PATH];

/// Tokens issued by the refresh endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub login_type: Option<String>,
    pub device_id: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            login_type: None,
            device_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub login_type: String,
    pub ip: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user_info: Identity,
}

/// Login, logout and identity lookups against the auth service
pub struct AuthApi {
    client: Arc<ApiClient>,
    config: AuthConfig,
    user_agent: String,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>, config: AuthConfig, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            config,
            user_agent: user_agent.into(),
        }
    }

    fn session(&self) -> &SessionStore {
        self.client.session()
    }

    /// Exchange credentials for tokens and record the new session
    pub async fn login(&self, credentials: Credentials) -> Result<Identity, ClientError> {
        let request = LoginRequest {
            username: credentials.username,
            password: credentials.password,
            login_type: credentials.login_type.unwrap_or_else(|| self.config.login_type.clone()),
            ip: self.config.client_ip.clone(),
            user_agent: self.user_agent.clone(),
            device_id: credentials.device_id,
        };

        tracing::debug!("Logging in as '{}'", request.username);
        let response: LoginResponse = self.client.post(LOGIN_PATH, &request).await?;

        let session = self.session();
        session.set_token(response.access_token);
        // A previous user's refresh token must not outlive their session
        match response.refresh_token {
            Some(refresh_token) => session.set_refresh_token(refresh_token),
            None => session.clear_refresh_token(),
        }
        session.set_identity(response.user_info.clone());

        tracing::info!("Logged in as '{}'", response.user_info.username);
        Ok(response.user_info)
    }

    /// Tell the server, then clear the local session regardless of the answer
    pub async fn logout(&self) -> Result<(), ClientError> {
        if self.session().access_token().is_some() {
            let result: Result<Value, ClientError> = self.client.send(ApiRequest::post(LOGOUT_PATH)).await;
            if let Err(e) = result {
                tracing::warn!("Server-side logout failed: {}", e);
            }
        }
        self.session().logout();
        Ok(())
    }

    /// Current identity as the server sees it
    pub async fn fetch_identity(&self) -> Result<Identity, ClientError> {
        self.client.get(INFO_PATH).await
    }

    /// Fetch the identity and make it the session's snapshot
    pub async fn reload_identity(&self) -> Result<Identity, ClientError> {
        let identity = self.fetch_identity().await?;
        self.session().set_identity(identity.clone());
        Ok(identity)
    }
}

#[async_trait]
impl IdentitySource for AuthApi {
    async fn fetch_identity(&self) -> Result<Identity, ClientError> {
        AuthApi::fetch_identity(self).await
    }
}
