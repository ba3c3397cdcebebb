use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::http::backend::{ApiRequest, HttpBackend, RawResponse, UploadFile};
use crate::http::refresh::RefreshCoordinator;
use crate::session::SessionStore;
use crate::types::{Envelope, UNAUTHORIZED_CODES};

/// Console API client: bearer injection, envelope unwrapping and transparent
/// recovery from expired access tokens.
pub struct ApiClient {
    backend: Arc<dyn HttpBackend>,
    session: Arc<SessionStore>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    pub fn new(backend: Arc<dyn HttpBackend>, session: Arc<SessionStore>) -> Self {
        Self {
            backend,
            session,
            refresh: RefreshCoordinator::new(),
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(ApiRequest::get(path).query(query)?).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// DELETE carrying a JSON body (batch deletes)
    pub async fn delete_with<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::delete(path).json(body)?).await
    }

    /// Multipart upload of one file under the `file` field
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, file: UploadFile) -> Result<T, ClientError> {
        self.send(ApiRequest::post(path).file(file)).await
    }

    /// Raw bytes of a non-enveloped response (exports)
    pub async fn download(&self, request: ApiRequest) -> Result<Vec<u8>, ClientError> {
        let response = self.exchange(&request).await?;
        if !response.is_success() {
            return Err(status_error(&request, &response));
        }
        Ok(response.body)
    }

    /// Send a request and decode the envelope's `data` into `T`
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let data = self.send_value(request).await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn send_value(&self, request: ApiRequest) -> Result<Value, ClientError> {
        let response = self.exchange(&request).await?;
        unwrap_response(&request, response)
    }

    /// Run one refresh cycle now, joining an in-flight one if any
    pub async fn refresh_now(&self) -> Result<String, ClientError> {
        self.refresh.refresh(&self.session, self.backend.as_ref()).await
    }

    /// One logical request/response cycle; a 401 is recovered underneath at most once
    async fn exchange(&self, request: &ApiRequest) -> Result<RawResponse, ClientError> {
        let sent_with = self.session.access_token();
        let response = self.backend.send(request, sent_with.as_deref()).await?;
        if !is_unauthorized(&response) {
            return Ok(response);
        }

        tracing::debug!("{} {} was unauthorized", request.method.as_str(), request.path);
        let token = self
            .refresh
            .recover(request, sent_with.as_deref(), &self.session, self.backend.as_ref())
            .await?;

        let replay = self.backend.send(request, Some(&token)).await?;
        if is_unauthorized(&replay) {
            tracing::warn!("{} still unauthorized after token refresh", request.path);
            self.session.logout();
            return Err(ClientError::SessionExpired);
        }
        Ok(replay)
    }
}

fn is_unauthorized(response: &RawResponse) -> bool {
    if response.status == 401 {
        return true;
    }
    response.is_success()
        && Envelope::peek_code(&response.body).is_some_and(|code| UNAUTHORIZED_CODES.contains(&code))
}

/// Classify a raw response into the envelope's `data` or a failure
pub(crate) fn unwrap_response(request: &ApiRequest, response: RawResponse) -> Result<Value, ClientError> {
    if !response.is_success() {
        return Err(status_error(request, &response));
    }

    let envelope: Envelope = serde_json::from_slice(&response.body)?;
    if !envelope.is_success() {
        tracing::error!(
            "Business error from {}: {} ({})",
            request.path,
            envelope.error_message(),
            envelope.code
        );
    }
    envelope.into_data()
}

fn status_error(request: &ApiRequest, response: &RawResponse) -> ClientError {
    let message = Envelope::peek_message(&response.body).unwrap_or_else(|| default_reason(response.status).to_string());
    match response.status {
        403 => tracing::warn!("Permission denied for {}", request.path),
        404 => tracing::warn!("Resource not found: {}", request.path),
        500..=599 => tracing::error!("Server error {} from {}: {}", response.status, request.path, message),
        status => tracing::warn!("Unexpected status {} from {}", status, request.path),
    }
    ClientError::http(response.status, message)
}

fn default_reason(status: u16) -> &'static str {
    match status {
        400 => "bad request",
        401 => "unauthorized",
        403 => "permission denied",
        404 => "resource not found",
        405 => "method not allowed",
        429 => "too many requests",
        500 => "internal server error",
        502 => "bad gateway",
        503 => "service unavailable",
        504 => "gateway timeout",
        _ => "unexpected response",
    }
}
