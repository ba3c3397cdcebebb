use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::auth::{AUTH_PATH_PREFIXES, REFRESH_PATH};
use crate::error::ClientError;
use crate::http::{ApiRequest, HttpBackend, RawResponse};

/// Token gate in front of every non-auth route
#[derive(Clone)]
enum TokenGate {
    Status401(String),
    Envelope { token: String, code: i64 },
}

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub request: ApiRequest,
    pub bearer: Option<String>,
}

/// In-memory `HttpBackend` with canned responses per path.
///
/// Unscripted paths answer 404. Every call is recorded before it is answered.
#[derive(Default)]
pub struct ScriptedBackend {
    routes: Mutex<HashMap<String, RawResponse>>,
    latency: Mutex<HashMap<String, Duration>>,
    gate: Mutex<Option<TokenGate>>,
    log: Mutex<Vec<Recorded>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful envelope wrapping `data`
    pub fn on_ok(&self, path: &str, data: Value) {
        self.on_envelope(path, json!({ "code": 200, "message": "success", "data": data }));
    }

    /// HTTP 200 with an arbitrary envelope
    pub fn on_envelope(&self, path: &str, envelope: Value) {
        self.on_raw(path, 200, envelope.to_string().into_bytes());
    }

    pub fn on_status(&self, path: &str, status: u16) {
        let body = json!({ "code": status, "message": format!("status {}", status) });
        self.on_raw(path, status, body.to_string().into_bytes());
    }

    pub fn on_raw(&self, path: &str, status: u16, body: Vec<u8>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), RawResponse::new(status, body));
    }

    pub fn on_refresh_ok(&self, access_token: &str, refresh_token: Option<&str>) {
        self.on_ok(
            REFRESH_PATH,
            json!({ "accessToken": access_token, "refreshToken": refresh_token }),
        );
    }

    pub fn on_refresh_status(&self, status: u16) {
        self.on_status(REFRESH_PATH, status);
    }

    /// Delay every answer on `path`
    pub fn with_latency(&self, path: &str, latency: Duration) {
        self.latency.lock().unwrap().insert(path.to_string(), latency);
    }

    /// Answer HTTP 401 to any non-auth call not carrying `token`
    pub fn require_token(&self, token: &str) {
        *self.gate.lock().unwrap() = Some(TokenGate::Status401(token.to_string()));
    }

    /// Like `require_token`, but reject with HTTP 200 and envelope `code`
    pub fn require_token_with_envelope(&self, token: &str, code: i64) {
        *self.gate.lock().unwrap() = Some(TokenGate::Envelope {
            token: token.to_string(),
            code,
        });
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.recorded(path).into_iter().map(|r| r.request).collect()
    }

    pub fn bearers_for(&self, path: &str) -> Vec<Option<String>> {
        self.recorded(path).into_iter().map(|r| r.bearer).collect()
    }

    pub fn total_calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    fn recorded(&self, path: &str) -> Vec<Recorded> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.request.path == path)
            .cloned()
            .collect()
    }

    fn gate_rejection(&self, path: &str, bearer: Option<&str>) -> Option<RawResponse> {
        if AUTH_PATH_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            return None;
        }
        match self.gate.lock().unwrap().clone()? {
            TokenGate::Status401(token) if bearer != Some(token.as_str()) => {
                Some(RawResponse::json(401, &json!({ "code": 401, "message": "unauthorized" })))
            }
            TokenGate::Envelope { token, code } if bearer != Some(token.as_str()) => {
                Some(RawResponse::json(200, &json!({ "code": code, "message": "token expired" })))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl HttpBackend for ScriptedBackend {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, ClientError> {
        self.log.lock().unwrap().push(Recorded {
            request: request.clone(),
            bearer: bearer.map(str::to_string),
        });

        let latency = self.latency.lock().unwrap().get(&request.path).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(rejection) = self.gate_rejection(&request.path, bearer) {
            return Ok(rejection);
        }

        let scripted = self.routes.lock().unwrap().get(&request.path).cloned();
        Ok(scripted.unwrap_or_else(|| RawResponse::json(404, &json!({ "code": 404, "message": "not found" }))))
    }
}
