#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use staoo_console::config::AppConfig;
use staoo_console::http::ReqwestBackend;
use staoo_console::session::{MemoryStorage, SessionStore};
use staoo_console::AppContext;

pub const PASSWORD: &str = "secret";
pub const REFRESH_TOKEN: &str = "refresh-token";

/// In-process console backend speaking the envelope protocol
pub struct FakeConsole {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

#[derive(Default)]
pub struct FakeState {
    valid_token: Mutex<String>,
    issued: AtomicUsize,
    refresh_fails: AtomicBool,
    refresh_unavailable: AtomicBool,
    refresh_delay_ms: AtomicU64,
    envelope_unauthorized: AtomicBool,
    menu_down: AtomicBool,
    info_down: AtomicBool,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub info_calls: AtomicUsize,
    pub nav_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

impl FakeState {
    fn issue(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("access-{}", n);
        *self.valid_token.lock().unwrap() = token.clone();
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let valid = self.valid_token.lock().unwrap().clone();
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| !valid.is_empty() && token == valid)
            .unwrap_or(false)
    }

    fn unauthorized(&self) -> Response {
        if self.envelope_unauthorized.load(Ordering::SeqCst) {
            Json(json!({ "code": 10021, "message": "token expired" })).into_response()
        } else {
            (StatusCode::UNAUTHORIZED, Json(json!({ "code": 401, "message": "unauthorized" }))).into_response()
        }
    }

    pub fn valid_token(&self) -> String {
        self.valid_token.lock().unwrap().clone()
    }

    /// Treat `token` as the current access token, as if issued by an earlier run
    pub fn accept_token(&self, token: &str) {
        *self.valid_token.lock().unwrap() = token.to_string();
    }

    /// Invalidate every outstanding access token
    pub fn expire_tokens(&self) {
        *self.valid_token.lock().unwrap() = "revoked".to_string();
    }

    pub fn fail_refresh(&self) {
        self.refresh_fails.store(true, Ordering::SeqCst);
    }

    /// Answer refresh calls with 503 instead of a token
    pub fn break_refresh(&self) {
        self.refresh_unavailable.store(true, Ordering::SeqCst);
    }

    pub fn slow_refresh(&self, delay: Duration) {
        self.refresh_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn signal_401_in_envelope(&self) {
        self.envelope_unauthorized.store(true, Ordering::SeqCst);
    }

    pub fn take_menu_down(&self) {
        self.menu_down.store(true, Ordering::SeqCst);
    }

    pub fn take_info_down(&self) {
        self.info_down.store(true, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn ok(data: Value) -> Response {
    Json(json!({ "code": 200, "message": "success", "data": data })).into_response()
}

pub fn admin_identity() -> Value {
    json!({
        "id": 1,
        "username": "admin",
        "nickname": "Administrator",
        "roles": ["admin"],
        "permissions": ["system:user:list"],
        "tenantId": 100,
        "tenantCode": "acme"
    })
}

pub fn admin_menu() -> Value {
    json!({
        "menuList": [
            {
                "id": 1,
                "path": "/dashboard",
                "name": "Dashboard",
                "component": "modules/dashboard/Dashboard.vue",
                "meta": { "title": "Dashboard", "icon": "home" }
            },
            {
                "id": 10,
                "path": "/system",
                "name": "System",
                "component": "Layout",
                "redirect": "/system/user",
                "meta": { "title": "System", "icon": "setting" },
                "children": [
                    {
                        "id": 11,
                        "parentId": 10,
                        "path": "user",
                        "name": "SystemUser",
                        "component": "modules/system/user/UserList.vue",
                        "meta": { "title": "Users" },
                        "children": [
                            { "id": 111, "parentId": 11, "menuName": "Add user", "menuType": 2, "perms": "system:user:add" }
                        ]
                    },
                    {
                        "id": 12,
                        "parentId": 10,
                        "path": "role",
                        "name": "SystemRole",
                        "component": "modules/system/role/RoleList.vue",
                        "meta": { "title": "Roles", "roles": ["superadmin"] }
                    }
                ]
            }
        ],
        "permissions": ["system:user:list"]
    })
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["password"] != PASSWORD {
        return Json(json!({ "code": 500, "message": "invalid username or password" })).into_response();
    }
    let token = state.issue();
    ok(json!({
        "accessToken": token,
        "refreshToken": REFRESH_TOKEN,
        "tokenType": "Bearer",
        "expiresIn": 7200,
        "userInfo": admin_identity(),
    }))
}

async fn refresh(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.refresh_unavailable.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "code": 503, "message": "auth service down" })))
            .into_response();
    }
    if state.refresh_fails.load(Ordering::SeqCst) || body["refreshToken"] != REFRESH_TOKEN {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "code": 401, "message": "refresh token expired" })))
            .into_response();
    }
    let token = state.issue();
    ok(json!({ "accessToken": token, "refreshToken": REFRESH_TOKEN }))
}

async fn logout() -> Response {
    ok(Value::Null)
}

async fn info(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.info_calls.fetch_add(1, Ordering::SeqCst);
    if state.info_down.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if !state.authorized(&headers) {
        return state.unauthorized();
    }
    ok(admin_identity())
}

async fn nav(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.nav_calls.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return state.unauthorized();
    }
    if state.menu_down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "code": 503, "message": "menu service down" })))
            .into_response();
    }
    ok(admin_menu())
}

async fn user_detail(State(state): State<Arc<FakeState>>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    state.detail_calls.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return state.unauthorized();
    }
    ok(json!({ "id": id, "username": format!("user-{}", id), "status": 1 }))
}

pub async fn start_console() -> Result<FakeConsole> {
    let state = Arc::new(FakeState::default());
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/info", get(info))
        .route("/api/system/menu/nav", get(nav))
        .route("/api/system/user/:id", get(user_detail))
        .with_state(state.clone());

    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind fake console")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(FakeConsole {
        base_url: format!("http://127.0.0.1:{}/api", port),
        state,
    })
}

/// Context wired to the fake console with in-memory session storage
pub fn context_for(console: &FakeConsole, storage: Arc<MemoryStorage>) -> Result<AppContext> {
    let config = AppConfig::for_base_url(console.base_url.clone());
    let backend = Arc::new(ReqwestBackend::new(&config.api)?);
    Ok(AppContext::new(config, backend, storage))
}

pub fn fresh_context(console: &FakeConsole) -> Result<AppContext> {
    context_for(console, Arc::new(MemoryStorage::new()))
}

/// Number of `LoggedOut` events already queued on `rx`
pub fn drain_logouts(rx: &mut tokio::sync::broadcast::Receiver<staoo_console::session::SessionEvent>) -> usize {
    let mut count = 0;
    while let Ok(event) = rx.try_recv() {
        if event == staoo_console::session::SessionEvent::LoggedOut {
            count += 1;
        }
    }
    count
}

pub fn session_is_clear(session: &SessionStore) -> bool {
    session.snapshot().is_empty()
}
