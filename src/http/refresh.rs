// Token refresh coordination
//
// At most one refresh cycle is in flight. Every 401 observed while a cycle
// runs parks on the cycle's outcome instead of starting another one.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tokio::sync::oneshot;

use crate::auth::{TokenPair, AUTH_PATH_PREFIXES, REFRESH_PATH};
use crate::error::ClientError;
use crate::http::backend::{ApiRequest, HttpBackend};
use crate::http::client::unwrap_response;
use crate::session::SessionStore;

type Waiter = oneshot::Sender<Result<String, String>>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    queue: VecDeque<Waiter>,
    cycles: u64,
}

/// Serializes refresh attempts and fans their outcome out to queued requests
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of refresh calls issued so far
    pub fn cycles(&self) -> u64 {
        self.lock().cycles
    }

    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    /// Recover from a 401 on `request`, which was sent with `sent_with`.
    ///
    /// Returns the access token the request should be replayed with.
    pub async fn recover(
        &self,
        request: &ApiRequest,
        sent_with: Option<&str>,
        session: &SessionStore,
        backend: &dyn HttpBackend,
    ) -> Result<String, ClientError> {
        if is_auth_endpoint(&request.path) {
            tracing::warn!("Auth endpoint {} rejected the credentials", request.path);
            session.logout();
            return Err(ClientError::Unauthorized(format!("{} was rejected", request.path)));
        }

        // A cycle finished while this request was in flight
        if let Some(current) = session.access_token() {
            if sent_with != Some(current.as_str()) && !self.is_refreshing() {
                tracing::debug!("Replaying {} with the already refreshed token", request.path);
                return Ok(current);
            }
        }

        self.refresh(session, backend).await
    }

    /// Run (or join) a refresh cycle and return the new access token
    pub async fn refresh(&self, session: &SessionStore, backend: &dyn HttpBackend) -> Result<String, ClientError> {
        let role = {
            let mut state = self.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.queue.push_back(tx);
                Role::Wait(rx)
            } else {
                match session.refresh_token() {
                    Some(refresh_token) => {
                        state.refreshing = true;
                        state.cycles += 1;
                        Role::Lead(refresh_token)
                    }
                    None => Role::NoRefreshToken,
                }
            }
        };

        match role {
            Role::Lead(refresh_token) => self.lead_cycle(refresh_token, session, backend).await,
            Role::Wait(rx) => match rx.await {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(message)) => Err(ClientError::RefreshFailed(message)),
                Err(_) => Err(ClientError::RefreshFailed("refresh cycle was abandoned".to_string())),
            },
            Role::NoRefreshToken => {
                tracing::warn!("Access token rejected and no refresh token available");
                session.logout();
                Err(ClientError::SessionExpired)
            }
        }
    }

    async fn lead_cycle(
        &self,
        refresh_token: String,
        session: &SessionStore,
        backend: &dyn HttpBackend,
    ) -> Result<String, ClientError> {
        // Resets `refreshing` and settles the queue on every exit path, including drop
        let mut cycle = RefreshCycle {
            coordinator: self,
            outcome: None,
        };

        tracing::debug!("Refreshing access token");
        match exchange_refresh_token(backend, &refresh_token).await {
            Ok(tokens) => {
                session.set_token(tokens.access_token.clone());
                if let Some(next) = tokens.refresh_token {
                    session.set_refresh_token(next);
                }
                cycle.outcome = Some(Ok(tokens.access_token.clone()));
                Ok(tokens.access_token)
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {}", e);
                session.logout();
                // Any refresh failure ends the session, whatever the endpoint answered
                let message = e.to_string();
                cycle.outcome = Some(Err(message.clone()));
                Err(ClientError::RefreshFailed(message))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Role {
    Lead(String),
    Wait(oneshot::Receiver<Result<String, String>>),
    NoRefreshToken,
}

struct RefreshCycle<'a> {
    coordinator: &'a RefreshCoordinator,
    outcome: Option<Result<String, String>>,
}

impl Drop for RefreshCycle<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err("refresh cycle was interrupted".to_string()));

        let waiters: Vec<Waiter> = {
            let mut state = self.coordinator.lock();
            state.refreshing = false;
            state.queue.drain(..).collect()
        };

        if !waiters.is_empty() {
            tracing::debug!("Settling {} queued request(s)", waiters.len());
        }
        // FIFO
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

fn is_auth_endpoint(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    AUTH_PATH_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

async fn exchange_refresh_token(backend: &dyn HttpBackend, refresh_token: &str) -> Result<TokenPair, ClientError> {
    let request = ApiRequest::post(REFRESH_PATH).json(&json!({ "refreshToken": refresh_token }))?;
    let response = backend.send(&request, None).await?;
    if response.status == 401 {
        return Err(ClientError::Unauthorized("refresh token rejected".to_string()));
    }
    let data = unwrap_response(&request, response)?;
    Ok(serde_json::from_value(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;
    use crate::testing::ScriptedBackend;
    use std::sync::Arc;

    fn session_with_tokens() -> SessionStore {
        let session = SessionStore::new(Arc::new(MemoryStorage::new()));
        session.set_token("stale");
        session.set_refresh_token("refresh-1");
        session
    }

    #[test]
    fn test_auth_endpoints() {
        assert!(is_auth_endpoint("/auth/login"));
        assert!(is_auth_endpoint("/auth/refresh?x=1"));
        assert!(!is_auth_endpoint("/auth/info"));
        assert!(!is_auth_endpoint("/system/user/list"));
    }

    #[tokio::test]
    async fn test_refresh_success_updates_session() {
        let session = session_with_tokens();
        let backend = ScriptedBackend::new();
        backend.on_refresh_ok("fresh", Some("refresh-2"));

        let coordinator = RefreshCoordinator::new();
        let token = coordinator.refresh(&session, &backend).await.unwrap();

        assert_eq!(token, "fresh");
        assert_eq!(session.access_token().as_deref(), Some("fresh"));
        assert_eq!(session.refresh_token().as_deref(), Some("refresh-2"));
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.cycles(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_session_and_resets_flag() {
        let session = session_with_tokens();
        let backend = ScriptedBackend::new();
        backend.on_refresh_status(500);

        let coordinator = RefreshCoordinator::new();
        let err = coordinator.refresh(&session, &backend).await.unwrap_err();

        assert!(matches!(err, ClientError::RefreshFailed(_)));
        assert!(err.requires_login());
        assert!(!session.is_authenticated());
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_short_circuits() {
        let session = SessionStore::new(Arc::new(MemoryStorage::new()));
        session.set_token("stale");
        let backend = ScriptedBackend::new();

        let coordinator = RefreshCoordinator::new();
        let err = coordinator.refresh(&session, &backend).await.unwrap_err();

        assert!(matches!(err, ClientError::SessionExpired));
        assert_eq!(backend.calls_to(REFRESH_PATH), 0);
        assert!(!session.is_authenticated());
        assert_eq!(coordinator.cycles(), 0);
    }

    #[tokio::test]
    async fn test_recover_reuses_token_refreshed_in_flight() {
        let session = session_with_tokens();
        session.set_token("already-fresh");
        let backend = ScriptedBackend::new();

        let coordinator = RefreshCoordinator::new();
        let request = ApiRequest::get("/system/user/list");
        let token = coordinator
            .recover(&request, Some("stale"), &session, &backend)
            .await
            .unwrap();

        assert_eq!(token, "already-fresh");
        assert_eq!(backend.calls_to(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_dropped_cycle_rejects_queue_and_unwedges() {
        let coordinator = RefreshCoordinator::new();
        let (tx, rx) = oneshot::channel();
        {
            let mut state = coordinator.lock();
            state.refreshing = true;
            state.queue.push_back(tx);
        }

        drop(RefreshCycle {
            coordinator: &coordinator,
            outcome: None,
        });

        assert!(!coordinator.is_refreshing());
        assert_eq!(rx.await.unwrap(), Err("refresh cycle was interrupted".to_string()));
    }
}
