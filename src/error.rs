// Client error types
use thiserror::Error;

/// Failure of a console API call, classified the way callers need to react to it
#[derive(Debug, Error)]
pub enum ClientError {
    // No response reached the client
    #[error("network error: {0}")]
    Network(String),

    // Envelope code != 200
    #[error("{message}")]
    Business { code: i64, message: String },

    // 403 / 404 / 5xx and any other non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // 401 returned by the login/refresh endpoints themselves
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    // 401 that could not be recovered by a refresh
    #[error("session expired, please log in again")]
    SessionExpired,

    // Queued request whose refresh cycle failed
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn business(code: i64, message: impl Into<String>) -> Self {
        ClientError::Business {
            code,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ClientError::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status associated with the failure, when there is one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Unauthorized(_) | ClientError::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// Stable error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Network(_) => "NETWORK_ERROR",
            ClientError::Business { .. } => "BUSINESS_ERROR",
            ClientError::Http { status: 403, .. } => "FORBIDDEN",
            ClientError::Http { status: 404, .. } => "NOT_FOUND",
            ClientError::Http { status, .. } if *status >= 500 => "SERVER_ERROR",
            ClientError::Http { .. } => "HTTP_ERROR",
            ClientError::Unauthorized(_) => "UNAUTHORIZED",
            ClientError::SessionExpired => "SESSION_EXPIRED",
            ClientError::RefreshFailed(_) => "REFRESH_FAILED",
            ClientError::Decode(_) => "INVALID_PAYLOAD",
            ClientError::Storage(_) => "STORAGE_ERROR",
            ClientError::InvalidUrl(_) => "INVALID_URL",
        }
    }

    /// True when the only way forward is a new login
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthorized(_) | ClientError::SessionExpired | ClientError::RefreshFailed(_)
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ClientError::http(403, "no").error_code(), "FORBIDDEN");
        assert_eq!(ClientError::http(404, "gone").error_code(), "NOT_FOUND");
        assert_eq!(ClientError::http(502, "bad gateway").error_code(), "SERVER_ERROR");
        assert_eq!(ClientError::http(418, "teapot").error_code(), "HTTP_ERROR");
        assert_eq!(ClientError::SessionExpired.status_code(), Some(401));
        assert_eq!(ClientError::business(10005, "exists").status_code(), None);
    }

    #[test]
    fn test_requires_login() {
        assert!(ClientError::SessionExpired.requires_login());
        assert!(ClientError::RefreshFailed("boom".into()).requires_login());
        assert!(ClientError::Unauthorized("bad credentials".into()).requires_login());
        assert!(!ClientError::Network("refused".into()).requires_login());
        assert!(!ClientError::business(10001, "failed").requires_login());
    }

    #[test]
    fn test_business_error_displays_server_message() {
        let err = ClientError::business(10005, "user already exists");
        assert_eq!(err.to_string(), "user already exists");
    }
}
