use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub login_path: String,
    pub landing_path: String,
    pub login_type: String,
    pub client_ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `session.json`; `None` means `$HOME/.config/staoo/console`
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub title_suffix: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Defaults for a console talking to `base_url`, used by tests and embedders
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.api.base_url = base_url.into();
        config
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("STAOO_API_BASE_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = env::var("STAOO_API_TIMEOUT_SECS") {
            self.api.timeout_secs = v.parse().unwrap_or(self.api.timeout_secs);
        }
        if let Ok(v) = env::var("STAOO_API_USER_AGENT") {
            self.api.user_agent = v;
        }

        // Auth overrides
        if let Ok(v) = env::var("STAOO_LOGIN_PATH") {
            self.auth.login_path = v;
        }
        if let Ok(v) = env::var("STAOO_LANDING_PATH") {
            self.auth.landing_path = v;
        }
        if let Ok(v) = env::var("STAOO_LOGIN_TYPE") {
            self.auth.login_type = v;
        }
        if let Ok(v) = env::var("STAOO_CLIENT_IP") {
            self.auth.client_ip = v;
        }

        // Storage overrides
        if let Ok(v) = env::var("STAOO_CONFIG_DIR") {
            self.storage.dir = Some(PathBuf::from(v));
        }

        // Routing overrides
        if let Ok(v) = env::var("STAOO_TITLE_SUFFIX") {
            self.routing.title_suffix = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                timeout_secs: 10,
                user_agent: default_user_agent(),
            },
            auth: AuthConfig::default(),
            storage: StorageConfig { dir: None },
            routing: RoutingConfig {
                title_suffix: "Staoo Admin".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging.staoo.example.com/api".to_string(),
                timeout_secs: 10,
                user_agent: default_user_agent(),
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://admin.staoo.example.com/api".to_string(),
                timeout_secs: 15,
                user_agent: default_user_agent(),
            },
            ..Self::development()
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            landing_path: "/dashboard".to_string(),
            login_type: "PASSWORD".to_string(),
            client_ip: "127.0.0.1".to_string(),
        }
    }
}

fn default_user_agent() -> String {
    format!("staoo-console/{}", env!("CARGO_PKG_VERSION"))
}

// Global config for the command-line front end - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
