use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/api";
pub const DEFAULT_FUNCTIONS_PATH: &str = "/functions/v1/api";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub registration: RegistrationConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    pub enable_swagger: bool,
}

/// Upstream managed backend. Both values are optional at load time; a missing
/// value is reported per request by the proxy.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub functions_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    pub ttl_seconds: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistrationConfig {
    pub auto_activate: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxyConfig {
    pub session_cookie: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/affiliate_hub".to_string(),
            max_connections: 16,
            min_connections: 0,
            acquire_timeout: 5,
            run_migrations: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            allow_credentials: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            enable_swagger: true,
        }
    }
}

impl ApiConfig {
    /// Absolute path of `path` under the configured base path.
    pub fn path_for(&self, path: &str) -> String {
        join_base_path(&normalize_base_path(&self.base_path), path)
    }
}

pub(crate) fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_API_BASE_PATH.to_string();
    }

    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

pub(crate) fn join_base_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            functions_path: DEFAULT_FUNCTIONS_PATH.to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 60 * 60 * 24,
            cookie_secure: false,
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self { auto_activate: true }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            session_cookie: "admin_session".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Affiliate.toml (base configuration file)
    /// 2. Environment variables prefixed with AFFILIATE_, `__` separating sections
    ///    (e.g. AFFILIATE_SESSION__TTL_SECONDS)
    /// 3. DATABASE_URL, BACKEND_URL and BACKEND_ANON_KEY as plain variables
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        let defaults = toml::to_string(&Config::default()).unwrap_or_default();

        Figment::new()
            .merge(Toml::string(&defaults))
            .merge(Toml::file("Affiliate.toml").nested())
            .merge(Env::prefixed("AFFILIATE_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["BACKEND_URL"]).map(|_| "backend.url".into()))
            .merge(Env::raw().only(&["BACKEND_ANON_KEY"]).map(|_| "backend.anon_key".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_backend_unconfigured() {
        let config = Config::default();
        assert!(config.backend.url.is_none());
        assert!(config.backend.anon_key.is_none());
        assert_eq!(config.backend.functions_path, DEFAULT_FUNCTIONS_PATH);
        assert_eq!(config.session.ttl_seconds, 86_400);
    }

    #[test]
    fn paths_are_resolved_under_the_base_path() {
        let mut api = ApiConfig::default();
        assert_eq!(api.path_for("/admin/affiliates/7"), "/api/admin/affiliates/7");

        api.base_path = "v2/".to_string();
        assert_eq!(api.path_for("admin/companies/7"), "/v2/admin/companies/7");

        api.base_path = "/".to_string();
        assert_eq!(api.path_for("/admin/companies/7"), "/admin/companies/7");
    }

    #[test]
    fn env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BACKEND_URL", "https://backend.example.com");
            jail.set_env("BACKEND_ANON_KEY", "anon");
            jail.set_env("AFFILIATE_SESSION__TTL_SECONDS", "120");

            let config: Config = Config::figment().extract()?;
            assert_eq!(config.backend.url.as_deref(), Some("https://backend.example.com"));
            assert_eq!(config.backend.anon_key.as_deref(), Some("anon"));
            assert_eq!(config.session.ttl_seconds, 120);
            Ok(())
        });
    }

    #[test]
    fn toml_file_is_layered_under_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "Affiliate.toml",
                r#"
                [default.proxy]
                session_cookie = "affiliate_session"

                [default.registration]
                auto_activate = false
                "#,
            )?;

            let config: Config = Config::figment().extract()?;
            assert_eq!(config.proxy.session_cookie, "affiliate_session");
            assert!(!config.registration.auto_activate);
            Ok(())
        });
    }
}
