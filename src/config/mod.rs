use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub security: SecurityConfig,
    pub provider: ProviderConfig,
    pub warmer: WarmerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the sibling provider service, e.g. `http://localhost:4000`
    pub base_url: String,
    /// Shared static key sent as `x-api-key`
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmerConfig {
    pub base_url: String,
    pub targets: Vec<WarmTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmTarget {
    pub path: String,
    #[serde(default)]
    pub method: WarmMethod,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarmMethod {
    Get,
    #[default]
    Post,
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

    fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env::var("APIDON_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Store overrides
        if let Ok(v) = env::var("STORE_BACKEND") {
            self.store.backend = match v.to_ascii_lowercase().as_str() {
                "postgres" | "pg" => StoreBackend::Postgres,
                "memory" | "mem" => StoreBackend::Memory,
                _ => self.store.backend,
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.store.database_url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.store.max_connections = v.parse().unwrap_or(self.store.max_connections);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Provider overrides
        if let Ok(v) = env::var("PROVIDER_BASE_URL") {
            self.provider.base_url = v;
        }
        if let Ok(v) = env::var("PROVIDER_API_KEY") {
            self.provider.api_key = v;
        }
        if let Ok(v) = env::var("PROVIDER_TIMEOUT_SECS") {
            self.provider.timeout_secs = v.parse().unwrap_or(self.provider.timeout_secs);
        }

        // Warmer overrides
        if let Ok(v) = env::var("WARMER_BASE_URL") {
            self.warmer.base_url = v;
        }
        if let Ok(v) = env::var("WARMER_TARGETS") {
            self.warmer.targets = parse_warm_targets(&v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 10,
            },
            security: SecurityConfig {
                jwt_secret: "apidon-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            provider: ProviderConfig {
                base_url: "http://localhost:4000".to_string(),
                api_key: "development-provider-key".to_string(),
                timeout_secs: 10,
            },
            warmer: WarmerConfig {
                base_url: "http://localhost:3000".to_string(),
                targets: default_warm_targets(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 8080 },
            store: StoreConfig {
                backend: StoreBackend::Postgres,
                database_url: None,
                max_connections: 20,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.apidon.com".to_string()],
            },
            provider: ProviderConfig {
                base_url: "https://provider.staging.apidon.com".to_string(),
                api_key: String::new(),
                timeout_secs: 5,
            },
            warmer: WarmerConfig {
                base_url: "https://staging.apidon.com".to_string(),
                targets: default_warm_targets(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 8080 },
            store: StoreConfig {
                backend: StoreBackend::Postgres,
                database_url: None,
                max_connections: 50,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                enable_cors: true,
                cors_origins: vec!["https://apidon.com".to_string()],
            },
            provider: ProviderConfig {
                base_url: "https://provider.apidon.com".to_string(),
                api_key: String::new(),
                timeout_secs: 5,
            },
            warmer: WarmerConfig {
                base_url: "https://apidon.com".to_string(),
                targets: default_warm_targets(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn default_warm_targets() -> Vec<WarmTarget> {
    [
        "/api/notifications/list",
        "/api/provider/deal",
        "/api/frenlets/sendReply",
        "/api/postDelete",
    ]
    .into_iter()
    .map(|path| WarmTarget {
        path: path.to_string(),
        method: WarmMethod::Post,
    })
    .collect()
}

/// Parses `GET:/health,POST:/api/like,/api/follow` style target lists.
/// Entries without a method prefix default to POST.
pub fn parse_warm_targets(raw: &str) -> Vec<WarmTarget> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((method, path)) if method.eq_ignore_ascii_case("get") => WarmTarget {
                path: path.to_string(),
                method: WarmMethod::Get,
            },
            Some((method, path)) if method.eq_ignore_ascii_case("post") => WarmTarget {
                path: path.to_string(),
                method: WarmMethod::Post,
            },
            _ => WarmTarget {
                path: entry.to_string(),
                method: WarmMethod::Post,
            },
        })
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(!config.security.jwt_secret.is_empty());
        assert!(!config.warmer.targets.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.security.jwt_expiry_hours, 4);
    }

    #[test]
    fn test_parse_warm_targets() {
        let targets = parse_warm_targets("GET:/health, /api/like ,post:/api/follow,");
        assert_eq!(
            targets,
            vec![
                WarmTarget { path: "/health".into(), method: WarmMethod::Get },
                WarmTarget { path: "/api/like".into(), method: WarmMethod::Post },
                WarmTarget { path: "/api/follow".into(), method: WarmMethod::Post },
            ]
        );
    }
}
