use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub tenant: TenantConfig,
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Request header carrying the tenant id
    pub header_name: String,
    /// Tenant used when the header is absent or blank
    pub default_tenant_id: i32,
}

/// Where the route registry persists its definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStoreKind {
    Memory,
    File,
    Postgres,
}

impl std::str::FromStr for RouteStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(RouteStoreKind::Memory),
            "file" => Ok(RouteStoreKind::File),
            "postgres" | "pg" => Ok(RouteStoreKind::Postgres),
            other => Err(format!("unknown route store '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub route_store: RouteStoreKind,
    /// File backend location (.yaml/.yml or .json)
    pub route_file: PathBuf,
    /// Buffered refresh notifications per subscriber before it lags
    pub refresh_channel_capacity: usize,
    /// Periodic dispatch-table reconcile; 0 disables it
    pub reconcile_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    /// Menus are kept in Postgres when set, in memory otherwise
    pub menu_in_postgres: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_audit_logging: bool,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
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
        // Server overrides
        if let Some(v) = env::var("HIX_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Tenant overrides
        if let Ok(v) = env::var("TENANT_HEADER") {
            if !v.trim().is_empty() {
                self.tenant.header_name = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("TENANT_DEFAULT_ID") {
            self.tenant.default_tenant_id = v.parse().unwrap_or(self.tenant.default_tenant_id);
        }

        // Gateway overrides
        if let Ok(v) = env::var("GATEWAY_ROUTE_STORE") {
            self.gateway.route_store = v.parse().unwrap_or(self.gateway.route_store);
        }
        if let Ok(v) = env::var("GATEWAY_ROUTE_FILE") {
            self.gateway.route_file = PathBuf::from(v);
        }
        if let Ok(v) = env::var("GATEWAY_REFRESH_CHANNEL_CAPACITY") {
            self.gateway.refresh_channel_capacity = v.parse().unwrap_or(self.gateway.refresh_channel_capacity);
        }
        if let Ok(v) = env::var("GATEWAY_RECONCILE_INTERVAL_SECS") {
            self.gateway.reconcile_interval_secs = v.parse().unwrap_or(self.gateway.reconcile_interval_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_MENU_IN_POSTGRES") {
            self.database.menu_in_postgres = v.parse().unwrap_or(self.database.menu_in_postgres);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 9999 },
            tenant: TenantConfig {
                header_name: "tenantId".to_string(),
                default_tenant_id: 1,
            },
            gateway: GatewayConfig {
                route_store: RouteStoreKind::File,
                route_file: PathBuf::from("config/routes.yaml"),
                refresh_channel_capacity: 16,
                reconcile_interval_secs: 0,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                menu_in_postgres: false,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:8000".to_string(), "http://localhost:5173".to_string()],
                enable_audit_logging: true,
                jwt_secret: "hix-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 9999 },
            tenant: TenantConfig {
                header_name: "tenantId".to_string(),
                default_tenant_id: 1,
            },
            gateway: GatewayConfig {
                route_store: RouteStoreKind::Postgres,
                route_file: PathBuf::from("config/routes.yaml"),
                refresh_channel_capacity: 64,
                reconcile_interval_secs: 60,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                menu_in_postgres: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                enable_audit_logging: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 9999 },
            tenant: TenantConfig {
                header_name: "tenantId".to_string(),
                default_tenant_id: 1,
            },
            gateway: GatewayConfig {
                route_store: RouteStoreKind::Postgres,
                route_file: PathBuf::from("config/routes.yaml"),
                refresh_channel_capacity: 64,
                reconcile_interval_secs: 30,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                menu_in_postgres: true,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                enable_audit_logging: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
        }
    }
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
