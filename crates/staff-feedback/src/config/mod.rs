use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub mirror: MirrorConfig,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub sessions: SessionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let store = StoreConfig {
            url: optional_var("STORE_URL"),
            api_key: optional_var("STORE_API_KEY"),
            staff_table: optional_var("STORE_STAFF_TABLE")
                .unwrap_or_else(|| StoreConfig::DEFAULT_STAFF_TABLE.to_string()),
            feedback_table: optional_var("STORE_FEEDBACK_TABLE")
                .unwrap_or_else(|| StoreConfig::DEFAULT_FEEDBACK_TABLE.to_string()),
        };

        let timeout_secs = match optional_var("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout)?,
            None => HttpConfig::DEFAULT_TIMEOUT_SECS,
        };

        let idle_ttl_secs = match optional_var("SESSION_IDLE_TTL_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidSessionTtl)?,
            None => SessionConfig::DEFAULT_IDLE_TTL_SECS,
        };

        let required = match optional_var("AUTH_REQUIRED") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag { name: "AUTH_REQUIRED" })?,
            None => false,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store,
            mirror: MirrorConfig {
                webhook_url: optional_var("MIRROR_WEBHOOK_URL"),
            },
            http: HttpConfig { timeout_secs },
            auth: AuthConfig { required },
            sessions: SessionConfig { idle_ttl_secs },
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Primary store location. Without a URL the service keeps data in memory.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub staff_table: String,
    pub feedback_table: String,
}

impl StoreConfig {
    pub const DEFAULT_STAFF_TABLE: &'static str = "dados_professores";
    pub const DEFAULT_FEEDBACK_TABLE: &'static str = "feedback_professores";
}

/// Reporting spreadsheet webhook; mirroring is off when unset.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub webhook_url: Option<String>,
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub required: bool,
}

/// Lifetime of idle form sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_ttl_secs: u64,
}

impl SessionConfig {
    pub const DEFAULT_IDLE_TTL_SECS: u64 = 30 * 60;

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidSessionTtl,
    InvalidFlag { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "HTTP_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidSessionTtl => {
                write!(f, "SESSION_IDLE_TTL_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidFlag { name } => write!(f, "{name} must be true or false"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidSessionTtl
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}
