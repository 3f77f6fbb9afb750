use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::engine::ScoreTable;

/// Deployment stage. Anything that is not explicitly production runs with
/// developer ergonomics (ansi log output); unknown values are rejected
/// rather than silently demoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "local" | "test" | "ci" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Top-level configuration for the engine service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Read configuration from the environment (a `.env` file is honored
    /// when present). Every key has a default; set keys must parse.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = match env_value("CREATORLIFT_ENV") {
            Some(raw) => AppEnvironment::parse(&raw)?,
            None => AppEnvironment::Development,
        };

        let host =
            env_value("CREATORLIFT_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parsed("CREATORLIFT_PORT", 3000_u16)?;

        let log_level =
            env_value("CREATORLIFT_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: !environment.is_production(),
            },
            engine: EngineConfig::load()?,
        })
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

/// Tracing controls. `ansi` follows the environment: colored output for
/// development, plain for production log collectors.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Engine tunables. The score table itself is code, not configuration:
/// `CREATORLIFT_SCORE_TABLE_VERSION` only pins the version a deployment
/// expects, so a rollout against a binary carrying different business
/// numbers fails at startup instead of scoring wrong.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sweep_interval_secs: u64,
    pub score_table: ScoreTable,
}

impl EngineConfig {
    fn load() -> Result<Self, ConfigError> {
        let sweep_interval_secs = parsed("CREATORLIFT_SWEEP_INTERVAL_SECS", 300_u64)?;

        let score_table = ScoreTable::default();
        if let Some(raw) = env_value("CREATORLIFT_SCORE_TABLE_VERSION") {
            let requested: u32 = raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "CREATORLIFT_SCORE_TABLE_VERSION",
                    value: raw,
                })?;
            if requested != score_table.version {
                return Err(ConfigError::ScoreTableVersion {
                    requested,
                    supported: score_table.version,
                });
            }
        }

        Ok(Self {
            sweep_interval_secs,
            score_table,
        })
    }
}

/// A set-but-empty variable counts as unset.
fn env_value(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_value(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has unparseable value '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("CREATORLIFT_HOST must be 'localhost' or an IP address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("CREATORLIFT_ENV '{0}' is not a known environment")]
    UnknownEnvironment(String),
    #[error("score table version {requested} requested, this build carries {supported}")]
    ScoreTableVersion { requested: u32, supported: u32 },
}
