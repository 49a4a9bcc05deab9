use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::analytics::EngineConfig;

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
    pub engine: EngineConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: load_engine_config()?,
        })
    }
}

/// Engine defaults with `HEMO_*` overrides applied.
fn load_engine_config() -> Result<EngineConfig, ConfigError> {
    let mut engine = EngineConfig::default();

    if let Some(score) = setting::<u8>("HEMO_MATCH_MIN_SCORE")? {
        engine.scoring.minimum_match_score = score;
    }
    if let Some(top_n) = setting::<usize>("HEMO_MATCH_TOP_N")? {
        engine.scoring.default_top_n = top_n;
    }
    if let Some(days) = setting::<u32>("HEMO_FORECAST_HORIZON_DAYS")? {
        engine.forecast.default_horizon_days = days;
    }
    if let Some(days) = setting::<u32>("HEMO_FORECAST_MAX_HORIZON_DAYS")? {
        engine.forecast.max_horizon_days = days;
    }
    if let Some(days) = setting::<u32>("HEMO_FORECAST_HISTORY_DAYS")? {
        engine.forecast.history_days = days;
    }
    if let Some(days) = setting::<i64>("HEMO_DONATION_GAP_DAYS")? {
        engine.eligibility.donation_gap_days = days;
    }

    Ok(engine)
}

fn setting<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidSetting { name, value: raw }),
        _ => Ok(None),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSetting { name, value } => {
                write!(f, "{name} has an unusable value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidSetting { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "HEMO_MATCH_MIN_SCORE",
            "HEMO_MATCH_TOP_N",
            "HEMO_FORECAST_HORIZON_DAYS",
            "HEMO_FORECAST_MAX_HORIZON_DAYS",
            "HEMO_FORECAST_HISTORY_DAYS",
            "HEMO_DONATION_GAP_DAYS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.engine.scoring.minimum_match_score, 40);
        assert_eq!(config.engine.forecast.default_horizon_days, 7);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn engine_overrides_are_applied() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HEMO_MATCH_MIN_SCORE", "55");
        env::set_var("HEMO_MATCH_TOP_N", "5");
        env::set_var("HEMO_FORECAST_HORIZON_DAYS", "14");
        env::set_var("HEMO_DONATION_GAP_DAYS", "56");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.scoring.minimum_match_score, 55);
        assert_eq!(config.engine.scoring.default_top_n, 5);
        assert_eq!(config.engine.forecast.default_horizon_days, 14);
        assert_eq!(config.engine.forecast.history_days, 90);
        assert_eq!(config.engine.eligibility.donation_gap_days, 56);
        reset_env();
    }

    #[test]
    fn unparseable_engine_setting_names_the_variable() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HEMO_MATCH_TOP_N", "many");
        let error = AppConfig::load().expect_err("bad value rejected");
        assert_eq!(
            error.to_string(),
            "HEMO_MATCH_TOP_N has an unusable value 'many'"
        );
        reset_env();
    }
}
