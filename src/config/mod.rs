use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
    /// Path of the WebSocket endpoint.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HeartbeatConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub allowed_origins: Vec<String>,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub heartbeat: HeartbeatConfig,
    pub cors: CorsConfig,
    pub log: LogConfig,
}

fn with_defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("environment", environment)?
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("server.path", "/Server")?
        .set_default("heartbeat.interval_secs", 30)?
        .set_default("heartbeat.timeout_secs", 40)?
        .set_default("cors.enabled", true)?
        .set_default("cors.allow_any_origin", true)?
        .set_default("cors.allowed_origins", Vec::<String>::new())?
        .set_default("cors.max_age", 3600)?
        .set_default("log.level", "info")
}

impl Settings {
    pub fn new() -> Result<Self, AppError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = with_defaults("development")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .separator("__")
                    .try_parsing(true)
            );

        Self::from_builder(builder)
    }

    /// Defaults only, without files or environment overrides.
    pub fn new_for_test() -> Result<Self, AppError> {
        Self::from_builder(with_defaults("test")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.server.port == 0 {
            return Err(AppError::ConfigError("server.port must be non-zero".into()));
        }
        if self.server.workers == 0 {
            return Err(AppError::ConfigError("server.workers must be at least 1".into()));
        }
        if !self.server.path.starts_with('/') {
            return Err(AppError::ConfigError(format!(
                "server.path must start with '/': {}",
                self.server.path
            )));
        }
        if self.heartbeat.interval_secs == 0 {
            return Err(AppError::ConfigError("heartbeat.interval_secs must be positive".into()));
        }
        if self.heartbeat.timeout_secs <= self.heartbeat.interval_secs {
            return Err(AppError::ConfigError(
                "heartbeat.timeout_secs must exceed heartbeat.interval_secs".into(),
            ));
        }
        Ok(())
    }
}
