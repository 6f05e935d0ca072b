use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub polling: PollingConfig,
    pub progress: ProgressConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub max_consecutive_errors: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProgressConfig {
    pub expected_duration_secs: u64,  // typical job length, ~20 minutes
    pub cap_percent: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    // Defaults < config file < RESEARCH_* environment variables
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let builder = config::Config::builder()
            .set_default("server.base_url", "http://localhost:5000")?
            .set_default("client.request_timeout_secs", 30_i64)?
            .set_default("client.connect_timeout_secs", 10_i64)?
            .set_default("polling.interval_secs", 5_i64)?
            .set_default("polling.max_consecutive_errors", 3_i64)?
            .set_default("progress.expected_duration_secs", 1200_i64)?
            .set_default("progress.cap_percent", 95.0)?
            .set_default("logging.level", "info")?;

        let builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("config/default").required(false)),
        };

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix("RESEARCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(AppError::InvalidConfig("server.base_url must not be empty".into()));
        }
        if self.polling.interval_secs == 0 {
            return Err(AppError::InvalidConfig("polling.interval_secs must be at least 1".into()));
        }
        if self.polling.max_consecutive_errors == 0 {
            return Err(AppError::InvalidConfig(
                "polling.max_consecutive_errors must be at least 1".into(),
            ));
        }
        if self.progress.expected_duration_secs == 0 {
            return Err(AppError::InvalidConfig(
                "progress.expected_duration_secs must be at least 1".into(),
            ));
        }
        if !(self.progress.cap_percent > 0.0 && self.progress.cap_percent < 100.0) {
            return Err(AppError::InvalidConfig(
                "progress.cap_percent must be between 0 and 100 (exclusive)".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.client.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.client.connect_timeout_secs)
    }
}
