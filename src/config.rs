use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
    #[error("Environment error: {0}")]
    EnvError(#[from] env::VarError),
}

/// Remote endpoint and session limits for the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub server_host: String,
    pub server_port: u16,
    pub upload_path: String,
    /// Connect budget is `connect_timeout_units * poll_interval`
    pub connect_timeout_units: u32,
    pub poll_interval: Duration,
    pub reply_timeout: Duration,
    pub chunk_size: usize,
    pub response_capacity: usize,
    /// How long a terminal status stays on screen before returning to idle
    pub status_hold: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            server_host: "192.168.1.11".to_string(),
            server_port: 3000,
            upload_path: "/upload".to_string(),
            connect_timeout_units: 100,
            poll_interval: Duration::from_millis(100),
            reply_timeout: Duration::from_secs(10),
            chunk_size: 512,
            response_capacity: 512,
            status_hold: Duration::from_millis(2000),
        }
    }
}

impl DeviceConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            server_host: env::var("AGENDA_SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: Self::parse_var("AGENDA_SERVER_PORT", defaults.server_port)?,
            upload_path: env::var("AGENDA_UPLOAD_PATH").unwrap_or(defaults.upload_path),
            connect_timeout_units: Self::parse_var(
                "AGENDA_CONNECT_TIMEOUT_UNITS",
                defaults.connect_timeout_units,
            )?,
            poll_interval: Self::parse_millis("AGENDA_POLL_INTERVAL_MS", defaults.poll_interval)?,
            reply_timeout: Self::parse_millis("AGENDA_REPLY_TIMEOUT_MS", defaults.reply_timeout)?,
            chunk_size: Self::parse_var("AGENDA_CHUNK_SIZE", defaults.chunk_size)?,
            response_capacity: Self::parse_var(
                "AGENDA_RESPONSE_CAPACITY",
                defaults.response_capacity,
            )?,
            status_hold: Self::parse_millis("AGENDA_STATUS_HOLD_MS", defaults.status_hold)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make an upload session impossible
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_host.trim().is_empty() {
            return Err(invalid("AGENDA_SERVER_HOST", "host cannot be empty"));
        }
        if !self.upload_path.starts_with('/') {
            return Err(invalid("AGENDA_UPLOAD_PATH", "path must start with '/'"));
        }
        if self.connect_timeout_units == 0 {
            return Err(invalid(
                "AGENDA_CONNECT_TIMEOUT_UNITS",
                "timeout units must be at least 1",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid("AGENDA_POLL_INTERVAL_MS", "poll interval must be non-zero"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("AGENDA_CHUNK_SIZE", "chunk size must be non-zero"));
        }
        if self.response_capacity == 0 {
            return Err(invalid(
                "AGENDA_RESPONSE_CAPACITY",
                "response capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// Total time allowed for the connect signal to arrive
    pub fn connect_budget(&self) -> Duration {
        self.poll_interval * self.connect_timeout_units
    }

    /// `host:port` as used for the `Host` header and socket address
    pub fn authority(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    fn parse_var<T>(var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(var) {
            Ok(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| invalid(var, &e.to_string())),
            Err(env::VarError::NotPresent) => Ok(default),
            Err(e) => Err(ConfigError::EnvError(e)),
        }
    }

    fn parse_millis(var: &str, default: Duration) -> Result<Duration, ConfigError> {
        let millis = Self::parse_var(var, default.as_millis() as u64)?;
        Ok(Duration::from_millis(millis))
    }
}

fn invalid(var: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

/// Load configuration with helpful error messages for development
pub fn load_config() -> Result<DeviceConfig, ConfigError> {
    match DeviceConfig::load() {
        Ok(config) => {
            log::info!(
                "Loaded device configuration: server {}{}",
                config.authority(),
                config.upload_path
            );
            Ok(config)
        }
        Err(e) => {
            log::error!("Configuration error: {}", e);
            log::error!("Check the AGENDA_* variables in your environment or .env file");
            Err(e)
        }
    }
}
