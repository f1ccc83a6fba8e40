use garde::Validate;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    #[garde(length(min = 1))]
    pub bind_addr: String,

    /// PostgreSQL connection string
    #[garde(length(min = 1))]
    pub database_url: String,

    /// Redis connection string for the booking queue
    #[garde(length(min = 1))]
    pub redis_url: String,

    /// HS256 secret shared with the identity provider
    #[garde(length(min = 1))]
    pub jwt_secret: String,

    /// Maximum attempts per booking job before it is marked failed
    #[serde(default = "default_max_attempts")]
    #[garde(range(min = 1, max = 10))]
    pub worker_max_attempts: i32,

    /// Base delay for exponential retry backoff, in milliseconds
    #[serde(default = "default_backoff_ms")]
    #[garde(range(min = 10, max = 60_000))]
    pub worker_backoff_ms: u64,

    /// A claimed job with no progress for this long is considered stalled
    #[serde(default = "default_stall_timeout")]
    #[garde(range(max = 3_600))]
    pub stall_timeout_secs: u64,

    /// Terminal job rows older than this are garbage-collected
    #[serde(default = "default_job_retention")]
    #[garde(skip)]
    pub job_retention_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_attempts() -> i32 {
    3
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_stall_timeout() -> u64 {
    30
}

fn default_job_retention() -> u64 {
    3600
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment error: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            bind_addr: default_bind_addr(),
            database_url: "postgres://localhost/gatepass".to_string(),
            redis_url: "redis://localhost".to_string(),
            jwt_secret: "secret".to_string(),
            worker_max_attempts: default_max_attempts(),
            worker_backoff_ms: default_backoff_ms(),
            stall_timeout_secs: default_stall_timeout(),
            job_retention_secs: default_job_retention(),
        }
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let mut config = base_config();
        config.worker_max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
