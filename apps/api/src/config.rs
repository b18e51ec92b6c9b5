use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_SESSION_IDLE_SECS: u64 = 2 * 60 * 60;
const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub export_prefix: String,
    pub max_upload_bytes: usize,
    /// Sessions untouched for this long are dropped by the sweeper.
    pub session_idle_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // .env is optional

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            export_prefix: optional_env("EXPORT_PREFIX").unwrap_or_else(|| "exports".to_string()),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            session_idle_ttl: Duration::from_secs(parse_env(
                "SESSION_IDLE_TTL_SECS",
                DEFAULT_SESSION_IDLE_SECS,
            )?),
            session_sweep_interval: Duration::from_secs(parse_env(
                "SESSION_SWEEP_INTERVAL_SECS",
                DEFAULT_SESSION_SWEEP_SECS,
            )?),
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            anthropic_api_key: "test-key".to_string(),
            s3_bucket: "test-bucket".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            export_prefix: "exports".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_idle_ttl: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            session_sweep_interval: Duration::from_secs(DEFAULT_SESSION_SWEEP_SECS),
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u16 = parse_env("RESUME_WIZARD_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("RESUME_WIZARD_TEST_BAD_PORT", "eighty");
        let result: Result<u16> = parse_env("RESUME_WIZARD_TEST_BAD_PORT", 8080);
        assert!(result.is_err());
        std::env::remove_var("RESUME_WIZARD_TEST_BAD_PORT");
    }

    #[test]
    fn test_require_env_names_missing_key() {
        let err = require_env("RESUME_WIZARD_TEST_MISSING_KEY").unwrap_err();
        assert!(err.to_string().contains("RESUME_WIZARD_TEST_MISSING_KEY"));
    }
}
