use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::config_env::{
    optional_trimmed_env, parse_int_env, parse_ip_list_env, parse_positive_u64_env, require_env,
};
use crate::timezone::normalize_time_zone;

pub const DEFAULT_BUSINESS_TIME_ZONE: &str = "Europe/Rome";
const DEFAULT_SESSION_TTL_SECONDS: u64 = 86_400;
const DEFAULT_CALENDAR_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub migrations_dir: PathBuf,
    pub session_ttl_seconds: u64,
    pub business_time_zone: String,
    pub calendar: Option<CalendarServiceConfig>,
    pub chat_rate_limit_per_minute: u32,
    pub trusted_proxy_ips: Vec<IpAddr>,
}

/// Connection settings for the external calendar service. Absent when
/// `CALENDAR_SERVICE_URL` is unset, in which case availability comes from the
/// local appointment store only.
#[derive(Debug, Clone)]
pub struct CalendarServiceConfig {
    pub base_url: String,
    pub signing_secret: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub tick_seconds: u64,
    pub database_url: String,
    pub database_max_connections: u32,
    pub session_ttl_seconds: u64,
    pub session_purge_batch_size: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let session_ttl_seconds =
            parse_positive_u64_env("BOOKING_SESSION_TTL_SECONDS", DEFAULT_SESSION_TTL_SECONDS)?;

        Ok(Self {
            bind_addr: env::var("API_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: parse_int_env("DATABASE_MAX_CONNECTIONS", 10)?,
            migrations_dir: env::var("MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../db/migrations")
                }),
            session_ttl_seconds,
            business_time_zone: business_time_zone_from_env()?,
            calendar: calendar_config_from_env()?,
            chat_rate_limit_per_minute: parse_int_env("CHAT_RATE_LIMIT_PER_MINUTE", 30)?,
            trusted_proxy_ips: parse_ip_list_env("TRUSTED_PROXY_IPS")?,
        })
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            tick_seconds: parse_positive_u64_env("WORKER_TICK_SECONDS", 60)?,
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: parse_int_env("DATABASE_MAX_CONNECTIONS", 5)?,
            session_ttl_seconds: parse_positive_u64_env(
                "BOOKING_SESSION_TTL_SECONDS",
                DEFAULT_SESSION_TTL_SECONDS,
            )?,
            session_purge_batch_size: parse_int_env("SESSION_PURGE_BATCH_SIZE", 500)?,
        })
    }
}

fn business_time_zone_from_env() -> Result<String, ConfigError> {
    let Some(raw) = optional_trimmed_env("BUSINESS_TIME_ZONE") else {
        return Ok(DEFAULT_BUSINESS_TIME_ZONE.to_string());
    };

    normalize_time_zone(&raw).ok_or_else(|| {
        ConfigError::InvalidConfiguration(format!(
            "BUSINESS_TIME_ZONE is not a valid IANA time zone: '{raw}'"
        ))
    })
}

fn calendar_config_from_env() -> Result<Option<CalendarServiceConfig>, ConfigError> {
    let Some(base_url) = optional_trimmed_env("CALENDAR_SERVICE_URL") else {
        return Ok(None);
    };

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::InvalidConfiguration(
            "CALENDAR_SERVICE_URL must start with http:// or https://".to_string(),
        ));
    }

    Ok(Some(CalendarServiceConfig {
        base_url,
        signing_secret: optional_trimmed_env("CALENDAR_SERVICE_SECRET"),
        timeout_ms: parse_int_env("CALENDAR_TIMEOUT_MS", DEFAULT_CALENDAR_TIMEOUT_MS)?,
    }))
}
