use std::env;
use std::net::IpAddr;
use std::str::FromStr;

use crate::config::ConfigError;

pub(crate) fn require_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
}

/// Integer setting with a default when the variable is unset.
pub(crate) fn parse_int_env<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional_trimmed_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

/// Like [`parse_int_env`], but zero is a configuration error.
pub(crate) fn parse_positive_u64_env(key: &str, default: u64) -> Result<u64, ConfigError> {
    match parse_int_env(key, default)? {
        0 => Err(ConfigError::InvalidConfiguration(format!("{key} must be > 0"))),
        value => Ok(value),
    }
}

pub(crate) fn parse_ip_list_env(key: &str) -> Result<Vec<IpAddr>, ConfigError> {
    match optional_trimmed_env(key) {
        Some(raw) => parse_ip_list(key, &raw),
        None => Ok(Vec::new()),
    }
}

pub(crate) fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_ip_list(key: &str, raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<IpAddr>().map_err(|_| {
                ConfigError::InvalidConfiguration(format!(
                    "{key} contains invalid IP address '{item}'"
                ))
            })
        })
        .collect()
}
