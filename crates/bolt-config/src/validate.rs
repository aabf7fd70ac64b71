//! Parsing helpers for individual variables.

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::model::LogFormatName;

pub(crate) fn parse_ip(field: &'static str, value: &str) -> ConfigResult<IpAddr> {
    IpAddr::from_str(value.trim())
        .map_err(|_| ConfigError::invalid(field, "must be an IP address", value))
}

pub(crate) fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    match value.trim().parse::<u16>() {
        Ok(0) => Err(ConfigError::invalid(field, "must be between 1 and 65535", value)),
        Ok(port) => Ok(port),
        Err(_) => Err(ConfigError::invalid(field, "must be between 1 and 65535", value)),
    }
}

pub(crate) fn parse_positive<T>(field: &'static str, value: &str) -> ConfigResult<T>
where
    T: FromStr + PartialEq + Default,
{
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(field, "must be a positive integer", value))?;
    if parsed == T::default() {
        return Err(ConfigError::invalid(field, "must be a positive integer", value));
    }
    Ok(parsed)
}

pub(crate) fn parse_secs(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_positive::<u64>(field, value).map(Duration::from_secs)
}

pub(crate) fn parse_millis(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_positive::<u64>(field, value).map(Duration::from_millis)
}

pub(crate) fn parse_log_format(field: &'static str, value: &str) -> ConfigResult<LogFormatName> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormatName::Json),
        "pretty" => Ok(LogFormatName::Pretty),
        _ => Err(ConfigError::invalid(field, "must be 'json' or 'pretty'", value)),
    }
}

pub(crate) fn non_blank(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            reason: "must not be blank",
            value: None,
        });
    }
    Ok(trimmed.to_string())
}
