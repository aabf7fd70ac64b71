//! Environment-driven loading.

use std::path::PathBuf;
use std::time::Duration;

use crate::defaults;
use crate::error::ConfigResult;
use crate::model::{AppConfig, HttpConfig, LoggingSettings, StorageConfig, TransferConfig};
use crate::validate::{
    non_blank, parse_ip, parse_log_format, parse_millis, parse_port, parse_positive, parse_secs,
};

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] for the first variable that
    /// fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] for the first variable that
    /// fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_addr = parse_ip(
            "BOLT_BIND_ADDR",
            get("BOLT_BIND_ADDR").as_deref().unwrap_or(defaults::BIND_ADDR),
        )?;
        let port = match get("BOLT_HTTP_PORT") {
            Some(value) => parse_port("BOLT_HTTP_PORT", &value)?,
            None => get("PORT")
                .map(|value| parse_port("PORT", &value))
                .transpose()?
                .unwrap_or(defaults::HTTP_PORT),
        };

        let download_dir = get("BOLT_DOWNLOAD_DIR")
            .map_or_else(|| PathBuf::from(defaults::DOWNLOAD_DIR), PathBuf::from);
        let store_dir = get("BOLT_STORE_DIR").map(PathBuf::from);

        let transfer = TransferConfig {
            fetch_chunk_bytes: optional(&get, "BOLT_FETCH_CHUNK_BYTES", parse_positive)?
                .unwrap_or(defaults::FETCH_CHUNK_BYTES),
            relay_chunk_bytes: optional(&get, "BOLT_RELAY_CHUNK_BYTES", parse_positive)?
                .unwrap_or(defaults::RELAY_CHUNK_BYTES),
            progress_interval: optional(&get, "BOLT_PROGRESS_INTERVAL_MS", parse_millis)?
                .unwrap_or(Duration::from_millis(defaults::PROGRESS_INTERVAL_MS)),
            connect_timeout: optional(&get, "BOLT_CONNECT_TIMEOUT_SECS", parse_secs)?
                .unwrap_or(Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS)),
            read_timeout: optional(&get, "BOLT_READ_TIMEOUT_SECS", parse_secs)?
                .unwrap_or(Duration::from_secs(defaults::READ_TIMEOUT_SECS)),
            probe_timeout: optional(&get, "BOLT_PROBE_TIMEOUT_SECS", parse_secs)?
                .unwrap_or(Duration::from_secs(defaults::PROBE_TIMEOUT_SECS)),
            user_agent: optional(&get, "BOLT_USER_AGENT", non_blank)?
                .unwrap_or_else(|| defaults::USER_AGENT.to_string()),
        };

        let stats_interval = optional(&get, "BOLT_STATS_INTERVAL_SECS", parse_secs)?
            .unwrap_or(Duration::from_secs(defaults::STATS_INTERVAL_SECS));

        let logging = LoggingSettings {
            level: optional(&get, "BOLT_LOG_LEVEL", non_blank)?
                .unwrap_or_else(|| defaults::LOG_LEVEL.to_string()),
            format: optional(&get, "BOLT_LOG_FORMAT", parse_log_format)?,
        };

        Ok(Self {
            http: HttpConfig { bind_addr, port },
            storage: StorageConfig {
                download_dir,
                store_dir,
            },
            transfer,
            stats_interval,
            logging,
        })
    }
}

fn optional<T>(
    get: &impl Fn(&str) -> Option<String>,
    field: &'static str,
    parse: fn(&'static str, &str) -> ConfigResult<T>,
) -> ConfigResult<Option<T>> {
    get(field).map(|value| parse(field, &value)).transpose()
}
