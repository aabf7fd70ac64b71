//! Engine tuning derived from application configuration.

use std::path::PathBuf;
use std::time::Duration;

use bolt_config::{AppConfig, TransferConfig};
use bolt_transfer_core::DEFAULT_PROGRESS_INTERVAL;

/// Chunking and throttling knobs shared by the fetch and relay stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Staging directory for local artifacts.
    pub download_dir: PathBuf,
    /// Write buffer size for the fetch stage.
    pub fetch_chunk_bytes: usize,
    /// Upload chunk size for the relay stage.
    pub relay_chunk_bytes: usize,
    /// Minimum spacing between progress snapshots.
    pub progress_interval: Duration,
}

impl EngineSettings {
    /// Build engine settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            download_dir: config.storage.download_dir.clone(),
            fetch_chunk_bytes: config.transfer.fetch_chunk_bytes,
            relay_chunk_bytes: config.transfer.relay_chunk_bytes,
            progress_interval: config.transfer.progress_interval,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            fetch_chunk_bytes: 1024 * 1024,
            relay_chunk_bytes: 2 * 1024 * 1024,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSourceSettings {
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Per-read timeout.
    pub read_timeout: Duration,
    /// Overall timeout for header-only probes.
    pub probe_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl From<&TransferConfig> for HttpSourceSettings {
    fn from(config: &TransferConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            probe_timeout: config.probe_timeout,
            user_agent: config.user_agent.clone(),
        }
    }
}
