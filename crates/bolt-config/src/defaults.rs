//! Default values applied when a variable is unset.

pub(crate) const BIND_ADDR: &str = "0.0.0.0";
pub(crate) const HTTP_PORT: u16 = 5000;
pub(crate) const DOWNLOAD_DIR: &str = "downloads";
pub(crate) const FETCH_CHUNK_BYTES: usize = 1024 * 1024;
pub(crate) const RELAY_CHUNK_BYTES: usize = 2 * 1024 * 1024;
pub(crate) const PROGRESS_INTERVAL_MS: u64 = 500;
pub(crate) const STATS_INTERVAL_SECS: u64 = 2;
pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 10;
pub(crate) const READ_TIMEOUT_SECS: u64 = 20;
pub(crate) const PROBE_TIMEOUT_SECS: u64 = 10;
pub(crate) const LOG_LEVEL: &str = "info";
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
