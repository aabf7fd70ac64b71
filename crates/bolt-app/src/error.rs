//! # Design
//!
//! - Centralize application-level errors for bootstrap and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: bolt_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: bolt_telemetry::TelemetryError,
    },
    /// Transfer engine setup failed.
    #[error("transfer engine operation failed")]
    Transfer {
        /// Operation identifier.
        operation: &'static str,
        /// Source transfer error.
        source: bolt_transfer_core::TransferError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: bolt_api::ApiServerError,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: bolt_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: bolt_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn transfer(
        operation: &'static str,
        source: bolt_transfer_core::TransferError,
    ) -> Self {
        Self::Transfer { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: bolt_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}
