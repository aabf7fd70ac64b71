use std::sync::Arc;

use bolt_api::{ApiServer, ApiState};
use bolt_config::{AppConfig, LogFormatName};
use bolt_events::EventBus;
use bolt_telemetry::{GlobalContextGuard, HostMemorySampler, LogFormat, LoggingConfig, Metrics};
use bolt_transfer::{
    EngineSettings, FilesystemObjectStore, HttpContentSource, HttpSourceSettings, TransferService,
};
use bolt_transfer_core::ObjectStore;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::stats::StatsTask;

/// Dependencies required to bootstrap the Bolt application.
pub(crate) struct BootstrapDependencies {
    config: AppConfig,
    events: EventBus,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        Self::from_config(config)
    }

    pub(crate) fn from_config(config: AppConfig) -> AppResult<Self> {
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            events: EventBus::new(),
            telemetry,
        })
    }
}

/// Entry point for the Bolt application boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let format = log_format(&dependencies.config);
    let logging = LoggingConfig {
        level: &dependencies.config.logging.level,
        format,
        ..LoggingConfig::default()
    };
    bolt_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");
    info!("Bolt application bootstrap starting");

    let (server, dependencies) = build_server(dependencies).await?;
    let stats = StatsTask::new(
        Arc::new(HostMemorySampler::new()),
        dependencies.events.clone(),
        dependencies.telemetry.clone(),
        dependencies.config.stats_interval,
    )
    .spawn();

    let addr = dependencies.config.http.socket_addr();
    info!(addr = %addr, "Launching API listener");
    let serve_result = server.serve(addr, shutdown_signal()).await;

    stats.abort();
    serve_result.map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

/// Wire the transfer engine and API state from injected dependencies.
pub(crate) async fn build_server(
    dependencies: BootstrapDependencies,
) -> AppResult<(ApiServer, BootstrapDependencies)> {
    let config = &dependencies.config;
    let source = HttpContentSource::new(&HttpSourceSettings::from(&config.transfer))
        .map_err(|err| AppError::transfer("content_source.new", err))?;

    let store: Option<Arc<dyn ObjectStore>> = match &config.storage.store_dir {
        Some(dir) => {
            let store = FilesystemObjectStore::open(dir.clone())
                .await
                .map_err(|err| AppError::transfer("object_store.open", err))?;
            info!(root = %store.root().display(), "object store ready");
            let store: Arc<dyn ObjectStore> = Arc::new(store);
            Some(store)
        }
        None => {
            warn!("no object store configured; completed transfers stay local");
            None
        }
    };

    let service = Arc::new(TransferService::new(
        Arc::new(source),
        store.clone(),
        dependencies.events.clone(),
        dependencies.telemetry.clone(),
        EngineSettings::from_config(config),
    ));
    let artifacts = service.artifacts();
    artifacts
        .ensure_root()
        .await
        .map_err(|err| AppError::transfer("artifacts.ensure_root", err))?;

    let state = ApiState::new(
        service.clone(),
        service,
        Arc::new(artifacts),
        store,
        dependencies.events.clone(),
        dependencies.telemetry.clone(),
    );
    Ok((ApiServer::new(state), dependencies))
}

fn log_format(config: &AppConfig) -> LogFormat {
    match config.logging.format {
        Some(LogFormatName::Json) => LogFormat::Json,
        Some(LogFormatName::Pretty) => LogFormat::Pretty,
        None => LogFormat::infer(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
