//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE, header::RANGE},
    routing::{delete, get, post},
};
use bolt_telemetry::{REQUEST_ID_HEADER, build_sha, request_id_layer};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_LAST_EVENT_ID;
use crate::http::health::{health, metrics};
use crate::http::history::{delete_history, list_history};
use crate::http::sse::stream_events;
use crate::http::stream::{stream_local, stream_remote};
use crate::http::telemetry::HttpMetricsLayer;
use crate::http::tools::{convert_link, detect_filename};
use crate::http::transfers::{
    cancel_transfer, list_transfers, pause_transfer, resume_transfer, start_transfer,
};
use crate::state::ApiState;

/// Axum router wrapper that hosts the Bolt API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router with request tracing, request ids, CORS, and metrics.
    #[must_use]
    pub fn new(state: ApiState) -> Self {
        let telemetry = state.telemetry.clone();
        let state = Arc::new(state);
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                CONTENT_TYPE,
                RANGE,
                HeaderName::from_static(HEADER_LAST_EVENT_ID),
            ]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::routes()
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);
        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/stream/{name}", get(stream_local))
            .route(
                "/v1/downloads",
                post(start_transfer).get(list_transfers),
            )
            .route("/v1/downloads/{id}/pause", post(pause_transfer))
            .route("/v1/downloads/{id}/resume", post(resume_transfer))
            .route("/v1/downloads/{id}/cancel", post(cancel_transfer))
            .route("/v1/events", get(stream_events))
            .route("/v1/history", get(list_history))
            .route("/v1/history/{name}", delete(delete_history))
            .route("/v1/filename/detect", post(detect_filename))
            .route("/v1/links/convert", post(convert_link))
            .route("/v1/remote/{id}/stream", get(stream_remote))
    }

    /// Serve the API on `addr` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Starting API on {}", addr);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}
