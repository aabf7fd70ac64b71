//! Request accounting middleware.
//!
//! Every routed request is counted by matched route and status. Artifact
//! stream routes additionally record which store served them and how the
//! `Range` header was resolved.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::extract::MatchedPath;
use axum::http::Request;
use bolt_telemetry::Metrics;
use tower::{Layer, Service};

const LOCAL_STREAM_ROUTE: &str = "/stream/{name}";
const REMOTE_STREAM_ROUTE: &str = "/v1/remote/{id}/stream";

/// Where a streamed artifact was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamOrigin {
    Staging,
    ObjectStore,
}

impl StreamOrigin {
    /// Classify a matched route template.
    pub(crate) fn of_route(route: &str) -> Option<Self> {
        match route {
            LOCAL_STREAM_ROUTE => Some(Self::Staging),
            REMOTE_STREAM_ROUTE => Some(Self::ObjectStore),
            _ => None,
        }
    }

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Staging => "local",
            Self::ObjectStore => "remote",
        }
    }
}

/// Counts routed requests and artifact stream outcomes.
#[derive(Clone)]
pub(crate) struct HttpMetricsLayer {
    telemetry: Metrics,
}

impl HttpMetricsLayer {
    pub(crate) const fn new(telemetry: Metrics) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsService {
            inner,
            telemetry: self.telemetry.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct HttpMetricsService<S> {
    inner: S,
    telemetry: Metrics,
}

impl<S, B> Service<Request<B>> for HttpMetricsService<S>
where
    S: Service<Request<B>, Response = axum::response::Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let route = req.extensions().get::<MatchedPath>().map_or_else(
            || req.uri().path().to_string(),
            |matched| matched.as_str().to_string(),
        );
        let origin = StreamOrigin::of_route(&route);
        let telemetry = self.telemetry.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let status = response.status().as_u16();
            telemetry.inc_http_request(&route, status);
            if let Some(origin) = origin {
                telemetry.inc_stream_response(origin.label(), status);
            }
            Ok(response)
        })
    }
}
