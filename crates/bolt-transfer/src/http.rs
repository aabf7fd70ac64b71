//! reqwest-backed content source.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, HeaderMap, RANGE};
use reqwest::{Client, Response};
use tracing::debug;

use bolt_transfer_core::{
    ContentSource, ProbeResponse, SourceResponse, TransferError, TransferResult,
};

use crate::settings::HttpSourceSettings;

/// Content source that speaks HTTP(S) with mandatory timeouts.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    probe_timeout: Duration,
}

impl HttpContentSource {
    /// Build a client with connect and read timeouts applied to every request.
    ///
    /// # Errors
    ///
    /// Returns an error when the TLS backend cannot be initialised.
    pub fn new(settings: &HttpSourceSettings) -> TransferResult<Self> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|source| TransferError::network("http.client_build", "", source))?;
        Ok(Self {
            client,
            probe_timeout: settings.probe_timeout,
        })
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn probe(&self, url: &str) -> TransferResult<ProbeResponse> {
        let response = self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|source| TransferError::Probe {
                url: url.to_string(),
                source: Box::new(source),
            })?;
        if !response.status().is_success() {
            return Err(TransferError::Probe {
                url: url.to_string(),
                source: Box::new(TransferError::HttpStatus {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                }),
            });
        }
        let headers = response.headers();
        Ok(ProbeResponse {
            content_disposition: header_string(headers, CONTENT_DISPOSITION.as_str()),
            content_length: header_u64(headers, CONTENT_LENGTH.as_str()),
        })
    }

    async fn fetch(&self, url: &str, offset: u64) -> TransferResult<SourceResponse> {
        let mut request = self.client.get(url);
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }
        let response = request
            .send()
            .await
            .map_err(|source| TransferError::network("fetch.send", url, source))?;
        debug!(
            url = %url,
            offset,
            status = response.status().as_u16(),
            "content source responded"
        );
        Ok(into_source_response(response, url))
    }
}

fn into_source_response(response: Response, url: &str) -> SourceResponse {
    let headers = response.headers();
    let status = response.status().as_u16();
    let content_length = header_u64(headers, CONTENT_LENGTH.as_str());
    let content_range = header_string(headers, CONTENT_RANGE.as_str());
    let url = url.to_string();
    let body = response
        .bytes_stream()
        .map(move |chunk| chunk.map_err(|source| TransferError::network("fetch.read", &url, source)));
    SourceResponse {
        status,
        content_length,
        content_range,
        body: Box::pin(body),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_string(headers, name).and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;

    fn source() -> HttpContentSource {
        HttpContentSource::new(&HttpSourceSettings {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(2),
            user_agent: "bolt-test".into(),
        })
        .expect("client")
    }

    #[tokio::test]
    async fn probe_reads_disposition_and_length() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(HEAD).path("/file");
                then.status(200)
                    .header("content-disposition", "attachment; filename=\"clip.mp4\"")
                    .header("content-length", "1000");
            })
            .await;

        let probe = source().probe(&server.url("/file")).await.expect("probe");
        mock.assert_async().await;
        assert_eq!(
            probe.content_disposition.as_deref(),
            Some("attachment; filename=\"clip.mp4\"")
        );
        assert_eq!(probe.content_length, Some(1_000));
    }

    #[tokio::test]
    async fn probe_failure_status_is_a_probe_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(HEAD).path("/gone");
                then.status(404);
            })
            .await;
        let err = source()
            .probe(&server.url("/gone"))
            .await
            .expect_err("404 should fail");
        assert!(matches!(err, TransferError::Probe { .. }));
    }

    #[tokio::test]
    async fn fetch_sends_range_only_when_resuming() {
        let server = MockServer::start_async().await;
        let ranged = server
            .mock_async(|when, then| {
                when.method(GET).path("/y.bin").header("range", "bytes=400-");
                then.status(206)
                    .header("content-range", "bytes 400-999/1000")
                    .body(vec![1_u8; 600]);
            })
            .await;

        let response = source()
            .fetch(&server.url("/y.bin"), 400)
            .await
            .expect("fetch");
        ranged.assert_async().await;
        assert!(response.is_partial());
        assert_eq!(response.total_size(400), 1_000);
        assert_eq!(response.content_length, Some(600));
    }
}
