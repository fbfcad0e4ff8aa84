// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! reqwest-backed implementation of the [`Transport`] trait.
//!
//! The transport is deliberately thin: it executes exactly one POST and
//! reports whatever came back. HTTP status classification lives in the
//! request handler; only connectivity-level failures (connect, timeout,
//! TLS) surface as `Err` here.

use std::time::Duration;

use adlift_core::{AdliftError, Transport, WireRequest, WireResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

/// HTTP transport for backend communication.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport posting to `base_url` with the given per-request
    /// timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AdliftError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AdliftError::Network {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, request: WireRequest) -> Result<WireResponse, AdliftError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut req = self.client.post(&url).body(request.body);
        for (name, value) in &request.headers {
            req = req.header(name, value);
        }

        let response = req.send().await.map_err(|e| AdliftError::Network {
            message: format!("request to {url} failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| AdliftError::Network {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        debug!(status, path = %request.path, "wire exchange completed");
        Ok(WireResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> WireRequest {
        WireRequest {
            path: "/session".to_string(),
            body: r#"{"app_token":"abc123"}"#.to_string(),
            headers: vec![("x-test".to_string(), "1".to_string())],
        }
    }

    #[tokio::test]
    async fn posts_body_and_headers_to_suffixed_path() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/session"))
            .and(header("content-type", "application/json"))
            .and(header("x-test", "1"))
            .and(body_string(r#"{"app_token":"abc123"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message":"ok"}"#))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), Duration::from_secs(5)).unwrap();
        let response = transport.exchange(request()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"message":"ok"}"#);
    }

    #[tokio::test]
    async fn non_2xx_statuses_are_returned_not_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), Duration::from_secs(5)).unwrap();
        let response = transport.exchange(request()).await.unwrap();
        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn connection_failure_is_a_network_error() {
        // Port 1 is essentially never listening.
        let transport =
            HttpTransport::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let result = transport.exchange(request()).await;
        assert!(matches!(result, Err(AdliftError::Network { .. })));
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_normalized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport =
            HttpTransport::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
        let response = transport.exchange(request()).await.unwrap();
        assert_eq!(response.status, 200);
    }
}
