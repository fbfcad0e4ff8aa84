// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handler: one package, one attempt, one classified outcome.
//!
//! Serializes an [`ActivityPackage`] into a wire request (body from its
//! parameter map plus a `sent_at` stamp added at send time, integrity
//! header over the body), executes it via the injected [`Transport`], and
//! translates the raw result into a [`ResponseData`]:
//!
//! - transport success + 2xx + JSON body without a top-level `error` key
//!   -> success
//! - transport success + 2xx + malformed/non-JSON body -> terminal failure
//! - transport success + 4xx -> terminal failure (the server rejected it)
//! - transport success + 5xx, or transport-level failure -> retryable
//!
//! The handler always produces exactly one `ResponseData` per attempt; it
//! never errors out of a send.

use std::sync::Arc;

use adlift_core::{
    ActivityPackage, Attribution, ResponseData, Transport, WireRequest, WireResponse,
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Header carrying the request body's integrity digest.
pub const SIGNATURE_HEADER: &str = "x-adlift-signature";

/// Header carrying the client SDK version string.
pub const CLIENT_SDK_HEADER: &str = "x-adlift-client-sdk";

/// Stateless sender translating packages into classified outcomes.
#[derive(Clone)]
pub struct RequestHandler {
    transport: Arc<dyn Transport>,
    app_token: String,
}

impl RequestHandler {
    pub fn new(transport: Arc<dyn Transport>, app_token: impl Into<String>) -> Self {
        Self {
            transport,
            app_token: app_token.into(),
        }
    }

    /// Perform one delivery attempt for `package`.
    pub async fn send_package(&self, package: &ActivityPackage) -> ResponseData {
        let request = self.encode(package, chrono::Utc::now().timestamp());

        match self.transport.exchange(request).await {
            Ok(response) => classify(package, response),
            Err(e) => {
                warn!(package = %package.log_label(), error = %e, "transport failure, will retry");
                let mut data = ResponseData::for_package(package);
                data.success = false;
                data.will_retry = true;
                data.message = Some(e.to_string());
                data
            }
        }
    }

    /// Build the wire request for `package`, stamping `sent_at` now.
    fn encode(&self, package: &ActivityPackage, sent_at: i64) -> WireRequest {
        let mut body = serde_json::Map::new();
        for (key, value) in &package.parameters {
            body.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        body.insert(
            "sent_at".to_string(),
            serde_json::Value::String(sent_at.to_string()),
        );
        let body = serde_json::Value::Object(body).to_string();

        let mut hasher = Sha256::new();
        hasher.update(self.app_token.as_bytes());
        hasher.update(body.as_bytes());
        let signature = hex::encode(hasher.finalize());

        WireRequest {
            path: package.path.clone(),
            body,
            headers: vec![
                (SIGNATURE_HEADER.to_string(), signature),
                (CLIENT_SDK_HEADER.to_string(), package.client_sdk.clone()),
            ],
        }
    }
}

/// Translate an HTTP response into a delivery outcome.
fn classify(package: &ActivityPackage, response: WireResponse) -> ResponseData {
    let mut data = ResponseData::for_package(package);

    if (200..300).contains(&response.status) {
        match serde_json::from_str::<serde_json::Value>(&response.body) {
            Ok(json) if json.is_object() => {
                if let Some(error) = json.get("error") {
                    // Explicit server drop signal: do not retry.
                    data.success = false;
                    data.will_retry = false;
                    data.message = Some(
                        error
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| error.to_string()),
                    );
                    warn!(package = %package.log_label(), message = ?data.message,
                        "server rejected package, dropping");
                } else {
                    data.success = true;
                    data.will_retry = false;
                    data.message = json
                        .get("message")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    data.timestamp = json
                        .get("timestamp")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    data.adid = json.get("adid").and_then(|v| v.as_str()).map(str::to_string);
                    data.ask_in_secs = json.get("ask_in").and_then(|v| v.as_u64());
                    data.attribution = Attribution::from_json(&json);
                    debug!(package = %package.log_label(), "package accepted");
                }
                data.json_response = Some(json);
            }
            _ => {
                // 2xx with a body the backend contract says cannot happen:
                // retrying would produce the same undecodable answer.
                data.success = false;
                data.will_retry = false;
                data.message = Some("malformed response body".to_string());
                warn!(package = %package.log_label(), status = response.status,
                    "malformed response body, dropping package");
            }
        }
    } else if (400..500).contains(&response.status) {
        data.success = false;
        data.will_retry = false;
        data.message = Some(format!("server rejected request ({})", response.status));
        data.json_response = serde_json::from_str(&response.body).ok();
        warn!(package = %package.log_label(), status = response.status,
            "request rejected, dropping package");
    } else {
        data.success = false;
        data.will_retry = true;
        data.message = Some(format!("server unavailable ({})", response.status));
        warn!(package = %package.log_label(), status = response.status,
            "server error, will retry");
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use adlift_core::{ActivityKind, AdliftError};
    use async_trait::async_trait;

    fn package() -> ActivityPackage {
        let mut parameters = BTreeMap::new();
        parameters.insert("app_token".to_string(), "abc123".to_string());
        parameters.insert("created_at".to_string(), "1700000000".to_string());
        ActivityPackage {
            activity_kind: ActivityKind::Session,
            path: "/session".to_string(),
            client_sdk: "adlift0.1.0".to_string(),
            parameters,
            retries: 0,
            suffix: String::new(),
            callback_params: BTreeMap::new(),
            partner_params: BTreeMap::new(),
        }
    }

    /// Transport returning one fixed outcome and recording requests.
    struct FixedTransport {
        outcome: Result<WireResponse, ()>,
        requests: Mutex<Vec<WireRequest>>,
    }

    impl FixedTransport {
        fn ok(status: u16, body: &str) -> Self {
            Self {
                outcome: Ok(WireResponse {
                    status,
                    body: body.to_string(),
                }),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                outcome: Err(()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn exchange(&self, request: WireRequest) -> Result<WireResponse, AdliftError> {
            self.requests.lock().unwrap().push(request);
            self.outcome.clone().map_err(|_| AdliftError::Network {
                message: "connection refused".to_string(),
                source: None,
            })
        }
    }

    #[tokio::test]
    async fn ok_json_response_is_success() {
        let transport = Arc::new(FixedTransport::ok(
            200,
            r#"{"message":"ok","adid":"a-1","timestamp":"2026-01-01T00:00:00Z"}"#,
        ));
        let handler = RequestHandler::new(transport, "abc123");
        let data = handler.send_package(&package()).await;
        assert!(data.success);
        assert!(!data.will_retry);
        assert_eq!(data.adid.as_deref(), Some("a-1"));
        assert_eq!(data.message.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn malformed_body_is_terminal() {
        let transport = Arc::new(FixedTransport::ok(200, "<html>gateway</html>"));
        let handler = RequestHandler::new(transport, "abc123");
        let data = handler.send_package(&package()).await;
        assert!(!data.success);
        assert!(!data.will_retry);
    }

    #[tokio::test]
    async fn error_key_in_2xx_is_terminal() {
        let transport = Arc::new(FixedTransport::ok(200, r#"{"error":"unknown app token"}"#));
        let handler = RequestHandler::new(transport, "abc123");
        let data = handler.send_package(&package()).await;
        assert!(!data.success);
        assert!(!data.will_retry);
        assert_eq!(data.message.as_deref(), Some("unknown app token"));
    }

    #[tokio::test]
    async fn http_404_is_terminal() {
        let transport = Arc::new(FixedTransport::ok(404, ""));
        let handler = RequestHandler::new(transport, "abc123");
        let data = handler.send_package(&package()).await;
        assert!(!data.success);
        assert!(!data.will_retry);
    }

    #[tokio::test]
    async fn http_503_is_retryable() {
        let transport = Arc::new(FixedTransport::ok(503, ""));
        let handler = RequestHandler::new(transport, "abc123");
        let data = handler.send_package(&package()).await;
        assert!(!data.success);
        assert!(data.will_retry);
    }

    #[tokio::test]
    async fn transport_failure_is_retryable() {
        let transport = Arc::new(FixedTransport::failing());
        let handler = RequestHandler::new(transport, "abc123");
        let data = handler.send_package(&package()).await;
        assert!(!data.success);
        assert!(data.will_retry);
    }

    #[tokio::test]
    async fn attribution_and_ask_in_are_extracted() {
        let body = r#"{"ask_in":120,"attribution":{"network":"Organic"}}"#;
        let transport = Arc::new(FixedTransport::ok(200, body));
        let handler = RequestHandler::new(transport, "abc123");
        let data = handler.send_package(&package()).await;
        assert!(data.success);
        assert_eq!(data.ask_in_secs, Some(120));
        assert_eq!(
            data.attribution.unwrap().network.as_deref(),
            Some("Organic")
        );
    }

    #[tokio::test]
    async fn request_carries_signature_and_sent_at() {
        let transport = Arc::new(FixedTransport::ok(200, "{}"));
        let handler = RequestHandler::new(Arc::clone(&transport) as Arc<dyn Transport>, "abc123");
        let _ = handler.send_package(&package()).await;

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.path, "/session");

        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["app_token"], "abc123");
        assert!(body.get("sent_at").is_some(), "sent_at must be stamped at send time");

        let signature = requests[0]
            .headers
            .iter()
            .find(|(name, _)| name == SIGNATURE_HEADER)
            .map(|(_, value)| value.clone())
            .expect("signature header present");
        let mut hasher = Sha256::new();
        hasher.update(b"abc123");
        hasher.update(request.body.as_bytes());
        assert_eq!(signature, hex::encode(hasher.finalize()));
    }
}
