//! Single-flight classification dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sortcam_types::{CaptureArtifact, ClassificationFailure, ClassificationResult, NonEmptyString};
use thiserror::Error;

use crate::read_capped_error_body;
use crate::target::{BackendTarget, ClassifierEndpoints};
use crate::wire::{self, ClassifyRequest};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Another request is outstanding; nothing was sent.
    #[error("classification already in progress")]
    Busy,
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error {status}: {error}")]
    Api {
        status: u16,
        error: String,
        details: Option<String>,
    },
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),
}

impl DispatchError {
    /// User-visible form. API errors keep the backend's `error` and
    /// `details` unchanged.
    #[must_use]
    pub fn to_failure(&self) -> ClassificationFailure {
        let (message, details) = match self {
            DispatchError::Api { error, details, .. } => (error.clone(), details.clone()),
            DispatchError::Network(e) => ("Network request failed".to_string(), Some(e.to_string())),
            DispatchError::MalformedResponse(reason) => (
                "Malformed classifier response".to_string(),
                Some(reason.clone()),
            ),
            DispatchError::Busy => ("Classification already in progress".to_string(), None),
        };
        let message = NonEmptyString::new(message)
            .unwrap_or_else(|_| NonEmptyString::from(FALLBACK_FAILURE_MESSAGE));
        ClassificationFailure::new(message, details)
    }
}

const FALLBACK_FAILURE_MESSAGE: sortcam_types::NonEmptyStaticStr =
    sortcam_types::NonEmptyStaticStr::new("Classification failed");

struct DispatcherInner {
    client: reqwest::Client,
    endpoints: ClassifierEndpoints,
    in_flight: AtomicBool,
}

/// Posts capture artifacts to the classifier, at most one at a time.
///
/// Cheap to clone; clones share the in-flight flag.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoints", &self.inner.endpoints)
            .field("in_flight", &self.is_in_flight())
            .finish_non_exhaustive()
    }
}

/// Holds the single-flight slot; releases it on drop on every exit path.
#[must_use = "the in-flight slot is released when the guard is dropped"]
pub struct InFlightGuard {
    inner: Arc<DispatcherInner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(client: reqwest::Client, endpoints: ClassifierEndpoints) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                client,
                endpoints,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> &ClassifierEndpoints {
        &self.inner.endpoints
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Claim the single-flight slot, or `None` if a request is outstanding.
    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                inner: Arc::clone(&self.inner),
            })
    }

    /// Classify one artifact against `target`.
    ///
    /// Returns [`DispatchError::Busy`] without touching the network when a
    /// request is already outstanding. There is no retry.
    pub async fn dispatch(
        &self,
        artifact: CaptureArtifact,
        target: &BackendTarget,
    ) -> Result<ClassificationResult, DispatchError> {
        let Some(guard) = self.try_acquire() else {
            tracing::debug!("Dispatch rejected, request already in flight");
            return Err(DispatchError::Busy);
        };
        let outcome = self.send(&artifact, target).await;
        drop(guard);
        outcome
    }

    async fn send(
        &self,
        artifact: &CaptureArtifact,
        target: &BackendTarget,
    ) -> Result<ClassificationResult, DispatchError> {
        let url = self.inner.endpoints.route_for(target);
        let api_url = match target {
            BackendTarget::Hosted => None,
            BackendTarget::Local(url) => Some(url.as_str()),
        };
        let body = ClassifyRequest::new(artifact.bytes(), api_url);

        tracing::info!(
            backend = target.label(),
            url = %url,
            bytes = artifact.bytes().len(),
            "Sending classification request"
        );

        let response = self
            .inner
            .client
            .post(url.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = read_capped_error_body(response).await;
            let parsed = wire::parse_error_body(status.as_u16(), &text);
            tracing::warn!(status = status.as_u16(), error = %parsed.error, "Classifier returned error");
            return Err(DispatchError::Api {
                status: status.as_u16(),
                error: parsed.error,
                details: parsed.details,
            });
        }

        let bytes = response.bytes().await?;
        let result = wire::parse_success_body(&bytes).map_err(DispatchError::MalformedResponse)?;
        tracing::debug!(parts = result.len(), "Classification response parsed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::parse_http_url;
    use serde_json::json;
    use sortcam_types::MaterialCode;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher(server: &MockServer) -> Dispatcher {
        let endpoints = ClassifierEndpoints::new(
            parse_http_url(&format!("{}/api/classify", server.uri())).unwrap(),
            parse_http_url(&format!("{}/api/classify/local", server.uri())).unwrap(),
        );
        Dispatcher::new(reqwest::Client::new(), endpoints)
    }

    fn artifact() -> CaptureArtifact {
        CaptureArtifact::new(b"jpeg".to_vec(), 640, 480)
    }

    #[tokio::test]
    async fn hosted_success_returns_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/classify"))
            .and(body_json(json!({ "imageBase64": "anBlZw==" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "material": [{ "part_name": "bottle", "answer": "E: Plastic" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = dispatcher(&server)
            .dispatch(artifact(), &BackendTarget::Hosted)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.entries()[0].part_name, "bottle");
        assert_eq!(result.entries()[0].code, MaterialCode::Plastic);
    }

    #[tokio::test]
    async fn local_target_posts_api_url_to_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/classify/local"))
            .and(body_json(json!({
                "imageBase64": "anBlZw==",
                "apiUrl": "http://10.0.0.5:8000/infer"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "material": [{ "part_name": "none", "answer": "G" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let target = BackendTarget::local("http://10.0.0.5:8000/infer").unwrap();
        let result = dispatcher(&server).dispatch(artifact(), &target).await.unwrap();
        assert!(result.is_empty_scene());
    }

    #[tokio::test]
    async fn server_error_surfaces_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/classify"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "timeout" })))
            .expect(1)
            .mount(&server)
            .await;

        let err = dispatcher(&server)
            .dispatch(artifact(), &BackendTarget::Hosted)
            .await
            .unwrap_err();
        match &err {
            DispatchError::Api { status, error, details } => {
                assert_eq!(*status, 500);
                assert_eq!(error, "timeout");
                assert_eq!(details, &None);
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        let failure = err.to_failure();
        assert_eq!(failure.message(), "timeout");
        assert_eq!(failure.details(), None);
    }

    #[tokio::test]
    async fn relay_error_keeps_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/classify/local"))
            .respond_with(ResponseTemplate::new(502).set_body_json(json!({
                "error": "Local API request failed",
                "status": 502,
                "details": "connection refused"
            })))
            .mount(&server)
            .await;

        let target = BackendTarget::local("http://10.0.0.5:8000/infer").unwrap();
        let failure = dispatcher(&server)
            .dispatch(artifact(), &target)
            .await
            .unwrap_err()
            .to_failure();
        assert_eq!(failure.message(), "Local API request failed");
        assert_eq!(failure.details(), Some("connection refused"));
    }

    #[tokio::test]
    async fn malformed_success_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = dispatcher(&server)
            .dispatch(artifact(), &BackendTarget::Hosted)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedResponse(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let endpoints = ClassifierEndpoints::new(
            parse_http_url("http://127.0.0.1:1/api/classify").unwrap(),
            parse_http_url("http://127.0.0.1:1/api/classify/local").unwrap(),
        );
        let dispatcher = Dispatcher::new(reqwest::Client::new(), endpoints);
        let err = dispatcher
            .dispatch(artifact(), &BackendTarget::Hosted)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Network(_)), "{err:?}");
        assert!(!dispatcher.is_in_flight());
    }

    #[tokio::test]
    async fn second_dispatch_while_outstanding_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/classify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "material": [{ "part_name": "can", "answer": "C" }]
                    }))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server);
        let first = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(artifact(), &BackendTarget::Hosted).await })
        };
        while !dispatcher.is_in_flight() {
            tokio::task::yield_now().await;
        }

        let second = dispatcher
            .dispatch(artifact(), &BackendTarget::Hosted)
            .await;
        assert!(matches!(second, Err(DispatchError::Busy)));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.entries()[0].code, MaterialCode::Metal);
        assert!(!dispatcher.is_in_flight());
    }

    #[tokio::test]
    async fn slot_released_after_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
            .expect(2)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server);
        for _ in 0..2 {
            let err = dispatcher
                .dispatch(artifact(), &BackendTarget::Hosted)
                .await
                .unwrap_err();
            assert!(matches!(err, DispatchError::Api { .. }));
        }
    }

    #[tokio::test]
    async fn guard_is_exclusive_and_released_on_drop() {
        let dispatcher = Dispatcher::new(
            reqwest::Client::new(),
            ClassifierEndpoints::new(
                parse_http_url("http://localhost/a").unwrap(),
                parse_http_url("http://localhost/b").unwrap(),
            ),
        );
        let guard = dispatcher.try_acquire().unwrap();
        assert!(dispatcher.try_acquire().is_none());
        drop(guard);
        assert!(dispatcher.try_acquire().is_some());
    }
}
