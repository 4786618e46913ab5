//! reqwest-backed dispatcher.
//!
//! Each dispatch spawns one task that races the HTTP call against the
//! dispatcher's cancellation token. Transport failures (connect errors,
//! timeouts, body-read errors) and shutdown both surface as [`Reply::Stop`];
//! a received HTTP response is always delivered as [`Reply::Response`],
//! whatever its status code.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Dispatcher, HttpRequest, HttpResponse, Reply, Stop};

/// Timeouts applied when building the shared HTTP client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Default whole-request timeout; overridden per-request when the
    /// [`HttpRequest`] carries its own.
    pub request_timeout: Duration,
    /// Idle timeout for pooled connections.
    pub idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(310),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// The transport layer could not be constructed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Building the underlying HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared dispatcher over a pooled reqwest client.
pub struct HttpDispatcher {
    client: reqwest::Client,
    cancel: CancellationToken,
}

impl HttpDispatcher {
    /// Build a dispatcher with the given timeouts.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_idle_timeout(config.idle_timeout)
            .build()?;
        Ok(Self {
            client,
            cancel: CancellationToken::new(),
        })
    }
}

async fn perform(
    client: &reqwest::Client,
    request: &HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let mut builder = client.get(&request.url);
    if let Some(timeout) = request.timeout {
        builder = builder.timeout(timeout);
    }
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(HttpResponse { status, body })
}

impl Dispatcher for HttpDispatcher {
    fn dispatch(&self, request: HttpRequest, reply_to: oneshot::Sender<Reply>) {
        // Fast path: a shut-down dispatcher stops new work deterministically
        // instead of racing the cancellation token.
        if self.cancel.is_cancelled() {
            let _ = reply_to.send(Reply::Stop(Stop::new("dispatcher shut down")));
            return;
        }

        let client = self.client.clone();
        let cancel = self.cancel.clone();
        debug!(url = %request.url, "dispatching request");

        let _ = tokio::spawn(async move {
            let reply = tokio::select! {
                () = cancel.cancelled() => {
                    Reply::Stop(Stop::new("dispatcher shut down"))
                }
                result = perform(&client, &request) => match result {
                    Ok(response) => Reply::Response(response),
                    Err(e) => {
                        warn!(url = %request.url, error = %e, "request failed");
                        Reply::Stop(Stop::new(format!("request failed: {e}")))
                    }
                },
            };
            if reply_to.send(reply).is_err() {
                debug!(url = %request.url, "reply receiver dropped");
            }
        });
    }

    fn shutdown(&self) {
        info!("shutting down dispatcher");
        self.cancel.cancel();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn dispatcher() -> HttpDispatcher {
        HttpDispatcher::new(&TransportConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn delivers_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time/0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[15000000000000000]"))
            .mount(&server)
            .await;

        let (tx, rx) = oneshot::channel();
        dispatcher().dispatch(HttpRequest::get(format!("{}/time/0", server.uri())), tx);

        let reply = rx.await.unwrap();
        assert_matches!(reply, Reply::Response(response) => {
            assert_eq!(response.status, 200);
            assert_eq!(response.body, "[15000000000000000]");
        });
    }

    #[tokio::test]
    async fn non_success_status_is_still_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let (tx, rx) = oneshot::channel();
        dispatcher().dispatch(HttpRequest::get(format!("{}/x", server.uri())), tx);

        let reply = rx.await.unwrap();
        assert_matches!(reply, Reply::Response(response) => {
            assert_eq!(response.status, 403);
        });
    }

    #[tokio::test]
    async fn connect_failure_delivers_stop() {
        // Nothing listens on this port.
        let (tx, rx) = oneshot::channel();
        dispatcher().dispatch(
            HttpRequest::get("http://127.0.0.1:9/x").with_timeout(Duration::from_millis(500)),
            tx,
        );

        let reply = rx.await.unwrap();
        assert_matches!(reply, Reply::Stop(stop) => {
            assert!(stop.reason.contains("request failed"));
        });
    }

    #[tokio::test]
    async fn shutdown_stops_new_dispatches() {
        let dispatcher = dispatcher();
        dispatcher.shutdown();

        let (tx, rx) = oneshot::channel();
        dispatcher.dispatch(HttpRequest::get("http://127.0.0.1:9/x"), tx);

        let reply = rx.await.unwrap();
        assert_matches!(reply, Reply::Stop(stop) => {
            assert_eq!(stop.reason, "dispatcher shut down");
        });
    }

    #[tokio::test]
    async fn shutdown_aborts_in_flight_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let (tx, rx) = oneshot::channel();
        dispatcher.dispatch(HttpRequest::get(format!("{}/slow", server.uri())), tx);

        dispatcher.shutdown();

        let reply = rx.await.unwrap();
        assert_matches!(reply, Reply::Stop(_));
    }

    #[tokio::test]
    async fn replies_are_isolated_per_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a-body"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("b-body"))
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        dispatcher.dispatch(HttpRequest::get(format!("{}/a", server.uri())), tx_a);
        dispatcher.dispatch(HttpRequest::get(format!("{}/b", server.uri())), tx_b);

        let reply_a = rx_a.await.unwrap();
        let reply_b = rx_b.await.unwrap();
        assert_matches!(reply_a, Reply::Response(response) => {
            assert_eq!(response.body, "a-body");
        });
        assert_matches!(reply_b, Reply::Response(response) => {
            assert_eq!(response.body, "b-body");
        });
    }

    #[tokio::test]
    async fn per_request_timeout_delivers_stop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let (tx, rx) = oneshot::channel();
        dispatcher().dispatch(
            HttpRequest::get(format!("{}/slow", server.uri()))
                .with_timeout(Duration::from_millis(100)),
            tx,
        );

        let reply = rx.await.unwrap();
        assert_matches!(reply, Reply::Stop(stop) => {
            assert!(stop.reason.contains("request failed"));
        });
    }
}
