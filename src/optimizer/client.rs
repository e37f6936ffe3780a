//! Sends one request to the optimizer and waits for its verdict.

use std::time::Duration;

use reqwest::{Client, header};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    config::Configuration,
    decision::Decision,
    optimizer::{
        CALLER,
        outcome::{Outcome, Rejection, classify_body},
        payload::RequestPayload,
    },
};

/// A client bound to one optimizer endpoint and timeout.
#[derive(Debug, Clone)]
pub struct OptimizerClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl OptimizerClient {
    /// Creates a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: &Configuration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", CALLER.name, CALLER.version))
            .build()?;

        Ok(Self {
            client,
            url: config.optimizer_url(),
            timeout: config.timeout,
        })
    }

    /// Asks the optimizer for a decision, logging how the exchange ended.
    ///
    /// Never fails: anything but a well-formed verdict resolves to running the full workflow.
    pub async fn decide(&self, payload: &RequestPayload, cancel: &CancellationToken) -> Decision {
        let outcome = self.request(payload, cancel).await;
        outcome.log();
        outcome.into_decision()
    }

    /// Sends the payload and races the exchange against the timeout and the cancellation token.
    ///
    /// Whichever finishes first wins. The in-flight request is dropped, and so aborted, when it loses.
    pub async fn request(&self, payload: &RequestPayload, cancel: &CancellationToken) -> Outcome {
        debug!("requesting decision from {}…", &self.url);

        tokio::select! {
            outcome = self.exchange(payload) => outcome,
            _ = tokio::time::sleep(self.timeout) => Outcome::TimedOut(self.timeout),
            _ = cancel.cancelled() => Outcome::Cancelled,
        }
    }

    async fn exchange(&self, payload: &RequestPayload) -> Outcome {
        let response = match self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                debug!("Error details: {err}");
                return match err {
                    _ if err.is_timeout() => Outcome::TimedOut(self.timeout),
                    _ => Outcome::Transport {
                        error: err.to_string(),
                    },
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.bytes().await {
                Ok(bytes) => {
                    let outcome = classify_body(&bytes);
                    if let Outcome::MalformedBody { error } = &outcome {
                        debug!("Error details: {error}");
                    }
                    outcome
                }
                Err(err) => {
                    debug!("Error details: {err}");
                    Outcome::Transport {
                        error: err.to_string(),
                    }
                }
            };
        }

        debug!("Request context: {:?}", payload.context);
        match response.text().await {
            Ok(body) => debug!("Error response body: {body}"),
            Err(err) => debug!("Failed to read error response body: {err}"),
        }

        Outcome::Rejected(Rejection::from(status))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{StatusCode, Url};
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt as _, AsyncWriteExt as _},
        net::TcpListener,
    };
    use tracing_test::traced_test;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;
    use crate::workflow::{InvocationContext, Repository, RunIds};

    fn config(endpoint: &str, timeout_secs: u64) -> Configuration {
        Configuration {
            token: "secret".to_owned(),
            endpoint: Url::parse(endpoint).unwrap(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn payload() -> RequestPayload {
        let context = InvocationContext {
            event_name: "pull_request".to_owned(),
            pull_request: Some(42),
            sha: "abc123".to_owned(),
            git_ref: "refs/pull/42/merge".to_owned(),
            head_ref: None,
            run: RunIds {
                workflow: "CI".to_owned(),
                job: "build".to_owned(),
                run: 1,
            },
            repository: Repository {
                owner: "acme".to_owned(),
                name: "widgets".to_owned(),
            },
        };
        RequestPayload::new("secret", &context)
    }

    async fn respond_with(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/ci/optimizer"))
            .and(header("content-type", "application/json"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    async fn outcome_for(server: &MockServer, timeout_secs: u64) -> Outcome {
        OptimizerClient::new(&config(&server.uri(), timeout_secs))
            .unwrap()
            .request(&payload(), &CancellationToken::new())
            .await
    }

    /// Serves one response that announces more body than it sends, then hangs up.
    async fn truncated(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0; 4096];
            while !request.ends_with(b"}") {
                let read = stream.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }

            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: 1000\r\n\
                 connection: close\r\n\r\n{{\"skip\": tr"
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn follows_the_verdict() {
        let server = respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "skip": true, "reason": "stack unchanged" })),
        )
        .await;

        let decision = OptimizerClient::new(&config(&server.uri(), 5))
            .unwrap()
            .decide(&payload(), &CancellationToken::new())
            .await;
        assert_eq!(decision, Decision::skip("stack unchanged"));
    }

    #[tokio::test]
    async fn sends_the_payload_as_json() {
        let server = respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "skip": false, "reason": "changed" })),
        )
        .await;
        outcome_for(&server, 5).await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(body, serde_json::to_value(payload()).unwrap());
    }

    #[tokio::test]
    async fn classifies_rejections() {
        let cases: [(u16, Rejection); 6] = [
            (400, Rejection::BadRequest),
            (401, Rejection::Unauthorized),
            (402, Rejection::PlanRestricted),
            (429, Rejection::RateLimited),
            (
                500,
                Rejection::Unexpected(StatusCode::INTERNAL_SERVER_ERROR),
            ),
            (
                404,
                Rejection::Unexpected(StatusCode::NOT_FOUND),
            ),
        ];

        for (status, rejection) in cases {
            let server = respond_with(ResponseTemplate::new(status).set_body_string("nope")).await;
            assert_eq!(
                outcome_for(&server, 5).await,
                Outcome::Rejected(rejection),
                "status {status}"
            );
        }
    }

    #[tokio::test]
    async fn malformed_success_body_does_not_skip() {
        let server = respond_with(ResponseTemplate::new(200).set_body_string("<html>")).await;
        let outcome = outcome_for(&server, 5).await;
        assert!(matches!(outcome, Outcome::MalformedBody { .. }));
        assert!(!outcome.into_decision().skip);
    }

    #[tokio::test]
    async fn truncated_error_body_keeps_the_status() {
        let endpoint = truncated("HTTP/1.1 500 Internal Server Error").await;
        let outcome = OptimizerClient::new(&config(&endpoint, 5))
            .unwrap()
            .request(&payload(), &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            Outcome::Rejected(Rejection::Unexpected(StatusCode::INTERNAL_SERVER_ERROR))
        );
    }

    #[tokio::test]
    async fn truncated_success_body_does_not_skip() {
        let endpoint = truncated("HTTP/1.1 200 OK").await;
        let outcome = OptimizerClient::new(&config(&endpoint, 5))
            .unwrap()
            .request(&payload(), &CancellationToken::new())
            .await;

        assert!(matches!(outcome, Outcome::Transport { .. }), "{outcome:?}");
        assert!(!outcome.into_decision().skip);
    }

    #[tokio::test]
    #[traced_test]
    async fn times_out_and_warns() {
        let server = respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "skip": true, "reason": "too late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let decision = OptimizerClient::new(&config(&server.uri(), 1))
            .unwrap()
            .decide(&payload(), &CancellationToken::new())
            .await;

        assert!(!decision.skip);
        assert!(logs_contain("Request timed out after 1 seconds"));
    }

    #[tokio::test]
    async fn cancellation_wins_the_race() {
        let server = respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "skip": true, "reason": "too late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = OptimizerClient::new(&config(&server.uri(), 10))
            .unwrap()
            .request(&payload(), &cancel)
            .await;
        assert_eq!(outcome, Outcome::Cancelled);
    }

    #[tokio::test]
    #[traced_test]
    async fn unreachable_endpoint_is_a_transport_failure() {
        // Nothing listens on the discard port.
        let decision = OptimizerClient::new(&config("http://127.0.0.1:9", 5))
            .unwrap()
            .decide(&payload(), &CancellationToken::new())
            .await;

        assert!(!decision.skip);
        assert!(logs_contain("Failed to make request to the optimizer service."));
    }
}
