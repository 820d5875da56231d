//! HTTP client for the image classification service.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors talking to the classification service. Calls are not retried;
/// the orchestrator decides whether to try again.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Classificator request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classificator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// The service's judgment of one screenshot against one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// "OK" when the pictured product matches the query, "ERROR" otherwise.
    pub response: String,
    /// Free-text reasoning from the classifier.
    pub comment: String,
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        self.response == "OK"
    }
}

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    image_base64: &'a str,
    user_query: &'a str,
}

/// Client for the `/classificator` endpoint.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl VisionClient {
    /// `endpoint` is the full URL of the classification route, e.g.
    /// `http://127.0.0.1:8100/classificator`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Submit a base64-encoded screenshot and the user's query, returning
    /// the service's verdict. Non-2xx responses are explicit errors, never
    /// silent empty successes.
    pub async fn validate(
        &self,
        image_base64: &str,
        user_query: &str,
    ) -> Result<Verdict, VisionError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&AnalysisRequest {
                image_base64,
                user_query,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let verdict: Verdict = response.json().await?;
        debug!("Classificator verdict: {} ({})", verdict.response, verdict.comment);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_validate_returns_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classificator"))
            .and(body_partial_json(json!({"user_query": "red sweater"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "OK",
                "comment": "A red knit sweater is pictured",
            })))
            .mount(&server)
            .await;

        let client = VisionClient::new(format!("{}/classificator", server.uri()));
        let verdict = client.validate("aGVsbG8=", "red sweater").await.unwrap();
        assert!(verdict.is_match());
        assert!(verdict.comment.contains("sweater"));
    }

    #[tokio::test]
    async fn test_error_verdict_is_not_a_match() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "ERROR",
                "comment": "Shows a kettle, not clothing",
            })))
            .mount(&server)
            .await;

        let client = VisionClient::new(format!("{}/classificator", server.uri()));
        let verdict = client.validate("aGVsbG8=", "red sweater").await.unwrap();
        assert!(!verdict.is_match());
    }

    #[tokio::test]
    async fn test_non_2xx_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad image"))
            .mount(&server)
            .await;

        let client = VisionClient::new(format!("{}/classificator", server.uri()));
        let err = client.validate("####", "query").await.unwrap_err();
        match err {
            VisionError::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad image");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
