//! Summarization proxy.
//!
//! `POST /api/summarize` forwards note text to a generative-text API and
//! returns the summary. The API key stays on the server. Each call is a
//! single best-effort forward: no retries, caching or rate limiting.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::SummarizerConfig;
use crate::error::{ApiError, SummarizeError};
use crate::models::{SummarizeRequest, SummarizeResponse};
use crate::AppState;

pub const SUMMARY_PROMPT: &str = "Summarize the following text in a concise way (max 150 words): ";

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Returns the text to summarize, or `EmptyText` when it is missing or blank.
pub fn validate_text(text: Option<&str>) -> Result<&str, SummarizeError> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(SummarizeError::EmptyText),
    }
}

// ============================================================================
// Gemini client
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: Option<UpstreamErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorDetail {
    message: Option<String>,
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
fn extract_summary(body: &str) -> Result<String, SummarizeError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| SummarizeError::MalformedResponse(e.to_string()))?;

    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| {
            SummarizeError::MalformedResponse("missing candidates[0].content.parts[0].text".into())
        })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(SummarizeError::EmptySummary);
    }
    Ok(text.to_string())
}

fn upstream_error(status: u16, body: &str) -> SummarizeError {
    let message = serde_json::from_str::<UpstreamErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status code {}", status));
    SummarizeError::Upstream { status, message }
}

pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(client: Client, config: &SummarizerConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let api_key = self.api_key.as_deref().ok_or(SummarizeError::NotConfigured)?;

        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": format!("{}{}", SUMMARY_PROMPT, text) }]
            }]
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            return Err(upstream_error(status.as_u16(), &raw));
        }

        extract_summary(&raw)
    }
}

// ============================================================================
// Route Handler
// ============================================================================

pub async fn summarize(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable summarize request");
            SummarizeRequest::default()
        }
    };

    let text = match validate_text(request.text.as_deref()) {
        Ok(t) => t,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.summarizer.summarize(text).await {
        Ok(summary) => Json(SummarizeResponse { summary }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Summarization error");
            ApiError::from(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;

    async fn spawn_mock(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{}/generate", addr)).unwrap()
    }

    fn client_for(endpoint: Url, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            Client::new(),
            &SummarizerConfig {
                endpoint,
                api_key: api_key.map(str::to_string),
            },
        )
    }

    #[test]
    fn test_validate_text() {
        assert!(matches!(validate_text(None), Err(SummarizeError::EmptyText)));
        assert!(matches!(validate_text(Some("")), Err(SummarizeError::EmptyText)));
        assert!(matches!(validate_text(Some(" \n\t ")), Err(SummarizeError::EmptyText)));
        assert_eq!(validate_text(Some(" hi ")).unwrap(), " hi ");
    }

    #[test]
    fn test_extract_summary() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  A short summary. "}],"role":"model"}}]}"#;
        assert_eq!(extract_summary(body).unwrap(), "A short summary.");

        assert!(matches!(
            extract_summary(r#"{"candidates":[]}"#),
            Err(SummarizeError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_summary("<html>oops</html>"),
            Err(SummarizeError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_summary(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#),
            Err(SummarizeError::EmptySummary)
        ));
    }

    #[test]
    fn test_upstream_error_message() {
        let err = upstream_error(400, r#"{"error":{"code":400,"message":"API key not valid."}}"#);
        assert_eq!(err.to_string(), "API key not valid.");

        let err = upstream_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Request failed with status code 502");
    }

    #[tokio::test]
    async fn test_missing_key_fails_the_call() {
        let endpoint = Url::parse("http://127.0.0.1:9/generate").unwrap();
        let err = client_for(endpoint, None).summarize("text").await.unwrap_err();
        assert!(matches!(err, SummarizeError::NotConfigured));
    }

    #[tokio::test]
    async fn test_gemini_round_trip_sends_prompt_and_key() {
        let router = Router::new().route(
            "/generate",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                let key_ok = headers
                    .get("x-goog-api-key")
                    .map(|v| v == "secret")
                    .unwrap_or(false);
                let prompt = body["contents"][0]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                if !key_ok || !prompt.starts_with(SUMMARY_PROMPT) {
                    return (
                        StatusCode::FORBIDDEN,
                        Json(serde_json::json!({"error": {"message": "bad request"}})),
                    )
                        .into_response();
                }
                Json(serde_json::json!({
                    "candidates": [{"content": {"parts": [{"text": "Milk and eggs."}]}}]
                }))
                .into_response()
            }),
        );
        let endpoint = spawn_mock(router).await;

        let summary = client_for(endpoint, Some("secret"))
            .summarize("We need milk and eggs")
            .await
            .unwrap();
        assert_eq!(summary, "Milk and eggs.");
    }

    #[tokio::test]
    async fn test_gemini_upstream_error_is_propagated() {
        let router = Router::new().route(
            "/generate",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({"error": {"message": "Resource has been exhausted"}})),
                )
            }),
        );
        let endpoint = spawn_mock(router).await;

        let err = client_for(endpoint, Some("secret"))
            .summarize("text")
            .await
            .unwrap_err();
        match err {
            SummarizeError::Upstream { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Url::parse(&format!("http://{}/generate", addr)).unwrap();
        let err = client_for(endpoint, Some("secret"))
            .summarize("text")
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Transport(_)));
    }
}
