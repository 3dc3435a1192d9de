//! External model provider access.
//!
//! `LanguageModel` is the seam between the analysis service and the vendor. `GeminiClient` is the
//! production implementation against the Generative Language API `generateContent` endpoint.
//! Provider failures are translated in exactly one place, [`classify_error`].

use crate::config::ProviderConfig;
use crate::constants::{
    GENERATION_MAX_OUTPUT_TOKENS, GENERATION_TEMPERATURE, GENERATION_TOP_K, GENERATION_TOP_P,
    PROVIDER_RETRY_DELAY,
};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A text-generation backend that answers with JSON text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send `prompt` and return the raw text of the model's answer.
    async fn generate_json(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Gemini `generateContent` client with a request timeout and a single retry.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
    retry_delay: Duration,
}

impl GeminiClient {
    /// Build a client from resolved provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Client` if the HTTP client cannot be constructed.
    pub fn new(cfg: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                cfg.base_url(),
                cfg.model()
            ),
            api_key: cfg.api_key().to_string(),
            timeout: cfg.timeout(),
            retry_delay: PROVIDER_RETRY_DELAY,
        })
    }

    /// Override the pause before the retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn attempt(&self, body: &GenerateRequest<'_>) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let raw = response.text().await.map_err(|e| self.transport_error(e))?;
        match serde_json::from_str::<GenerateResponse>(&raw) {
            Ok(parsed) => parsed.into_text(),
            Err(source) => Err(ProviderError::Decode { source, raw }),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout.as_secs())
        } else if e.is_connect() {
            ProviderError::Connect(e)
        } else {
            ProviderError::Transport(e)
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate_json(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateRequest::new(prompt);

        match self.attempt(&body).await {
            Err(e) if e.is_transient() => {
                tracing::warn!("transient model provider failure, retrying once: {}", e);
                tokio::time::sleep(self.retry_delay).await;
                self.attempt(&body).await
            }
            other => other,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
                top_p: GENERATION_TOP_P,
                top_k: GENERATION_TOP_K,
                max_output_tokens: GENERATION_MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json",
            },
        }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, ProviderError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::Blocked(reason));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Documented Google API error body: `{"error": {"code", "message", "status"}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Translate a failed provider response into a `ProviderError`.
///
/// Structured error bodies are classified by their documented `status`/`code`. A plain-text body
/// is only pattern-matched for the leaked-key signature.
pub fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let (code, provider_status, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope.error.code.unwrap_or(status.as_u16()),
            envelope.error.status,
            envelope.error.message,
        ),
        Err(_) => (status.as_u16(), None, body.trim().to_string()),
    };

    let reports_leak = message.to_ascii_lowercase().contains("leaked");
    let permission_denied =
        code == 403 || provider_status.as_deref() == Some("PERMISSION_DENIED");

    if reports_leak && (permission_denied || provider_status.is_none()) {
        return ProviderError::KeyCompromised;
    }

    match code {
        401 | 403 => ProviderError::Unauthorized {
            status: code,
            message,
        },
        429 | 500..=599 => ProviderError::Unavailable {
            status: code,
            message,
        },
        _ => ProviderError::Rejected {
            status: code,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode as AxumStatus, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const LEAKED_BODY: &str = r#"{
        "error": {
            "code": 403,
            "message": "Your API key was reported as leaked. Please use another API key.",
            "status": "PERMISSION_DENIED"
        }
    }"#;

    fn ok_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
    }

    /// Serve scripted `(status, body)` replies in order, repeating the last one.
    async fn scripted_provider(
        replies: Vec<(u16, serde_json::Value)>,
    ) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = (Arc::new(replies), calls.clone());

        async fn reply(
            State((replies, calls)): State<(Arc<Vec<(u16, serde_json::Value)>>, Arc<AtomicUsize>)>,
        ) -> (AxumStatus, Json<serde_json::Value>) {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let (status, body) = replies[n.min(replies.len() - 1)].clone();
            (AxumStatus::from_u16(status).unwrap(), Json(body))
        }

        let app = Router::new()
            .route("/v1beta/models/:model", post(reply))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), calls)
    }

    fn client_for(base_url: &str) -> GeminiClient {
        let cfg = ProviderConfig::new(
            Some("test-key".into()),
            Some("gemini-test".into()),
            Some(base_url.into()),
            Duration::from_secs(5),
        )
        .unwrap();
        GeminiClient::new(&cfg)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_classify_structured_leak() {
        let err = classify_error(StatusCode::FORBIDDEN, LEAKED_BODY);
        assert!(matches!(err, ProviderError::KeyCompromised));
    }

    #[test]
    fn test_classify_plain_text_leak_fallback() {
        let err = classify_error(
            StatusCode::FORBIDDEN,
            "403 Your API key was reported as LEAKED",
        );
        assert!(matches!(err, ProviderError::KeyCompromised));
    }

    #[test]
    fn test_classify_other_permission_errors() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, body),
            ProviderError::Unauthorized { status: 403, .. }
        ));
    }

    #[test]
    fn test_classify_transient_and_rejected() {
        let overloaded = r#"{"error":{"code":503,"message":"The model is overloaded","status":"UNAVAILABLE"}}"#;
        assert!(classify_error(StatusCode::SERVICE_UNAVAILABLE, overloaded).is_transient());
        assert!(classify_error(StatusCode::TOO_MANY_REQUESTS, "slow down").is_transient());
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, "{}"),
            ProviderError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn test_request_body_uses_documented_field_names() {
        let body = serde_json::to_value(GenerateRequest::new("hello")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["topK"], 64);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_empty_and_blocked_responses() {
        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(empty.into_text(), Err(ProviderError::EmptyResponse)));

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(matches!(blocked.into_text(), Err(ProviderError::Blocked(r)) if r == "SAFETY"));
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let (base, calls) = scripted_provider(vec![(200, ok_body("{\"score\": 90}"))]).await;

        let text = client_for(&base).generate_json("prompt").await.unwrap();

        assert_eq!(text, "{\"score\": 90}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let unavailable = serde_json::json!({
            "error": { "code": 503, "message": "overloaded", "status": "UNAVAILABLE" }
        });
        let (base, calls) =
            scripted_provider(vec![(503, unavailable), (200, ok_body("{}"))]).await;

        let text = client_for(&base).generate_json("prompt").await.unwrap();

        assert_eq!(text, "{}");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_transient_failure_gives_up_after_one_retry() {
        let unavailable = serde_json::json!({
            "error": { "code": 500, "message": "internal", "status": "INTERNAL" }
        });
        let (base, calls) = scripted_provider(vec![(500, unavailable)]).await;

        let err = client_for(&base).generate_json("prompt").await.unwrap_err();

        assert!(matches!(err, ProviderError::Unavailable { status: 500, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_leaked_key_is_not_retried() {
        let leaked: serde_json::Value = serde_json::from_str(LEAKED_BODY).unwrap();
        let (base, calls) = scripted_provider(vec![(403, leaked)]).await;

        let err = client_for(&base).generate_json("prompt").await.unwrap_err();

        assert!(matches!(err, ProviderError::KeyCompromised));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_json_success_body_keeps_raw_text() {
        let app = Router::new().route(
            "/v1beta/models/:model",
            post(|| async { "<html>upstream proxy error</html>" }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let err = client_for(&format!("http://{addr}"))
            .generate_json("prompt")
            .await
            .unwrap_err();

        match err {
            ProviderError::Decode { raw, .. } => {
                assert_eq!(raw, "<html>upstream proxy error</html>")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_a_transport_error() {
        let err = client_for("http://127.0.0.1:1")
            .generate_json("prompt")
            .await
            .unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }
}
