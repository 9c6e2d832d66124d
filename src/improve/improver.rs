//! LLM-backed text improvement with graceful degradation.
//!
//! [`TextImprover`] is deliberately infallible: a transcript must reach the
//! clipboard even when the LLM is down, so every failure path collapses into
//! returning the raw text tagged [`Provenance::Fallback`].  Failures are
//! logged, never propagated.
//!
//! [`OllamaImprover`] talks to a local Ollama daemon over its HTTP API.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OllamaConfig;
use crate::improve::prompt::PromptTemplate;

/// Transcripts shorter than this skip the LLM round-trip entirely; there is
/// nothing meaningful to correct in one or two characters.
const MIN_IMPROVE_CHARS: usize = 3;

/// Extra attempts after the first failed request.
const MAX_RETRIES: u32 = 2;

/// Base delay between attempts; multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// How long a cached availability probe stays fresh.
const AVAILABILITY_TTL: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Where the delivered text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The LLM returned a corrected version of the transcript.
    Improved,
    /// The raw transcript was used unchanged.
    Fallback,
}

/// The outcome of an improvement pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImprovedResult {
    /// Text ready for delivery.
    pub text: String,
    /// Whether the LLM contributed.
    pub provenance: Provenance,
}

impl ImprovedResult {
    /// An LLM-corrected result.
    pub fn improved(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provenance: Provenance::Improved,
        }
    }

    /// A raw-transcript result.
    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provenance: Provenance::Fallback,
        }
    }
}

// ---------------------------------------------------------------------------
// TextImprover trait
// ---------------------------------------------------------------------------

/// Interface for text improvement backends.
///
/// # Contract
///
/// `improve` never fails: implementations must return the input text with
/// [`Provenance::Fallback`] when the backend is unavailable or returns an
/// unusable response.
#[async_trait]
pub trait TextImprover: Send + Sync {
    /// Improve `text`, falling back to it unchanged on any failure.
    async fn improve(&self, text: &str) -> ImprovedResult;

    /// Cheap reachability probe for the backend.
    async fn is_available(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Ollama wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

// ---------------------------------------------------------------------------
// Failure classification
// ---------------------------------------------------------------------------

/// Internal failure classification for the retry loop.
#[derive(Debug)]
enum RequestFailure {
    /// Timeout, connection refused, or a 5xx status.  Worth another attempt.
    Retriable(String),
    /// 4xx status, undecodable body, or an empty `response` field.  Retrying
    /// cannot help.
    Fatal(String),
}

impl RequestFailure {
    fn message(&self) -> &str {
        match self {
            RequestFailure::Retriable(m) | RequestFailure::Fatal(m) => m,
        }
    }
}

fn classify_transport(err: &reqwest::Error) -> RequestFailure {
    if err.is_timeout() || err.is_connect() {
        RequestFailure::Retriable(err.to_string())
    } else {
        RequestFailure::Fatal(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// OllamaImprover
// ---------------------------------------------------------------------------

/// Production improver backed by a local Ollama daemon.
///
/// Requests go to `POST <host>/api/generate` with streaming disabled.
/// Retriable failures get up to [`MAX_RETRIES`] extra attempts with linear
/// backoff; everything else falls back immediately.
pub struct OllamaImprover {
    client: reqwest::Client,
    host: String,
    model: String,
    template: PromptTemplate,
    availability: Mutex<Option<(Instant, bool)>>,
}

impl OllamaImprover {
    /// Build an improver from the `[ollama]` configuration section.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed or the prompt template
    /// lacks its placeholder.  Config validation catches the latter earlier,
    /// so in practice this only fails on TLS backend initialisation.
    pub fn from_config(config: &OllamaConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let template = PromptTemplate::new(config.prompt_template.clone())?;
        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            template,
            availability: Mutex::new(None),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.host)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.host)
    }

    /// Models the daemon currently has pulled, or an empty list when it is
    /// unreachable.
    pub async fn available_models(&self) -> Vec<String> {
        let response = match self.client.get(self.tags_url()).send().await {
            Ok(r) => r,
            Err(e) => {
                log::debug!("improve: model listing failed: {e}");
                return Vec::new();
            }
        };
        match response.json::<TagsResponse>().await {
            Ok(tags) => tags.models.into_iter().map(|m| m.name).collect(),
            Err(e) => {
                log::debug!("improve: model listing undecodable: {e}");
                Vec::new()
            }
        }
    }

    /// One request/response cycle against `/api/generate`.
    async fn request_once(&self, prompt: &str) -> Result<String, RequestFailure> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.3 },
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(RequestFailure::Retriable(format!("server error: {status}")));
        }
        if !status.is_success() {
            return Err(RequestFailure::Fatal(format!("request rejected: {status}")));
        }

        let decoded: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RequestFailure::Fatal(format!("undecodable response: {e}")))?;

        let text = decoded.response.trim().to_string();
        if text.is_empty() {
            return Err(RequestFailure::Fatal("empty response field".into()));
        }
        Ok(text)
    }

    async fn request_with_retry(&self, prompt: &str) -> Result<String, String> {
        let mut attempt = 0;
        loop {
            match self.request_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(RequestFailure::Retriable(msg)) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    log::debug!(
                        "improve: retriable failure ({msg}), attempt {attempt}/{MAX_RETRIES}"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(failure) => return Err(failure.message().to_string()),
            }
        }
    }
}

#[async_trait]
impl TextImprover for OllamaImprover {
    async fn improve(&self, text: &str) -> ImprovedResult {
        if text.trim().chars().count() < MIN_IMPROVE_CHARS {
            return ImprovedResult::fallback(text);
        }

        let prompt = self.template.render(text);
        match self.request_with_retry(&prompt).await {
            Ok(improved) => ImprovedResult::improved(improved),
            Err(msg) => {
                log::warn!("improve: falling back to raw transcript: {msg}");
                ImprovedResult::fallback(text)
            }
        }
    }

    async fn is_available(&self) -> bool {
        {
            let cache = self.availability.lock().unwrap_or_else(|p| p.into_inner());
            if let Some((at, available)) = *cache {
                if at.elapsed() < AVAILABILITY_TTL {
                    return available;
                }
            }
        }

        let available = match self.client.get(self.tags_url()).send().await {
            Ok(r) => r.status().is_success(),
            Err(_) => false,
        };

        let mut cache = self.availability.lock().unwrap_or_else(|p| p.into_inner());
        *cache = Some((Instant::now(), available));
        available
    }
}

// ---------------------------------------------------------------------------
// MockImprover  (test-only)
// ---------------------------------------------------------------------------

/// Test double with a scripted outcome.
#[cfg(test)]
pub struct MockImprover {
    outcome: MockOutcome,
}

#[cfg(test)]
enum MockOutcome {
    Improve(String),
    Fail,
}

#[cfg(test)]
impl MockImprover {
    /// A mock that always "improves" to `text`.
    pub fn improving(text: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Improve(text.into()),
        }
    }

    /// A mock whose backend is down; every call falls back.
    pub fn unavailable() -> Self {
        Self {
            outcome: MockOutcome::Fail,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl TextImprover for MockImprover {
    async fn improve(&self, text: &str) -> ImprovedResult {
        match &self.outcome {
            MockOutcome::Improve(improved) => ImprovedResult::improved(improved.clone()),
            MockOutcome::Fail => ImprovedResult::fallback(text),
        }
    }

    async fn is_available(&self) -> bool {
        matches!(self.outcome, MockOutcome::Improve(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OllamaConfig;

    fn unreachable_improver() -> OllamaImprover {
        let config = OllamaConfig {
            // reserved port on localhost, nothing listens here
            host: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..OllamaConfig::default()
        };
        OllamaImprover::from_config(&config).unwrap()
    }

    #[test]
    fn host_trailing_slash_is_trimmed() {
        let config = OllamaConfig {
            host: "http://localhost:11434/".to_string(),
            ..OllamaConfig::default()
        };
        let improver = OllamaImprover::from_config(&config).unwrap();
        assert_eq!(improver.generate_url(), "http://localhost:11434/api/generate");
        assert_eq!(improver.tags_url(), "http://localhost:11434/api/tags");
    }

    #[tokio::test]
    async fn unreachable_backend_falls_back_to_raw_text() {
        let improver = unreachable_improver();
        let result = improver.improve("helo wrold this needs fixing").await;
        assert_eq!(result.text, "helo wrold this needs fixing");
        assert_eq!(result.provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn very_short_text_skips_the_backend() {
        // Would hang on retries against a real request; returns immediately.
        let improver = unreachable_improver();
        let result = improver.improve("ok").await;
        assert_eq!(result.text, "ok");
        assert_eq!(result.provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn unreachable_backend_reports_unavailable() {
        let improver = unreachable_improver();
        assert!(!improver.is_available().await);
        // Second call hits the cache; still unavailable.
        assert!(!improver.is_available().await);
    }

    #[tokio::test]
    async fn unreachable_backend_lists_no_models() {
        let improver = unreachable_improver();
        assert!(improver.available_models().await.is_empty());
    }

    #[tokio::test]
    async fn mock_improver_honours_the_fallback_law() {
        let down = MockImprover::unavailable();
        let result = down.improve("raw transcript").await;
        assert_eq!(result.text, "raw transcript");
        assert_eq!(result.provenance, Provenance::Fallback);

        let up = MockImprover::improving("Polished transcript.");
        let result = up.improve("raw transcript").await;
        assert_eq!(result.text, "Polished transcript.");
        assert_eq!(result.provenance, Provenance::Improved);
    }

    #[test]
    fn improved_result_constructors_tag_provenance() {
        assert_eq!(ImprovedResult::improved("a").provenance, Provenance::Improved);
        assert_eq!(ImprovedResult::fallback("a").provenance, Provenance::Fallback);
    }

    #[test]
    fn generate_response_decodes_the_ollama_wire_format() {
        let body = r#"{
            "model": "llama3.2",
            "created_at": "2025-01-01T00:00:00Z",
            "response": "Polished transcript.",
            "done": true
        }"#;
        let decoded: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.response, "Polished transcript.");
    }

    #[test]
    fn generate_response_missing_field_defaults_to_empty() {
        // An empty `response` is classified as a fatal failure downstream.
        let decoded: GenerateResponse = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert!(decoded.response.is_empty());
    }

    #[test]
    fn tags_response_decodes_the_model_list() {
        let body = r#"{
            "models": [
                {"name": "llama3.2", "size": 2019393189},
                {"name": "mistral:7b", "size": 4109865159}
            ]
        }"#;
        let decoded: TagsResponse = serde_json::from_str(body).unwrap();
        let names: Vec<&str> = decoded.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["llama3.2", "mistral:7b"]);
    }

    #[test]
    fn generate_request_serialises_with_stream_off() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "Improve: hi",
            stream: false,
            options: GenerateOptions { temperature: 0.3 },
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["stream"], false);
        // f32 widens to f64 in the JSON value; compare approximately.
        let temperature = body["options"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }
}
