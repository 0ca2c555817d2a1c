use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::ndjson::decode_chat_stream;
use crate::application::{ChatClient, FragmentStream};
use crate::domain::{ChatRequest, DomainError};

/// Default target: Ollama running locally on its standard port.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Default model, pulled with `ollama pull llama3.1`.
pub const DEFAULT_MODEL: &str = "llama3.1";
const CHAT_PATH: &str = "/api/chat";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Streaming client for the Ollama chat endpoint (`POST /api/chat`).
///
/// The response body is newline-delimited JSON, one object per generated
/// fragment, closed by an object with `"done": true`.
///
/// Before each request the client sends a lightweight `HEAD /` probe with a
/// 2-second timeout. If the server isn't reachable the call fails
/// immediately with a transport error instead of waiting on the connect
/// timeout.
///
/// ```text
/// OLLAMA_HOST=http://192.168.1.20:11434
/// OLLAMA_MODEL=mistral
/// ```
pub struct OllamaClient {
    client: reqwest::Client,
    probe_client: reqwest::Client,
    /// Full endpoint URL (base + CHAT_PATH).
    url: String,
    /// Base URL used for the probe (e.g. `http://localhost:11434/`).
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = normalize_base_url(&base_url.into());
        let url = format!("{base}{CHAT_PATH}");
        let base_url = format!("{base}/");
        Self {
            // No overall timeout: a long answer may legitimately stream for
            // minutes.
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            probe_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(2))
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            url,
            base_url,
        }
    }

    /// Construct from `OLLAMA_HOST`, falling back to [`DEFAULT_BASE_URL`].
    pub fn from_env() -> Self {
        Self::new(Self::configured_base_url())
    }

    pub fn configured_base_url() -> String {
        std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
    }

    /// `OLLAMA_MODEL`, falling back to [`DEFAULT_MODEL`].
    pub fn configured_model() -> String {
        std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Accept `host:port` as well as full URLs, the way `OLLAMA_HOST` is often
/// written.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat(&self, request: ChatRequest) -> Result<FragmentStream, DomainError> {
        // Any HTTP response, even 4xx/5xx, means the server is up.
        match self.probe_client.head(&self.base_url).send().await {
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Err(DomainError::transport(format!(
                    "OllamaClient: server not reachable at {}: {e}",
                    self.base_url()
                )));
            }
            _ => {}
        }

        debug!(
            "OllamaClient: POST {} (model {}, {} messages)",
            self.url,
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("OllamaClient: request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("OllamaClient: API returned {status}: {body}");
            let reason = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(DomainError::model(format!(
                "OllamaClient: API returned {status}: {reason}"
            )));
        }

        Ok(decode_chat_stream(response.bytes_stream()))
    }

    fn name(&self) -> &str {
        self.base_url()
    }
}
