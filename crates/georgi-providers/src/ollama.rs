//! Ollama local model provider.
//!
//! Connects to a locally running Ollama server through `/api/generate`.
//! No API key required. Dialogue continuity comes from the `context` token
//! array the server hands back with every generation.

use async_trait::async_trait;
use georgi_core::{
    error::GeorgiError,
    inference::{DialogueState, InferenceRequest, InferenceResponse},
    traits::Provider,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Ollama provider backed by a local server.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// Create from config values.
    pub fn from_config(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
        }
    }

    /// Model used when a request leaves it blank.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

// --- Serde types ---

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a DialogueState>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GenerateReply {
    model: String,
    created_at: String,
    response: String,
    done: bool,
    done_reason: String,
    context: DialogueState,
    total_duration: u64,
    load_duration: u64,
    prompt_eval_count: u64,
    prompt_eval_duration: u64,
    eval_count: u64,
    eval_duration: u64,
}

impl From<GenerateReply> for InferenceResponse {
    fn from(r: GenerateReply) -> Self {
        Self {
            model: r.model,
            created_at: r.created_at,
            text: r.response,
            state: r.context,
            done: r.done,
            done_reason: r.done_reason,
            total_duration: r.total_duration,
            load_duration: r.load_duration,
            prompt_eval_count: r.prompt_eval_count,
            prompt_eval_duration: r.prompt_eval_duration,
            eval_count: r.eval_count,
            eval_duration: r.eval_duration,
        }
    }
}

fn request_error(e: reqwest::Error, timeout: Duration) -> GeorgiError {
    if e.is_timeout() {
        GeorgiError::Timeout(timeout)
    } else {
        GeorgiError::Provider(format!("ollama request failed: {e}"))
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(
        &self,
        request: &InferenceRequest,
        timeout: Duration,
    ) -> Result<InferenceResponse, GeorgiError> {
        let url = self.endpoint("/api/generate");
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };
        let body = GenerateBody {
            model,
            prompt: &request.prompt,
            system: &request.system,
            stream: false,
            context: request.context.as_ref(),
        };
        let start = Instant::now();

        debug!(
            "ollama: POST {url} model={model} context_tokens={}",
            request.context.as_ref().map_or(0, Vec::len)
        );

        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(e, timeout))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GeorgiError::Provider(format!(
                "ollama returned {status}: {text}"
            )));
        }

        let raw = resp.text().await.map_err(|e| request_error(e, timeout))?;
        debug!("ollama: response body {raw}");

        let parsed: GenerateReply = serde_json::from_str(&raw)
            .map_err(|e| GeorgiError::Decode(format!("ollama: failed to parse response: {e}")))?;

        if parsed.response.trim().is_empty() {
            return Err(GeorgiError::EmptyGeneration);
        }

        debug!(
            "ollama: {} chars in {}ms (eval_count={})",
            parsed.response.len(),
            start.elapsed().as_millis(),
            parsed.eval_count
        );

        Ok(parsed.into())
    }

    async fn is_available(&self) -> bool {
        let url = self.endpoint("/api/tags");
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("ollama not available: {e}");
                false
            }
        }
    }
}
