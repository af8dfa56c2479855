//! Backend-neutral request and response types for a single generation.

use serde::{Deserialize, Serialize};

/// Opaque dialogue state returned by the backend and fed back on the next turn.
pub type DialogueState = Vec<i64>;

/// One non-streaming generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub model: String,
    pub prompt: String,
    /// Resolved system instruction.
    pub system: String,
    /// Always false; token streaming is not supported.
    pub stream: bool,
    /// Prior state for this conversant, if any survived eviction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<DialogueState>,
}

impl InferenceRequest {
    pub fn new(model: &str, prompt: &str, system: &str, context: Option<DialogueState>) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            system: system.to_string(),
            stream: false,
            context,
        }
    }
}

/// A decoded, validated generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub model: String,
    pub created_at: String,
    /// Generated text. Never empty once returned by a provider.
    pub text: String,
    /// New dialogue state to store for the conversant.
    pub state: DialogueState,
    pub done: bool,
    pub done_reason: String,
    /// Timing counters, in nanoseconds as reported by the backend.
    pub total_duration: u64,
    pub load_duration: u64,
    pub prompt_eval_count: u64,
    pub prompt_eval_duration: u64,
    pub eval_count: u64,
    pub eval_duration: u64,
}

impl InferenceResponse {
    /// Prompt plus completion tokens, if the backend reported any.
    pub fn tokens_used(&self) -> Option<u64> {
        match self.prompt_eval_count + self.eval_count {
            0 => None,
            n => Some(n),
        }
    }
}
