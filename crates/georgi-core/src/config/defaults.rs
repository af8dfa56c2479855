//! Default value functions used by serde for config deserialization.

use super::AdmissionRule;

pub fn default_prefix() -> String {
    "georgibot".to_string()
}

pub fn default_separator() -> String {
    ",".to_string()
}

pub fn default_trigger_keywords() -> Vec<String> {
    vec!["bulgaria".to_string()]
}

pub fn default_admission() -> Vec<AdmissionRule> {
    vec![AdmissionRule::PrefixSeparator, AdmissionRule::Keyword]
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_max_chars() -> usize {
    1000
}

pub fn default_refusal_message() -> String {
    "Yeah, not reading all that. 1000 characters or less please.".to_string()
}

pub fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

pub fn default_ollama_model() -> String {
    "hermes".to_string()
}

pub fn default_timeout_secs() -> u64 {
    300
}

pub fn default_inactivity_minutes() -> u64 {
    15
}

pub fn default_typing_interval() -> u64 {
    5
}

pub fn default_quotes_channel() -> String {
    "quotes".to_string()
}

pub fn default_quote_emojis() -> Vec<String> {
    vec!["\u{1f4f8}".to_string(), ":camera_with_flash:".to_string()]
}
