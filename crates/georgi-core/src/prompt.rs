//! Prompt builder: admission, mention stripping, system prompt resolution,
//! and reply-aware prompt enrichment.

use crate::{
    config::{AdmissionRule, BotConfig, PromptConfig},
    error::GeorgiError,
    message::ReplyContext,
    sanitize::{normalize_whitespace, sanitize},
};
use std::collections::HashMap;

/// Placeholder in system prompts replaced by the mention prefix.
pub const PREFIX_PLACEHOLDER: &str = "<PREFIX>";

/// Built-in system prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are <PREFIX>, an AI bot in a Discord server where it is your job to maintain records of quoted messages.\n\
     You love Bulgaria and its vibrant history, and love talking about it any chance you get. \
     You are friendly and helpful to all requests.";

/// A prompt ready to send, plus what the length check needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPrompt {
    /// The user's own words, mention stripped and sanitized.
    pub content: String,
    /// Full prompt with sender and reply framing.
    pub prompt: String,
    /// Resolved, single-line system instruction.
    pub system: String,
    /// Sanitizer warnings, for logging.
    pub warnings: Vec<String>,
}

impl BuiltPrompt {
    /// Length of the sanitized user content, in characters.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Turns raw message text into backend prompts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    prefix: String,
    separator: String,
    keywords: Vec<String>,
    rules: Vec<AdmissionRule>,
    system_prompt: String,
    per_user: HashMap<String, String>,
    max_chars: usize,
    refusal_message: String,
}

impl PromptBuilder {
    pub fn new(bot: &BotConfig, prompt: &PromptConfig) -> Self {
        Self {
            prefix: bot.prefix.trim().to_string(),
            separator: bot.separator.clone(),
            keywords: bot
                .trigger_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            rules: bot.admission.clone(),
            system_prompt: prompt.system_prompt.clone(),
            per_user: prompt
                .per_user
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
            max_chars: prompt.max_chars,
            refusal_message: prompt.refusal_message.clone(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn refusal_message(&self) -> &str {
        &self.refusal_message
    }

    /// Whether a message is addressed to the bot under any configured rule.
    pub fn admits(&self, text: &str) -> bool {
        self.rules.iter().any(|rule| self.matches(*rule, text))
    }

    fn matches(&self, rule: AdmissionRule, text: &str) -> bool {
        match rule {
            AdmissionRule::PrefixSeparator => self
                .after_prefix(text)
                .and_then(|rest| strip_prefix_ci(rest, &self.separator))
                .is_some(),
            AdmissionRule::MentionPrefix => self.after_prefix(text).is_some(),
            AdmissionRule::Keyword => {
                let lower = text.to_lowercase();
                self.keywords.iter().any(|k| lower.contains(k.as_str()))
            }
        }
    }

    /// Text after a leading `prefix` or `@prefix`, if the prefix is a whole word.
    fn after_prefix<'a>(&self, text: &'a str) -> Option<&'a str> {
        let text = text.trim_start();
        let text = text.strip_prefix('@').unwrap_or(text);
        let rest = strip_prefix_ci(text, &self.prefix)?;
        match rest.chars().next() {
            Some(c) if c.is_alphanumeric() => None,
            _ => Some(rest),
        }
    }

    /// Remove the mention (and a following separator) from the start of `text`.
    pub fn strip_mention<'a>(&self, text: &'a str) -> &'a str {
        match self.after_prefix(text) {
            Some(rest) => strip_prefix_ci(rest, &self.separator)
                .unwrap_or(rest)
                .trim(),
            None => text.trim(),
        }
    }

    /// Resolve the system prompt for a sender: per-user, then global, then built-in.
    pub fn system_prompt_for(&self, sender_name: &str) -> String {
        let raw = self
            .per_user
            .get(&sender_name.to_lowercase())
            .filter(|p| !p.trim().is_empty())
            .map(String::as_str)
            .or_else(|| Some(self.system_prompt.as_str()).filter(|p| !p.trim().is_empty()))
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        normalize_whitespace(&raw.replace(PREFIX_PLACEHOLDER, &self.prefix))
    }

    /// Build the prompt and system instruction for one message.
    ///
    /// `sender_name` only frames the prompt; the system prompt is resolved
    /// from `username`, which users cannot change per guild.
    pub fn build(
        &self,
        raw_text: &str,
        sender_name: &str,
        username: &str,
        reply: Option<&ReplyContext>,
    ) -> BuiltPrompt {
        let sanitized = sanitize(self.strip_mention(raw_text));
        let content = sanitized.text;
        let mut warnings = sanitized.warnings;

        let mut prompt = format!(
            "This message was sent by: {sender_name}. Message Content: {content}"
        );

        if let Some(reply) = reply.filter(|r| !r.content.trim().is_empty()) {
            let replied = sanitize(&reply.content);
            warnings.extend(replied.warnings);
            let author = if reply.from_self {
                format!("You, the bot named {}", self.prefix)
            } else {
                reply.author_name.clone()
            };
            prompt.push_str(&format!(
                ". This message was a reply to: {}. The reply was sent by: {author}",
                replied.text
            ));
        }

        BuiltPrompt {
            content,
            prompt: normalize_whitespace(&prompt),
            system: self.system_prompt_for(username),
            warnings,
        }
    }

    /// Enforce the input ceiling on the sanitized user content.
    pub fn check_length(&self, built: &BuiltPrompt) -> Result<(), GeorgiError> {
        let len = built.content_len();
        if len > self.max_chars {
            return Err(GeorgiError::InputTooLong {
                len,
                max: self.max_chars,
            });
        }
        Ok(())
    }
}

/// Case-insensitive `str::strip_prefix`, safe on multi-byte text.
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = text.char_indices();
    for p in prefix.chars() {
        let (_, c) = rest.next()?;
        if !c.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    let offset = rest.next().map(|(i, _)| i).unwrap_or(text.len());
    Some(&text[offset..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(&BotConfig::default(), &PromptConfig::default())
    }

    fn builder_with(rules: Vec<AdmissionRule>) -> PromptBuilder {
        let bot = BotConfig {
            admission: rules,
            ..Default::default()
        };
        PromptBuilder::new(&bot, &PromptConfig::default())
    }

    #[test]
    fn test_strip_prefix_ci() {
        assert_eq!(strip_prefix_ci("GeorgiBot, hi", "georgibot"), Some(", hi"));
        assert_eq!(strip_prefix_ci("georgi", "georgibot"), None);
        assert_eq!(strip_prefix_ci("Ёлка!", "ёлка"), Some("!"));
        assert_eq!(strip_prefix_ci("abc", ""), Some("abc"));
    }

    #[test]
    fn test_admits_prefix_separator() {
        let b = builder();
        assert!(b.admits("georgibot, tell me about Plovdiv"));
        assert!(b.admits("GEORGIBOT, hello"));
        assert!(b.admits("@georgibot, hello"));
        assert!(!b.admits("georgibot hello"));
        assert!(!b.admits("hey georgibot, hello"));
    }

    #[test]
    fn test_admits_keyword_anywhere() {
        let b = builder();
        assert!(b.admits("I miss BULGARIA so much"));
        assert!(!b.admits("I miss Romania so much"));
    }

    #[test]
    fn test_admits_mention_prefix_rule() {
        let b = builder_with(vec![AdmissionRule::MentionPrefix]);
        assert!(b.admits("georgibot hello"));
        assert!(b.admits("@GeorgiBot what's up"));
        assert!(b.admits("georgibot"));
        assert!(!b.admits("georgibots are great"));
        assert!(!b.admits("talk about bulgaria"));
    }

    #[test]
    fn test_strip_mention() {
        let b = builder();
        assert_eq!(
            b.strip_mention("georgibot, tell me about Plovdiv"),
            "tell me about Plovdiv"
        );
        assert_eq!(b.strip_mention("@GeorgiBot,   hi  "), "hi");
        assert_eq!(b.strip_mention("georgibot hi"), "hi");
        assert_eq!(
            b.strip_mention("what about bulgaria?"),
            "what about bulgaria?"
        );
        assert_eq!(b.strip_mention("georgian wine"), "georgian wine");
    }

    #[test]
    fn test_build_basic_prompt() {
        let built = builder().build("georgibot, tell me about Plovdiv", "u1", "u1", None);
        assert_eq!(built.content, "tell me about Plovdiv");
        assert_eq!(
            built.prompt,
            "This message was sent by: u1. Message Content: tell me about Plovdiv"
        );
        assert!(built.system.starts_with("You are georgibot, an AI bot"));
        assert!(!built.system.contains('\n'));
    }

    #[test]
    fn test_build_normalizes_control_chars() {
        let built = builder().build("georgibot, line1\nline2\tend\r", "u1", "u1", None);
        assert_eq!(built.content, "line1 line2 end");
        assert!(!built.prompt.contains('\n'));
    }

    #[test]
    fn test_build_reply_to_user() {
        let reply = ReplyContext {
            author_id: "2".into(),
            author_name: "mira".into(),
            content: "Sofia is the capital".into(),
            from_self: false,
        };
        let built = builder().build("georgibot, is that true?", "u1", "u1", Some(&reply));
        assert_eq!(
            built.prompt,
            "This message was sent by: u1. Message Content: is that true?. \
             This message was a reply to: Sofia is the capital. The reply was sent by: mira"
        );
        assert_eq!(built.content, "is that true?");
    }

    #[test]
    fn test_build_reply_to_self_names_bot() {
        let reply = ReplyContext {
            author_id: "99".into(),
            author_name: "georgibot".into(),
            content: "Plovdiv is old.\nVery old.".into(),
            from_self: true,
        };
        let built = builder().build("georgibot, how old?", "u1", "u1", Some(&reply));
        assert!(built
            .prompt
            .ends_with("The reply was sent by: You, the bot named georgibot"));
        assert!(built.prompt.contains("Plovdiv is old. Very old."));
    }

    #[test]
    fn test_build_ignores_empty_reply() {
        let reply = ReplyContext {
            author_id: "2".into(),
            author_name: "mira".into(),
            content: "   ".into(),
            from_self: false,
        };
        let built = builder().build("georgibot, hi", "u1", "u1", Some(&reply));
        assert!(!built.prompt.contains("reply"));
    }

    #[test]
    fn test_system_prompt_resolution_order() {
        let mut prompt = PromptConfig {
            system_prompt: "Global for <PREFIX>.\nSecond line.".into(),
            ..Default::default()
        };
        prompt
            .per_user
            .insert("Alice".into(), "Just for\talice".into());
        let b = PromptBuilder::new(&BotConfig::default(), &prompt);

        assert_eq!(b.system_prompt_for("ALICE"), "Just for alice");
        assert_eq!(
            b.system_prompt_for("bob"),
            "Global for georgibot. Second line."
        );
    }

    #[test]
    fn test_check_length_ceiling() {
        let b = builder();
        let ok = b.build(&format!("georgibot, {}", "a".repeat(1000)), "u1", "u1", None);
        assert!(b.check_length(&ok).is_ok());

        let long = b.build(&format!("georgibot, {}", "a".repeat(1001)), "u1", "u1", None);
        match b.check_length(&long) {
            Err(GeorgiError::InputTooLong { len, max }) => {
                assert_eq!(len, 1001);
                assert_eq!(max, 1000);
            }
            other => panic!("expected InputTooLong, got {other:?}"),
        }
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let b = builder();
        let built = b.build(&format!("georgibot, {}", "ж".repeat(1000)), "u1", "u1", None);
        assert!(b.check_length(&built).is_ok());
    }
}
