//! Model-backed enrichment: day summaries for archival, session titles and
//! headline sentiment labels. All are best effort and have deterministic
//! fallbacks.

use std::time::Instant;

use pr_domain::error::{Error, Result};
use pr_domain::text::truncate_chars;
use pr_domain::tool::Message;
use pr_domain::trace::TraceEvent;
use pr_providers::traits::ChatRequest;
use pr_providers::RoleBinding;
use pr_sessions::Summarizer;
use pr_tools::sentiment::{HeadlineClassifier, Tone};

const TITLE_FALLBACK_WORDS: usize = 6;

pub struct LlmSummarizer {
    binding: Option<RoleBinding>,
}

impl LlmSummarizer {
    pub fn new(binding: Option<RoleBinding>) -> Self {
        Self { binding }
    }

    pub fn is_available(&self) -> bool {
        self.binding.is_some()
    }

    async fn complete(&self, purpose: &str, prompt: String, max_tokens: u32) -> Result<String> {
        let binding = self
            .binding
            .as_ref()
            .ok_or_else(|| Error::Config("no summarizer model configured".into()))?;

        let started = Instant::now();
        let req = ChatRequest {
            messages: vec![Message::user(prompt)],
            tools: Vec::new(),
            temperature: Some(0.1),
            max_tokens: Some(max_tokens),
            json_mode: false,
            model: binding.model.clone(),
        };
        let resp = binding.provider.chat(&req).await?;

        TraceEvent::LlmRequest {
            provider: binding.provider.provider_id().to_string(),
            model: resp.model.clone(),
            purpose: purpose.into(),
            streaming: false,
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: resp.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: resp.usage.as_ref().map(|u| u.completion_tokens),
        }
        .emit();

        let text = resp.content.trim();
        if text.is_empty() {
            return Err(Error::Other(format!("{purpose}: empty completion")));
        }
        Ok(text.to_string())
    }

    /// A 3-4 word title for a conversation that opens with `message`.
    /// Falls back to the message's first words.
    pub async fn generate_title(&self, message: &str, max_chars: usize) -> String {
        let prompt = format!("Generate a short 3-4 word title for: '{message}'. No quotes.");
        match self.complete("title", prompt, 20).await {
            Ok(raw) => {
                let title = raw
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                    .trim();
                if title.is_empty() {
                    fallback_title(message, max_chars)
                } else {
                    truncate_chars(title, max_chars)
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "title generation failed, using fallback");
                fallback_title(message, max_chars)
            }
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize_day(&self, day: &str, transcript: &str) -> Result<String> {
        let prompt = format!(
            "You are summarizing one day ({day}) of a conversation between an investor and a \
             stock-analysis assistant. In 3-5 sentences, capture:\n\
             1. The stocks discussed and what was asked about them\n\
             2. Key figures, conclusions or recommendations given\n\
             3. Open questions the investor may return to\n\n\
             Write in past tense. Omit greetings.\n\n\
             CONVERSATION:\n{transcript}"
        );
        self.complete("day_summary", prompt, 400).await
    }
}

#[async_trait::async_trait]
impl HeadlineClassifier for LlmSummarizer {
    async fn classify(&self, titles: &[String]) -> Result<Vec<Tone>> {
        let numbered: Vec<String> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {t}", i + 1))
            .collect();
        let prompt = format!(
            "Classify each financial news headline as Bullish, Bearish or Neutral for the \
             stock it mentions. Reply with only a JSON array of labels, one per headline, \
             in order.\n\n{}",
            numbered.join("\n")
        );
        let raw = self.complete("headline_sentiment", prompt, 120).await?;
        parse_tone_labels(&raw)
    }
}

/// A JSON array of labels, possibly wrapped in prose or a code fence.
/// Unrecognized labels count as neutral.
fn parse_tone_labels(raw: &str) -> Result<Vec<Tone>> {
    let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
        return Err(Error::Other("headline_sentiment: no label array".into()));
    };
    if end < start {
        return Err(Error::Other("headline_sentiment: no label array".into()));
    }
    let labels: Vec<String> = serde_json::from_str(&raw[start..=end])?;
    Ok(labels
        .iter()
        .map(|l| Tone::from_label(l).unwrap_or(Tone::Neutral))
        .collect())
}

/// The first few words of `message`, capped at `max_chars`.
pub fn fallback_title(message: &str, max_chars: usize) -> String {
    let words: Vec<&str> = message.split_whitespace().take(TITLE_FALLBACK_WORDS).collect();
    truncate_chars(&words.join(" "), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_providers::scripted::ScriptedProvider;
    use std::sync::Arc;

    fn with_reply(reply: ScriptedProvider) -> LlmSummarizer {
        LlmSummarizer::new(Some(RoleBinding {
            provider: Arc::new(reply),
            model: None,
        }))
    }

    #[test]
    fn tone_labels_tolerate_wrapping() {
        let tones = parse_tone_labels("```json\n[\"Bullish\", \"bearish\", \"mixed\"]\n```").unwrap();
        assert_eq!(tones, vec![Tone::Bullish, Tone::Bearish, Tone::Neutral]);
        assert!(parse_tone_labels("Bullish").is_err());
        assert!(parse_tone_labels("] oops [").is_err());
    }

    #[tokio::test]
    async fn headlines_are_labelled_by_the_model() {
        let provider = Arc::new(ScriptedProvider::new("t").with_reply("[\"Bearish\", \"Bullish\"]"));
        let s = LlmSummarizer::new(Some(RoleBinding {
            provider: provider.clone(),
            model: None,
        }));
        let titles = vec!["TCS wins deal".to_string(), "Margins squeezed".to_string()];
        let tones = s.classify(&titles).await.unwrap();
        assert_eq!(tones, vec![Tone::Bearish, Tone::Bullish]);

        let requests = provider.requests();
        let pr_domain::tool::MessageContent::Text(prompt) = &requests[0].messages[0].content else {
            panic!("expected a text prompt");
        };
        assert!(prompt.contains("1. TCS wins deal"));
        assert!(prompt.contains("2. Margins squeezed"));

        assert!(LlmSummarizer::new(None).classify(&titles).await.is_err());
    }

    #[test]
    fn fallback_title_takes_first_words() {
        assert_eq!(
            fallback_title("  show me the risk profile of TCS today please", 60),
            "show me the risk profile of"
        );
        assert_eq!(fallback_title("hello there", 8), "hello...");
    }

    #[tokio::test]
    async fn model_title_is_unquoted_and_capped() {
        let s = with_reply(ScriptedProvider::new("t").with_reply("\"TCS Risk Overview\"\n"));
        assert_eq!(s.generate_title("risk of TCS?", 60).await, "TCS Risk Overview");

        let s = with_reply(ScriptedProvider::new("t").with_reply("Reliance Industries Deep Dive"));
        let title = s.generate_title("x", 12).await;
        assert_eq!(title, "Reliance...");
        assert!(title.chars().count() <= 12);
    }

    #[tokio::test]
    async fn failed_title_uses_fallback() {
        let s = with_reply(ScriptedProvider::new("t").with_reply_error("boom"));
        assert_eq!(s.generate_title("what is INFY worth", 60).await, "what is INFY worth");

        let s = LlmSummarizer::new(None);
        assert!(!s.is_available());
        assert_eq!(s.generate_title("hi there", 60).await, "hi there");
        assert!(s.summarize_day("2024-01-01", "User: hi").await.is_err());
    }
}
