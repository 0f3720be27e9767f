//! Sticky entity and intent resolution.
//!
//! Each message is classified by a small model call, with a regex scan of
//! recent turns as a safety net: when the classifier names no symbol, a
//! follow-up ("what about its outlook?") inherits the last symbol that was
//! discussed. Resolution never fails; a broken classifier degrades to the
//! weakest available signal.

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;

use pr_domain::config::ResolverConfig;
use pr_domain::error::{Error, Result};
use pr_domain::intent::{IntentCategory, ResolvedIntent, SymbolSource};
use pr_domain::payload;
use pr_domain::text::truncate_chars;
use pr_domain::tool::Message;
use pr_providers::traits::ChatRequest;
use pr_providers::RoleBinding;
use pr_sessions::{recent_turns, Turn};

/// Uppercase words that look like tickers but almost never are.
const STOP_WORDS: &[&str] = &[
    "AI", "ALL", "ALSO", "AM", "AND", "ANY", "ARE", "BEAR", "BEEN", "BSE", "BULL", "BUT", "BUY",
    "CAN", "CEO", "CFO", "CHART", "DATA", "DII", "EPS", "ETF", "FII", "FOR", "FROM", "FY", "GDP",
    "GRAPH", "HAD", "HAS", "HAVE", "HI", "HIGH", "HOLD", "HOW", "INDEX", "INR", "INTO", "IPO",
    "IS", "IT", "ITS", "JUST", "LOW", "MARKET", "ME", "MORE", "MOST", "MY", "NEW", "NEWS", "NIFTY",
    "NO", "NOT", "NOW", "NSE", "OK", "ONE", "ONLY", "OR", "OUR", "OUT", "OVER", "PB", "PE", "PEG",
    "PM", "PRICE", "QOQ", "RBI", "RISK", "ROA", "ROE", "SEBI", "SELL", "SENSEX", "SHARE",
    "SHARES", "SHOW", "SOME", "STOCK", "STOCKS", "SUCH", "TELL", "THAN", "THAT", "THE", "THEM",
    "THEN", "THEY", "THIS", "TTM", "TWO", "UK", "US", "USD", "VERY", "WAS", "WHAT", "WHEN",
    "WHERE", "WHICH", "WHO", "WHY", "WILL", "WITH", "YES", "YOU", "YOUR", "YOY",
    // metrics and market jargon
    "AGM", "ATH", "AUM", "CAGR", "CAPEX", "CASA", "CMP", "DCF", "EBIT", "EBITDA", "EMA", "EMI",
    "ESG", "EV", "FCF", "FPO", "GNPA", "GST", "LTP", "MACD", "MF", "NAV", "NII", "NIM", "NNPA",
    "NPA", "NPM", "OFS", "OPEX", "OPM", "PAT", "PBT", "QIP", "ROCE", "ROI", "RSI", "SIP", "SMA",
    "YTD",
    // intent words
    "COMPARE", "FUTURE", "GENERAL", "OUTLOOK", "SENTIMENT", "ANALYSIS",
];

/// Placeholders a classifier may echo back instead of a real symbol.
const INVALID_TOKENS: &[&str] = &[
    "COMPANY", "GENERAL", "IT", "ITS", "N/A", "NA", "NIL", "NONE", "NULL", "SYMBOL", "STOCK",
    "THAT", "THIS", "TICKER", "UNKNOWN",
];

/// Words that make a message read as a follow-up on the current entity.
const CUE_WORDS: &[&str] = &[
    "about", "again", "detail", "details", "elaborate", "else", "explain", "further", "it",
    "its", "it's", "more", "same", "that", "their", "them", "these", "they", "this", "those",
    "why",
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Classifier reply
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
struct ClassifierReply {
    #[serde(default, alias = "symbol", alias = "entity_symbol")]
    stock_symbol: Option<String>,
    #[serde(default, alias = "secondary_symbol")]
    second_symbol: Option<String>,
    #[serde(default)]
    intent: Option<String>,
}

/// Strip a ``` fence (optionally ```json) and parse the JSON object inside.
fn parse_reply(raw: &str) -> Result<ClassifierReply> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
        text = text.split("```").next().unwrap_or_default();
    }
    let text = text.trim();
    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };
    Ok(serde_json::from_str(body)?)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EntityResolver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct EntityResolver {
    classifier: Option<RoleBinding>,
    cfg: ResolverConfig,
    stop_words: HashSet<String>,
    invalid_tokens: HashSet<String>,
    candidate: Regex,
    shape: Regex,
}

impl EntityResolver {
    pub fn new(classifier: Option<RoleBinding>, cfg: &ResolverConfig) -> Result<Self> {
        let upper = |s: &String| s.trim().to_ascii_uppercase();
        let stop_words = STOP_WORDS
            .iter()
            .map(|s| s.to_string())
            .chain(cfg.extra_stop_words.iter().map(upper))
            .collect();
        let invalid_tokens = INVALID_TOKENS
            .iter()
            .map(|s| s.to_string())
            .chain(cfg.extra_invalid_tokens.iter().map(upper))
            .collect();

        Ok(Self {
            classifier,
            cfg: cfg.clone(),
            stop_words,
            invalid_tokens,
            candidate: Regex::new(r"\b[A-Z]{2,6}\b")
                .map_err(|e| Error::Config(format!("symbol pattern: {e}")))?,
            shape: Regex::new(r"^[A-Z][A-Z0-9&\-]{0,14}$")
                .map_err(|e| Error::Config(format!("symbol shape: {e}")))?,
        })
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// The most recent ticker-looking token in the last `history_window`
    /// turns, from either role.
    pub fn last_symbol(&self, history: &[Turn]) -> Option<String> {
        recent_turns(history, self.cfg.history_window)
            .iter()
            .rev()
            .find_map(|turn| {
                let text = payload::strip(&turn.text());
                self.candidate
                    .find_iter(&text)
                    .map(|m| m.as_str())
                    .filter(|tok| !self.stop_words.contains(*tok))
                    .last()
                    .map(str::to_string)
            })
    }

    /// Resolve the entity and intent of `message`. Never fails.
    pub async fn resolve(&self, message: &str, history: &[Turn]) -> ResolvedIntent {
        let last_symbol = self.last_symbol(history);

        let reply = match self.classify(message, last_symbol.as_deref(), history).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(error = %e, "intent classification failed, degrading");
                return match last_symbol {
                    Some(symbol) => ResolvedIntent {
                        entity_symbol: Some(symbol),
                        secondary_symbol: None,
                        intent_category: IntentCategory::Analysis,
                        is_enforced: false,
                        source: SymbolSource::Degraded,
                    },
                    None => ResolvedIntent::empty(),
                };
            }
        };

        let intent = reply
            .intent
            .as_deref()
            .map(IntentCategory::from_label)
            .unwrap_or_default();
        let symbol = reply.stock_symbol.as_deref().and_then(|s| self.validate(s));
        let secondary = reply
            .second_symbol
            .as_deref()
            .and_then(|s| self.validate(s))
            .filter(|s| symbol.as_ref() != Some(s));

        if let Some(symbol) = symbol {
            return ResolvedIntent {
                entity_symbol: Some(symbol),
                secondary_symbol: secondary,
                intent_category: intent,
                is_enforced: true,
                source: SymbolSource::Classifier,
            };
        }

        match last_symbol {
            Some(last) if self.is_follow_up(message, intent) => ResolvedIntent {
                entity_symbol: Some(last),
                secondary_symbol: secondary,
                intent_category: intent,
                is_enforced: false,
                source: SymbolSource::Sticky,
            },
            _ => ResolvedIntent {
                intent_category: intent,
                ..ResolvedIntent::empty()
            },
        }
    }

    /// Analytic intent, an anaphoric cue word, or a short message.
    fn is_follow_up(&self, message: &str, intent: IntentCategory) -> bool {
        if intent.is_analytic() {
            return true;
        }
        let lower = message.to_lowercase();
        let has_cue = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .any(|w| CUE_WORDS.contains(&w));
        has_cue || message.trim().chars().count() < self.cfg.short_message_chars
    }

    /// Uppercase, drop exchange suffixes, reject placeholders and anything
    /// that does not look like a ticker.
    fn validate(&self, raw: &str) -> Option<String> {
        let upper = raw.trim().trim_start_matches('$').to_ascii_uppercase();
        let symbol = upper
            .strip_suffix(".NS")
            .or_else(|| upper.strip_suffix(".BO"))
            .unwrap_or(&upper);
        if symbol.is_empty() || self.invalid_tokens.contains(symbol) || !self.shape.is_match(symbol) {
            return None;
        }
        Some(symbol.to_string())
    }

    async fn classify(
        &self,
        message: &str,
        hint: Option<&str>,
        history: &[Turn],
    ) -> Result<ClassifierReply> {
        let binding = self
            .classifier
            .as_ref()
            .ok_or_else(|| Error::Config("no classifier model configured".into()))?;

        let prompt = self.classifier_prompt(message, hint, history);
        let req = ChatRequest {
            messages: vec![Message::user(prompt)],
            tools: Vec::new(),
            temperature: Some(0.1),
            max_tokens: Some(200),
            json_mode: true,
            model: binding.model.clone(),
        };
        let resp = binding.provider.chat(&req).await?;
        parse_reply(&resp.content)
    }

    fn classifier_prompt(&self, message: &str, hint: Option<&str>, history: &[Turn]) -> String {
        let window: String = recent_turns(history, self.cfg.classifier_history_turns)
            .iter()
            .map(|t| {
                let text = payload::strip(&t.text());
                format!(
                    "{}: {}\n",
                    t.role.label(),
                    truncate_chars(&text, self.cfg.classifier_turn_chars)
                )
            })
            .collect();

        format!(
            "You are a stock query parser. Analyze the user message and extract:\n\
             1. stock_symbol: the NSE ticker the user is asking about (e.g. \"RELIANCE\", \"TCS\").\n\
             \x20  If the user says \"it\" or \"this stock\", use the conversation to find the symbol.\n\
             \x20  If no stock is mentioned or implied, return null.\n\
             2. second_symbol: a second ticker when the user compares two stocks, else null.\n\
             3. intent: one of \"risk\", \"chart\", \"future\", \"sentiment\", \"analysis\", \
             \"comparison\", \"general\".\n\n\
             LAST DISCUSSED SYMBOL: {hint}\n\n\
             CONVERSATION HISTORY:\n{window}\n\
             USER MESSAGE: \"{message}\"\n\n\
             Respond ONLY with JSON: {{\"stock_symbol\": \"TICKER\" or null, \
             \"second_symbol\": \"TICKER\" or null, \"intent\": \"...\"}}",
            hint = hint.unwrap_or("none"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn resolver() -> EntityResolver {
        EntityResolver::new(None, &ResolverConfig::default()).unwrap()
    }

    #[test]
    fn fenced_replies_parse() {
        let r = parse_reply("```json\n{\"stock_symbol\": \"TCS\", \"intent\": \"risk\"}\n```").unwrap();
        assert_eq!(r.stock_symbol.as_deref(), Some("TCS"));
        let r = parse_reply("```{\"stock_symbol\": null}```").unwrap();
        assert!(r.stock_symbol.is_none());
        assert!(r.intent.is_none());
        let r = parse_reply("Sure: {\"symbol\": \"INFY\"}").unwrap();
        assert_eq!(r.stock_symbol.as_deref(), Some("INFY"));
        assert!(parse_reply("not json").is_err());
    }

    #[test]
    fn validation_rejects_placeholders_and_bad_shapes() {
        let r = resolver();
        assert_eq!(r.validate(" tcs "), Some("TCS".into()));
        assert_eq!(r.validate("RELIANCE.NS"), Some("RELIANCE".into()));
        assert_eq!(r.validate("M&M"), Some("M&M".into()));
        assert_eq!(r.validate("BAJAJ-AUTO"), Some("BAJAJ-AUTO".into()));
        assert_eq!(r.validate("TICKER"), None);
        assert_eq!(r.validate("none"), None);
        assert_eq!(r.validate("IT"), None);
        assert_eq!(r.validate("1ABC"), None);
        assert_eq!(r.validate("HDFC BANK"), None);
    }

    #[test]
    fn last_symbol_skips_stop_words_and_prefers_recent() {
        let now = Utc::now();
        let history = vec![
            Turn::user("Show me TCS risk", now),
            Turn::assistant("TCS has MODERATE RISK per THE data.", now),
            Turn::user("ok and WIPRO?", now),
            Turn::assistant("THE STOCK looks fine.", now),
        ];
        let r = resolver();
        assert_eq!(r.last_symbol(&history).as_deref(), Some("WIPRO"));
        assert_eq!(r.last_symbol(&history[..2]).as_deref(), Some("TCS"));
    }

    #[test]
    fn last_symbol_skips_metric_acronyms() {
        let now = Utc::now();
        let history = vec![
            Turn::user("compare margins for HDFC", now),
            Turn::assistant("NIM and CASA are strong; GST and NPA trends matter, YTD up.", now),
        ];
        assert_eq!(resolver().last_symbol(&history).as_deref(), Some("HDFC"));
    }

    #[test]
    fn last_symbol_ignores_payload_bodies_and_old_turns() {
        let now = Utc::now();
        let mut history = vec![Turn::user("Tell me about HDFC", now)];
        for _ in 0..10 {
            history.push(Turn::assistant("no tickers here", now));
        }
        let r = resolver();
        assert!(r.last_symbol(&history).is_none());

        let history = vec![
            Turn::user("and INFY", now),
            Turn::assistant(r#"[RISK:{"ticker":"ZZZZ","level":"LOW"}] done"#, now),
        ];
        assert_eq!(r.last_symbol(&history).as_deref(), Some("INFY"));
    }

    #[test]
    fn follow_up_tiers() {
        let r = resolver();
        assert!(r.is_follow_up("Give me a full breakdown of the sector", IntentCategory::Analysis));
        assert!(r.is_follow_up("Can you tell me why that happened there", IntentCategory::General));
        assert!(r.is_follow_up("and dividends?", IntentCategory::General));
        assert!(!r.is_follow_up("What is a good savings strategy overall", IntentCategory::General));
    }
}
