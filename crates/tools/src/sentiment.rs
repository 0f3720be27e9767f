//! `generate_sentiment_analysis`: headline sentiment. A model-backed
//! [`HeadlineClassifier`] labels headlines when one is wired; the fixed
//! lexicon covers every headline it cannot.

use std::collections::{BTreeSet, HashSet};

use pr_domain::error::Result;
use pr_domain::payload::DisplayTag;
use serde::Deserialize;
use serde_json::json;

use crate::data::{EntitySnapshot, NewsItem};
use crate::result::ToolResult;

const MAX_HEADLINES: usize = 8;
const MAX_ARTICLES_SHOWN: usize = 5;
/// Headlines sharing this many leading characters are duplicates.
const DEDUP_PREFIX_CHARS: usize = 50;

const BULLISH: &[&str] = &[
    "beat", "beats", "bullish", "buy", "gain", "gains", "growth", "high", "jump", "jumps",
    "outperform", "profit", "rally", "record", "rise", "rises", "soar", "soars", "strong",
    "surge", "surges", "upgrade", "upgraded", "wins",
];

const BEARISH: &[&str] = &[
    "bearish", "crash", "cut", "cuts", "decline", "declines", "downgrade", "downgraded", "drop",
    "drops", "fall", "falls", "fraud", "loss", "losses", "low", "miss", "misses", "plunge",
    "plunges", "penalty", "sell", "slump", "weak",
];

#[derive(Debug, Clone, Deserialize)]
pub struct SentimentArgs {
    pub ticker: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Bullish,
    Bearish,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Bullish => "Bullish",
            Tone::Bearish => "Bearish",
            Tone::Neutral => "Neutral",
        }
    }
}

impl Tone {
    /// Case-insensitive `bullish`/`bearish`/`neutral`, with `positive` and
    /// `negative` accepted as synonyms.
    pub fn from_label(label: &str) -> Option<Tone> {
        match label.trim().to_ascii_lowercase().as_str() {
            "bullish" | "positive" => Some(Tone::Bullish),
            "bearish" | "negative" => Some(Tone::Bearish),
            "neutral" => Some(Tone::Neutral),
            _ => None,
        }
    }
}

/// Labels a batch of headlines, one [`Tone`] per title in order.
#[async_trait::async_trait]
pub trait HeadlineClassifier: Send + Sync {
    async fn classify(&self, titles: &[String]) -> Result<Vec<Tone>>;
}

/// Model labels when the classifier answers with one tone per title,
/// otherwise the lexicon for every title.
pub async fn classify_headlines(
    titles: &[String],
    classifier: Option<&dyn HeadlineClassifier>,
) -> Vec<Tone> {
    if let Some(classifier) = classifier {
        match classifier.classify(titles).await {
            Ok(tones) if tones.len() == titles.len() => return tones,
            Ok(tones) => tracing::debug!(
                expected = titles.len(),
                got = tones.len(),
                "headline labels misaligned, using lexicon"
            ),
            Err(e) => tracing::debug!(error = %e, "headline classification failed, using lexicon"),
        }
    }
    titles.iter().map(|t| classify_headline(t)).collect()
}

pub fn classify_headline(title: &str) -> Tone {
    let mut balance = 0i32;
    for word in title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let w = word.to_lowercase();
        if BULLISH.contains(&w.as_str()) {
            balance += 1;
        } else if BEARISH.contains(&w.as_str()) {
            balance -= 1;
        }
    }
    match balance {
        b if b > 0 => Tone::Bullish,
        b if b < 0 => Tone::Bearish,
        _ => Tone::Neutral,
    }
}

/// Drop headlines whose lowercase 50-char prefix was already seen; keep at
/// most eight.
pub fn dedup_headlines(news: &[NewsItem]) -> Vec<&NewsItem> {
    let mut seen = HashSet::new();
    news.iter()
        .filter(|n| {
            let key: String = n.title.to_lowercase().chars().take(DEDUP_PREFIX_CHARS).collect();
            seen.insert(key)
        })
        .take(MAX_HEADLINES)
        .collect()
}

/// 50 plus the bullish/bearish balance scaled to the 0..=100 range.
pub fn score(tones: &[Tone]) -> u8 {
    if tones.is_empty() {
        return 50;
    }
    let net: i32 = tones
        .iter()
        .map(|t| match t {
            Tone::Bullish => 1,
            Tone::Bearish => -1,
            Tone::Neutral => 0,
        })
        .sum();
    let scaled = 50.0 + 50.0 * net as f64 / tones.len() as f64;
    scaled.round().clamp(0.0, 100.0) as u8
}

pub fn overall(score: u8) -> Tone {
    match score {
        s if s >= 60 => Tone::Bullish,
        s if s <= 40 => Tone::Bearish,
        _ => Tone::Neutral,
    }
}

pub async fn generate(
    args: &SentimentArgs,
    snapshot: Option<&EntitySnapshot>,
    classifier: Option<&dyn HeadlineClassifier>,
) -> ToolResult {
    let headlines = snapshot.map(|s| dedup_headlines(&s.news)).unwrap_or_default();
    if headlines.is_empty() {
        return ToolResult::empty("No news found");
    }

    let titles: Vec<String> = headlines.iter().map(|n| n.title.clone()).collect();
    let tones = classify_headlines(&titles, classifier).await;
    let score = score(&tones);
    let overall = overall(score);
    let sources: BTreeSet<&str> = headlines.iter().map(|n| n.source.as_str()).collect();

    let articles: Vec<_> = headlines
        .iter()
        .zip(&tones)
        .take(MAX_ARTICLES_SHOWN)
        .map(|(n, t)| json!({ "title": n.title, "source": n.source, "sentiment": t.as_str() }))
        .collect();

    ToolResult::display(
        DisplayTag::Sentiment,
        &json!({
            "ticker": args.ticker,
            "overall": overall.as_str(),
            "score": score,
            "articles": articles,
            "sources": sources,
        }),
        json!({
            "result": "Sentiment Analysis displayed.",
            "overall": overall.as_str(),
            "score": score,
            "headlines": headlines.len(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_domain::error::Error;

    struct Fixed(Result<Vec<Tone>>);

    #[async_trait::async_trait]
    impl HeadlineClassifier for Fixed {
        async fn classify(&self, _titles: &[String]) -> Result<Vec<Tone>> {
            match &self.0 {
                Ok(t) => Ok(t.clone()),
                Err(e) => Err(Error::Other(e.to_string())),
            }
        }
    }

    fn news(title: &str, source: &str) -> NewsItem {
        NewsItem {
            title: title.into(),
            source: source.into(),
            url: None,
            published: None,
        }
    }

    #[test]
    fn headlines_are_classified_by_word() {
        assert_eq!(classify_headline("TCS shares surge on record profit"), Tone::Bullish);
        assert_eq!(classify_headline("Infosys slumps after guidance cut"), Tone::Bearish);
        assert_eq!(classify_headline("Board meeting scheduled"), Tone::Neutral);
        assert_eq!(classify_headline("Gains erased as stock falls"), Tone::Neutral);
    }

    #[test]
    fn duplicates_by_prefix_and_cap() {
        let mut items = vec![
            news("TCS wins a large deal in Europe", "A"),
            news("tcs WINS a large deal in Europe", "B"),
        ];
        for i in 0..10 {
            items.push(news(&format!("Story {i}"), "C"));
        }
        let kept = dedup_headlines(&items);
        assert_eq!(kept.len(), 8);
        assert_eq!(kept[0].source, "A");
        assert_eq!(kept[1].title, "Story 0");
    }

    #[test]
    fn score_and_overall_thresholds() {
        assert_eq!(score(&[Tone::Bullish, Tone::Neutral]), 75);
        assert_eq!(score(&[Tone::Bearish, Tone::Bearish]), 0);
        assert_eq!(score(&[Tone::Neutral]), 50);
        assert_eq!(overall(60), Tone::Bullish);
        assert_eq!(overall(40), Tone::Bearish);
        assert_eq!(overall(59), Tone::Neutral);
    }

    #[test]
    fn labels_parse_loosely() {
        assert_eq!(Tone::from_label(" BULLISH "), Some(Tone::Bullish));
        assert_eq!(Tone::from_label("negative"), Some(Tone::Bearish));
        assert_eq!(Tone::from_label("Neutral"), Some(Tone::Neutral));
        assert_eq!(Tone::from_label("mixed"), None);
    }

    #[tokio::test]
    async fn model_labels_win_when_aligned() {
        let titles = vec!["Board meeting scheduled".to_string(), "Shares surge".to_string()];
        let model = Fixed(Ok(vec![Tone::Bearish, Tone::Neutral]));
        assert_eq!(
            classify_headlines(&titles, Some(&model)).await,
            vec![Tone::Bearish, Tone::Neutral]
        );
    }

    #[tokio::test]
    async fn lexicon_covers_failed_or_misaligned_models() {
        let titles = vec!["Shares surge".to_string(), "Profit falls".to_string()];
        let lexicon = vec![Tone::Bullish, Tone::Bearish];

        let failing = Fixed(Err(Error::Other("timeout".into())));
        assert_eq!(classify_headlines(&titles, Some(&failing)).await, lexicon);

        let short = Fixed(Ok(vec![Tone::Neutral]));
        assert_eq!(classify_headlines(&titles, Some(&short)).await, lexicon);

        assert_eq!(classify_headlines(&titles, None).await, lexicon);
    }

    #[tokio::test]
    async fn no_news_means_no_payload() {
        let snap = EntitySnapshot {
            symbol: "TCS".into(),
            ..Default::default()
        };
        let args = SentimentArgs { ticker: "TCS".into() };
        assert!(!generate(&args, Some(&snap), None).await.has_payload());
        assert!(!generate(&args, None, None).await.has_payload());
    }

    #[tokio::test]
    async fn payload_lists_sources_once() {
        let snap = EntitySnapshot {
            symbol: "TCS".into(),
            news: vec![
                news("TCS shares surge", "Mint"),
                news("TCS upgrade by brokerage", "Mint"),
                news("Sector outlook", "ET"),
            ],
            ..Default::default()
        };
        let args = SentimentArgs { ticker: "TCS".into() };
        let r = generate(&args, Some(&snap), None).await;
        let body = pr_domain::payload::find_all(&r.display_payload).remove(0).body;
        assert_eq!(body["sources"], json!(["ET", "Mint"]));
        assert_eq!(body["overall"], "Bullish");
        assert_eq!(body["score"], 83);

        let model = Fixed(Ok(vec![Tone::Bearish, Tone::Bearish, Tone::Neutral]));
        let r = generate(&args, Some(&snap), Some(&model)).await;
        let body = pr_domain::payload::find_all(&r.display_payload).remove(0).body;
        assert_eq!(body["overall"], "Bearish");
        assert_eq!(body["articles"][0]["sentiment"], "Bearish");
    }
}
