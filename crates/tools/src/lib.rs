//! Analysis tools exposed to the model: a closed set of [`ToolKind`]s, each
//! turning JSON arguments into a [`ToolResult`] backed by entity data.

pub mod chart;
pub mod compare;
pub mod data;
pub mod knowledge;
pub mod report;
pub mod result;
pub mod risk;
pub mod sentiment;
pub mod timeline;

use std::sync::Arc;
use std::time::Instant;

use pr_domain::tool::ToolDefinition;
use pr_domain::trace::TraceEvent;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub use data::{EntityDataProvider, EntitySnapshot};
pub use knowledge::KnowledgeBase;
pub use result::ToolResult;
pub use sentiment::HeadlineClassifier;

/// Collaborators every tool may read from. Built once per process.
#[derive(Clone)]
pub struct ToolContext {
    pub data: Arc<dyn EntityDataProvider>,
    pub knowledge: KnowledgeBase,
    /// Model labelling for sentiment headlines; the lexicon alone when absent.
    pub headlines: Option<Arc<dyn HeadlineClassifier>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool kinds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Chart,
    RiskGauge,
    Timeline,
    Sentiment,
    Compare,
    Knowledge,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Chart,
        ToolKind::RiskGauge,
        ToolKind::Timeline,
        ToolKind::Sentiment,
        ToolKind::Compare,
        ToolKind::Knowledge,
    ];

    /// The name the model calls the tool by.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Chart => "generate_chart",
            ToolKind::RiskGauge => "generate_risk_gauge",
            ToolKind::Timeline => "generate_future_timeline",
            ToolKind::Sentiment => "generate_sentiment_analysis",
            ToolKind::Compare => "compare_stocks",
            ToolKind::Knowledge => "consult_knowledge_base",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn definition(&self) -> ToolDefinition {
        let ticker = json!({ "type": "string", "description": "Stock symbol (e.g. INFY)" });
        let (description, parameters) = match self {
            ToolKind::Chart => (
                "Generate a visual chart for a stock. Use chart_type line/candlestick/area for price, \
                 bar with metric valuation or profitability, pie/doughnut with metric shareholding.",
                json!({
                    "type": "object",
                    "properties": {
                        "ticker": ticker,
                        "chart_type": {
                            "type": "string",
                            "enum": ["line", "candlestick", "area", "bar", "horizontal_bar", "pie", "doughnut"]
                        },
                        "metric": {
                            "type": "string",
                            "description": "price, valuation, profitability or shareholding"
                        },
                        "title": { "type": "string", "description": "Optional chart title" }
                    },
                    "required": ["ticker", "chart_type", "metric"]
                }),
            ),
            ToolKind::RiskGauge => (
                "Show a risk gauge (0-100) for a stock based on beta, margins and leverage.",
                json!({ "type": "object", "properties": { "ticker": ticker }, "required": ["ticker"] }),
            ),
            ToolKind::Timeline => (
                "Show upcoming events and analyst bull/bear targets for a stock.",
                json!({ "type": "object", "properties": { "ticker": ticker }, "required": ["ticker"] }),
            ),
            ToolKind::Sentiment => (
                "Analyze recent news headline sentiment for a stock.",
                json!({ "type": "object", "properties": { "ticker": ticker }, "required": ["ticker"] }),
            ),
            ToolKind::Compare => (
                "Compare two stocks side by side on price, valuation, returns and leverage.",
                json!({
                    "type": "object",
                    "properties": {
                        "ticker1": { "type": "string", "description": "First stock symbol (e.g. TCS)" },
                        "ticker2": { "type": "string", "description": "Second stock symbol (e.g. INFY)" }
                    },
                    "required": ["ticker1", "ticker2"]
                }),
            ),
            ToolKind::Knowledge => (
                "Search the user's uploaded documents (reports, filings) for relevant excerpts.",
                json!({
                    "type": "object",
                    "properties": { "query": { "type": "string", "description": "What to look for" } },
                    "required": ["query"]
                }),
            ),
        };
        ToolDefinition {
            name: self.name().into(),
            description: description.into(),
            parameters,
        }
    }

    /// Definitions for every tool, in a stable order.
    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL.iter().map(ToolKind::definition).collect()
    }

    /// Run the tool. Never fails: bad arguments and missing data both come
    /// back as an empty result whose `result` says why.
    pub async fn execute(&self, args: &Value, ctx: &ToolContext) -> ToolResult {
        let started = Instant::now();
        let (result, symbol) = self.dispatch(args, ctx).await;

        TraceEvent::ToolExecuted {
            tool: self.name().into(),
            symbol,
            has_payload: result.has_payload(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
        result
    }

    async fn dispatch(&self, args: &Value, ctx: &ToolContext) -> (ToolResult, Option<String>) {
        match self {
            ToolKind::Chart => {
                let mut a: chart::ChartArgs = match parse(self, args) {
                    Ok(a) => a,
                    Err(r) => return (r, None),
                };
                a.ticker = data::symbol_key(&a.ticker);
                let snap = ctx.data.snapshot(&a.ticker).await;
                (chart::generate(&a, snap.as_deref()), Some(a.ticker))
            }
            ToolKind::RiskGauge => {
                let mut a: risk::RiskArgs = match parse(self, args) {
                    Ok(a) => a,
                    Err(r) => return (r, None),
                };
                a.ticker = data::symbol_key(&a.ticker);
                let snap = ctx.data.snapshot(&a.ticker).await;
                (risk::generate(&a, snap.as_deref()), Some(a.ticker))
            }
            ToolKind::Timeline => {
                let mut a: timeline::TimelineArgs = match parse(self, args) {
                    Ok(a) => a,
                    Err(r) => return (r, None),
                };
                a.ticker = data::symbol_key(&a.ticker);
                let snap = ctx.data.snapshot(&a.ticker).await;
                (timeline::generate(&a, snap.as_deref()), Some(a.ticker))
            }
            ToolKind::Sentiment => {
                let mut a: sentiment::SentimentArgs = match parse(self, args) {
                    Ok(a) => a,
                    Err(r) => return (r, None),
                };
                a.ticker = data::symbol_key(&a.ticker);
                let snap = ctx.data.snapshot(&a.ticker).await;
                (
                    sentiment::generate(&a, snap.as_deref(), ctx.headlines.as_deref()).await,
                    Some(a.ticker),
                )
            }
            ToolKind::Compare => {
                let mut a: compare::CompareArgs = match parse(self, args) {
                    Ok(a) => a,
                    Err(r) => return (r, None),
                };
                a.ticker1 = data::symbol_key(&a.ticker1);
                a.ticker2 = data::symbol_key(&a.ticker2);
                let first = ctx.data.snapshot(&a.ticker1).await;
                let second = ctx.data.snapshot(&a.ticker2).await;
                (
                    compare::generate(&a, first.as_deref(), second.as_deref()),
                    Some(format!("{},{}", a.ticker1, a.ticker2)),
                )
            }
            ToolKind::Knowledge => {
                let a: knowledge::KnowledgeArgs = match parse(self, args) {
                    Ok(a) => a,
                    Err(r) => return (r, None),
                };
                (knowledge::consult(&a, &ctx.knowledge).await, None)
            }
        }
    }
}

fn parse<T: DeserializeOwned>(kind: &ToolKind, args: &Value) -> Result<T, ToolResult> {
    serde_json::from_value(args.clone()).map_err(|e| {
        tracing::debug!(tool = kind.name(), error = %e, "invalid tool arguments");
        ToolResult::empty(format!("Invalid arguments for {}: {e}", kind.name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Fundamentals, StaticDataProvider};
    use pr_domain::config::KnowledgeConfig;

    fn ctx() -> ToolContext {
        let data = StaticDataProvider::new().with(EntitySnapshot {
            symbol: "TCS".into(),
            fundamentals: Fundamentals {
                beta: Some(1.3),
                ..Default::default()
            },
            ..Default::default()
        });
        ToolContext {
            data: Arc::new(data),
            knowledge: KnowledgeBase::new(&KnowledgeConfig::default()),
            headlines: None,
        }
    }

    #[test]
    fn names_round_trip_and_definitions_are_complete() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("exec"), None);

        let defs = ToolKind::definitions();
        assert_eq!(defs.len(), 6);
        assert!(defs.iter().all(|d| d.parameters["required"].is_array()));
    }

    #[tokio::test]
    async fn lowercase_ticker_is_normalized() {
        let r = ToolKind::RiskGauge
            .execute(&json!({ "ticker": "tcs" }), &ctx())
            .await;
        assert!(r.display_payload.starts_with("[RISK:"));
        assert!(r.display_payload.contains(r#""ticker":"TCS""#));
    }

    #[tokio::test]
    async fn bad_arguments_become_an_empty_result() {
        let r = ToolKind::Compare
            .execute(&json!({ "ticker1": "TCS" }), &ctx())
            .await;
        assert!(!r.has_payload());
        assert!(r.result_text().starts_with("Invalid arguments for compare_stocks"));
    }

    #[tokio::test]
    async fn unknown_symbol_is_empty_not_an_error() {
        let r = ToolKind::Sentiment
            .execute(&json!({ "ticker": "ZZZ" }), &ctx())
            .await;
        assert!(!r.has_payload());
        assert_eq!(r.result_text(), "No news found");
    }
}
