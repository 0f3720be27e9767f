//! `generate_future_timeline`: upcoming events plus analyst bull/bear
//! targets relative to the current price.

use pr_domain::payload::DisplayTag;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::data::EntitySnapshot;
use crate::result::ToolResult;

const MAX_EVENTS: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineArgs {
    pub ticker: String,
}

/// `{bull, bear}` strings from the analyst high/low targets. Either side
/// is omitted when its target or the current price is missing.
pub fn analyst_targets(snap: &EntitySnapshot) -> Map<String, Value> {
    let mut targets = Map::new();
    let Some(price) = snap.quote.price.filter(|p| *p > 0.0) else {
        return targets;
    };
    let f = &snap.fundamentals;

    if let Some(high) = f.target_high_price {
        let upside = (high - price) / price * 100.0;
        targets.insert(
            "bull".into(),
            Value::String(format!("{upside:+.1}% (Analyst High: ₹{high})")),
        );
    }
    if let Some(low) = f.target_low_price {
        let downside = (low - price) / price * 100.0;
        targets.insert(
            "bear".into(),
            Value::String(format!("{downside:.1}% (Analyst Low: ₹{low})")),
        );
    }
    targets
}

pub fn generate(args: &TimelineArgs, snapshot: Option<&EntitySnapshot>) -> ToolResult {
    let Some(snap) = snapshot else {
        return ToolResult::empty("Ticker data unavailable");
    };
    if snap.events.is_empty() {
        return ToolResult::empty("No upcoming events available");
    }

    let events: Vec<Value> = snap
        .events
        .iter()
        .take(MAX_EVENTS)
        .map(|e| json!({ "date": e.date, "title": e.title, "desc": e.desc }))
        .collect();

    let mut body = json!({ "ticker": args.ticker, "events": events });
    let targets = analyst_targets(snap);
    if !targets.is_empty() {
        body["targets"] = Value::Object(targets);
    }

    let listing = snap
        .events
        .iter()
        .take(MAX_EVENTS)
        .map(|e| format!("{}: {}", e.date, e.title))
        .collect::<Vec<_>>()
        .join("; ");

    ToolResult::display(
        DisplayTag::Timeline,
        &body,
        json!({
            "result": "Timeline displayed.",
            "events_count": events.len(),
            "events": listing,
            "targets": body.get("targets").cloned().unwrap_or(Value::Null),
        }),
    )
}
