//! `compare_stocks`: two snapshots side by side on a fixed metric list.

use pr_domain::payload::DisplayTag;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::data::EntitySnapshot;
use crate::result::ToolResult;

#[derive(Debug, Clone, Deserialize)]
pub struct CompareArgs {
    pub ticker1: String,
    pub ticker2: String,
}

type Metric = (&'static str, fn(&EntitySnapshot) -> Option<f64>);

const METRICS: &[Metric] = &[
    ("Price", |s: &EntitySnapshot| s.quote.price),
    ("Market Cap", |s: &EntitySnapshot| s.fundamentals.market_cap),
    ("P/E Ratio", |s: &EntitySnapshot| s.fundamentals.trailing_pe),
    ("P/B Ratio", |s: &EntitySnapshot| s.fundamentals.price_to_book),
    ("ROE %", |s: &EntitySnapshot| s.fundamentals.return_on_equity),
    ("Net Margin %", |s: &EntitySnapshot| s.fundamentals.net_margin),
    ("Rev Growth %", |s: &EntitySnapshot| s.fundamentals.revenue_growth),
    ("Debt/Eq", |s: &EntitySnapshot| s.fundamentals.debt_to_equity),
];

fn cell(v: Option<f64>) -> Value {
    v.map(Value::from).unwrap_or_else(|| Value::String("N/A".into()))
}

/// One row per metric: `{metric, <ticker1>: v1, <ticker2>: v2}`.
pub fn comparison_rows(
    t1: &str,
    s1: &EntitySnapshot,
    t2: &str,
    s2: &EntitySnapshot,
) -> Vec<Value> {
    METRICS
        .iter()
        .map(|(label, get)| {
            let mut row = Map::new();
            row.insert("metric".into(), Value::String((*label).into()));
            row.insert(t1.into(), cell(get(s1)));
            row.insert(t2.into(), cell(get(s2)));
            Value::Object(row)
        })
        .collect()
}

pub fn generate(
    args: &CompareArgs,
    first: Option<&EntitySnapshot>,
    second: Option<&EntitySnapshot>,
) -> ToolResult {
    let (Some(s1), Some(s2)) = (first, second) else {
        return ToolResult::empty(format!(
            "Data unavailable for one or more tickers ({}, {})",
            args.ticker1, args.ticker2
        ));
    };

    let rows = comparison_rows(&args.ticker1, s1, &args.ticker2, s2);
    ToolResult::display(
        DisplayTag::Comparison,
        &json!({ "ticker1": args.ticker1, "ticker2": args.ticker2, "data": rows }),
        json!({
            "result": format!("Comparison between {} and {} displayed.", args.ticker1, args.ticker2),
            "data": rows,
        }),
    )
}
