//! `generate_chart`: price, valuation, profitability and shareholding
//! charts rendered client-side from a `{type, title, data}` payload.

use std::collections::BTreeMap;

use pr_domain::payload::DisplayTag;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::data::EntitySnapshot;
use crate::result::ToolResult;

/// Bars shown by the daily price charts.
const DAILY_BARS: usize = 30;
/// Months shown by the area chart.
const MONTHS: usize = 12;

#[derive(Debug, Clone, Deserialize)]
pub struct ChartArgs {
    pub ticker: String,
    pub chart_type: String,
    #[serde(default = "d_metric")]
    pub metric: String,
    #[serde(default)]
    pub title: Option<String>,
}

fn d_metric() -> String {
    "price".into()
}

pub fn generate(args: &ChartArgs, snapshot: Option<&EntitySnapshot>) -> ToolResult {
    let Some(snap) = snapshot else {
        return ToolResult::empty(format!("No data found for {}", args.ticker));
    };
    let chart_type = args.chart_type.trim().to_ascii_lowercase();
    let metric = args.metric.trim().to_ascii_lowercase();

    let data = match chart_type.as_str() {
        "line" | "candlestick" | "area" => price_series(&chart_type, snap),
        "bar" | "horizontal_bar" => match metric.as_str() {
            "valuation" => valuation_bars(snap),
            "profitability" => profitability_bars(snap),
            _ => return ToolResult::empty(format!("Metric {metric} not supported")),
        },
        "pie" | "doughnut" => match metric.as_str() {
            "shareholding" => shareholding_slices(snap),
            _ => {
                return ToolResult::empty(format!(
                    "Pie chart for {metric} not supported (try 'shareholding')"
                ))
            }
        },
        _ => return ToolResult::empty(format!("Chart type {chart_type} not supported")),
    };

    let Some(data) = data else {
        return ToolResult::empty(format!("{metric} data unavailable for {}", snap.symbol));
    };

    let title = args
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("{} Chart for {}", args.metric, snap.symbol));

    ToolResult::display(
        DisplayTag::Chart,
        &json!({ "type": chart_type, "title": title, "data": data }),
        json!({
            "result": "Chart displayed.",
            "summary": format!("Chart {title} showed {metric} data for {}.", snap.symbol),
        }),
    )
}

fn price_series(chart_type: &str, snap: &EntitySnapshot) -> Option<Value> {
    let bars = &snap.price_history;
    if bars.is_empty() {
        return None;
    }
    let recent = &bars[bars.len().saturating_sub(DAILY_BARS)..];

    let data = match chart_type {
        "candlestick" => json!({
            "labels": recent.iter().map(|b| b.date.format("%Y-%m-%d").to_string()).collect::<Vec<_>>(),
            "datasets": [{
                "label": format!("{} OHLC", snap.symbol),
                "data": recent.iter().map(|b| [b.open, b.high, b.low, b.close]).collect::<Vec<_>>(),
            }],
        }),
        "area" => {
            // Last close of each calendar month.
            let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
            for b in bars {
                monthly.insert(b.date.format("%Y-%m").to_string(), b.close);
            }
            let skip = monthly.len().saturating_sub(MONTHS);
            let (labels, closes): (Vec<String>, Vec<f64>) = monthly.into_iter().skip(skip).unzip();
            json!({
                "labels": labels,
                "datasets": [{ "label": format!("{} Price", snap.symbol), "fill": true, "data": closes }],
            })
        }
        _ => json!({
            "labels": recent.iter().map(|b| b.date.format("%Y-%m-%d").to_string()).collect::<Vec<_>>(),
            "datasets": [{ "label": "Price", "data": recent.iter().map(|b| b.close).collect::<Vec<_>>() }],
        }),
    };
    Some(data)
}

fn bars(label: &str, rows: &[(&str, Option<f64>)]) -> Option<Value> {
    if rows.iter().all(|(_, v)| v.is_none()) {
        return None;
    }
    Some(json!({
        "labels": rows.iter().map(|(l, _)| *l).collect::<Vec<_>>(),
        "datasets": [{ "label": label, "data": rows.iter().map(|(_, v)| v.unwrap_or(0.0)).collect::<Vec<_>>() }],
    }))
}

fn valuation_bars(snap: &EntitySnapshot) -> Option<Value> {
    let f = &snap.fundamentals;
    bars(
        "Valuation",
        &[
            ("P/E", f.trailing_pe),
            ("P/B", f.price_to_book),
            ("P/S", f.price_to_sales),
        ],
    )
}

fn profitability_bars(snap: &EntitySnapshot) -> Option<Value> {
    let f = &snap.fundamentals;
    bars(
        "Margins %",
        &[
            ("Gross Margin", f.gross_margin),
            ("Net Margin", f.net_margin),
            ("ROE", f.return_on_equity),
        ],
    )
}

fn shareholding_slices(snap: &EntitySnapshot) -> Option<Value> {
    let sh = snap.shareholding.as_ref().filter(|s| !s.is_empty())?;
    Some(json!({
        "labels": ["Promoters", "FII", "DII", "Public"],
        "datasets": [{
            "label": "Shareholding Pattern",
            "data": [
                sh.promoters.unwrap_or(0.0),
                sh.fii.unwrap_or(0.0),
                sh.dii.unwrap_or(0.0),
                sh.public.unwrap_or(0.0),
            ],
        }],
    }))
}
