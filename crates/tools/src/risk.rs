//! `generate_risk_gauge`: a 0-100 speedometer score from beta, margins and
//! leverage.

use pr_domain::payload::DisplayTag;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::data::EntitySnapshot;
use crate::result::ToolResult;

#[derive(Debug, Clone, Deserialize)]
pub struct RiskArgs {
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: &'static str,
    pub factors: Vec<String>,
}

/// Score a snapshot. Requires beta; without it there is no assessment.
pub fn assess(snap: &EntitySnapshot) -> Option<RiskAssessment> {
    let f = &snap.fundamentals;
    let beta = f.beta?;

    let mut score: i32 = 0;
    let mut factors = Vec::new();

    if beta > 1.5 {
        score += 40;
        factors.push(format!("Very High Beta ({beta:.2})"));
    } else if beta > 1.2 {
        score += 25;
        factors.push(format!("High Beta ({beta:.2})"));
    } else if beta < 0.8 {
        score -= 10;
        factors.push(format!("Low Volatility (Beta: {beta:.2})"));
    }

    if f.net_margin.is_some_and(|m| m < 0.0) {
        score += 30;
        factors.push("Negative Net Margins".into());
    }

    if let Some(de) = f.debt_to_equity.filter(|de| *de > 2.0) {
        score += 20;
        factors.push(format!("High Debt (D/E: {de:.2})"));
    }

    let score = score.clamp(0, 100) as u8;
    let level = match score {
        s if s > 70 => "High",
        s if s > 40 => "Moderate",
        _ => "Low",
    };
    if factors.is_empty() {
        factors.push("Standard risk profile".into());
    }

    Some(RiskAssessment {
        score,
        level,
        factors,
    })
}

pub fn generate(args: &RiskArgs, snapshot: Option<&EntitySnapshot>) -> ToolResult {
    let Some(snap) = snapshot else {
        return ToolResult::empty("No data");
    };
    let Some(risk) = assess(snap) else {
        return ToolResult::empty("Risk data unavailable (no beta)");
    };

    ToolResult::display(
        DisplayTag::Risk,
        &json!({
            "ticker": args.ticker,
            "score": risk.score,
            "level": risk.level,
            "factors": risk.factors,
        }),
        json!({
            "result": "Risk Gauge displayed.",
            "risk_score": risk.score,
            "risk_level": risk.level,
            "factors": risk.factors,
        }),
    )
}
