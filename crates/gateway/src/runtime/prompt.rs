//! System framing for one chat request.

use chrono::NaiveDate;

use pr_domain::intent::IntentCategory;
use pr_sessions::Snapshot;

const PERSONA: &str = "\
You are Prysm, an elite financial research assistant used by professional investors.
Your goal is to provide deep, accurate and data-backed analysis of Indian stocks.

### GUIDELINES:
1. COPY VALUES EXACTLY: use the formatted values from the context (e.g. \"₹5632.99 Cr\"). Do not recalculate or reformat numbers.
2. Explain why numbers matter instead of listing them.
3. Combine price action, financial ratios and shareholding patterns in your answer.
4. Write in a crisp, confident, financial-journalist style.
5. The context contains real-time data. Trust it. If data is missing, say so.

### TOOLS:
- Prefer a visual over prose for trends and comparisons. Analyze the company, do not describe the chart.
- Never invent chart data in text. Call the tool.
- Do not generate the same chart (same ticker and metric) twice in one answer.";

const GENERAL_ADVISOR: &str = "\
You are Prysm, an expert financial advisor.
The user is asking a general question about trading, investing or market concepts.
You have no specific stock data for this query, so rely on your own knowledge.
Be educational and strategic. If the user implies a specific stock without naming it, ask them to clarify.";

/// How strongly the active entity should steer the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    /// The user asked about this entity; answer about it.
    Enforced,
    /// Carried over from earlier turns; use it only if the message is about it.
    Contextual,
}

/// The entity the request is framed around.
pub struct EntityFrame<'a> {
    pub symbol: &'a str,
    pub stance: Stance,
    pub report: &'a str,
    pub secondary: Option<&'a str>,
}

pub struct PromptInputs<'a> {
    pub entity: Option<EntityFrame<'a>>,
    pub intent: IntentCategory,
    pub snapshots: &'a [Snapshot],
    pub profile: Option<&'a str>,
    pub today: NaiveDate,
}

fn tool_hint(intent: IntentCategory, symbol: &str, secondary: Option<&str>) -> Option<String> {
    let hint = match intent {
        IntentCategory::Risk => format!("Call `generate_risk_gauge` for {symbol}."),
        IntentCategory::Future => format!("Call `generate_future_timeline` for {symbol}."),
        IntentCategory::Sentiment => format!("Call `generate_sentiment_analysis` for {symbol}."),
        IntentCategory::Chart => format!("Call `generate_chart` for {symbol}."),
        IntentCategory::Comparison => match secondary {
            Some(other) => format!("Call `compare_stocks` with ticker1={symbol} and ticker2={other}."),
            None => return None,
        },
        IntentCategory::Analysis | IntentCategory::General => return None,
    };
    Some(format!("The user's intent is {intent}. {hint}"))
}

/// Compose the system message.
pub fn build_system_prompt(inputs: &PromptInputs<'_>) -> String {
    let mut sections: Vec<String> = Vec::new();

    match &inputs.entity {
        Some(entity) => {
            sections.push(PERSONA.to_string());

            let framing = match entity.stance {
                Stance::Enforced => format!(
                    "### ACTIVE ENTITY: {0}\nThe user is asking about {0}. Answer about {0} \
                     using the context below.",
                    entity.symbol
                ),
                Stance::Contextual => format!(
                    "### CONTEXT ENTITY: {0}\nThe conversation has been about {0}. Use it only \
                     if the message refers to it; otherwise answer the question as asked.",
                    entity.symbol
                ),
            };
            sections.push(framing);

            if let Some(other) = entity.secondary {
                sections.push(format!(
                    "The user is comparing {} with {other}.",
                    entity.symbol
                ));
            }
            if let Some(hint) = tool_hint(inputs.intent, entity.symbol, entity.secondary) {
                sections.push(hint);
            }

            sections.push(format!(
                "CONTEXT:\n{}\n\n--- INSTRUCTION ---\nUse this full dataset to answer. \
                 If a value is N/A, say it is unavailable and analyze the rest.",
                entity.report
            ));
        }
        None => sections.push(GENERAL_ADVISOR.to_string()),
    }

    if !inputs.snapshots.is_empty() {
        let earlier: Vec<String> = inputs
            .snapshots
            .iter()
            .map(|s| format!("[{}] {}", s.date, s.summary))
            .collect();
        sections.push(format!("### EARLIER IN THIS CONVERSATION:\n{}", earlier.join("\n")));
    }

    if let Some(profile) = inputs.profile.map(str::trim).filter(|p| !p.is_empty()) {
        sections.push(format!(
            "### INVESTOR PROFILE:\n{profile}\nTailor suitability remarks to this profile."
        ));
    }

    sections.push(format!("Today's date: {}", inputs.today.format("%Y-%m-%d")));
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
    }

    #[test]
    fn enforced_and_contextual_framing_differ() {
        let mut inputs = PromptInputs {
            entity: Some(EntityFrame {
                symbol: "TCS",
                stance: Stance::Enforced,
                report: "=== MASTER REPORT: TCS ===",
                secondary: None,
            }),
            intent: IntentCategory::Risk,
            snapshots: &[],
            profile: None,
            today: today(),
        };
        let p = build_system_prompt(&inputs);
        assert!(p.contains("### ACTIVE ENTITY: TCS"));
        assert!(p.contains("generate_risk_gauge"));
        assert!(p.contains("=== MASTER REPORT: TCS ==="));
        assert!(p.ends_with("Today's date: 2024-03-02"));

        if let Some(e) = inputs.entity.as_mut() {
            e.stance = Stance::Contextual;
        }
        let p = build_system_prompt(&inputs);
        assert!(p.contains("### CONTEXT ENTITY: TCS"));
        assert!(!p.contains("ACTIVE ENTITY"));
    }

    #[test]
    fn comparison_names_both_tickers() {
        let inputs = PromptInputs {
            entity: Some(EntityFrame {
                symbol: "TCS",
                stance: Stance::Enforced,
                report: "",
                secondary: Some("INFY"),
            }),
            intent: IntentCategory::Comparison,
            snapshots: &[],
            profile: None,
            today: today(),
        };
        let p = build_system_prompt(&inputs);
        assert!(p.contains("comparing TCS with INFY"));
        assert!(p.contains("ticker1=TCS and ticker2=INFY"));
    }

    #[test]
    fn general_prompt_carries_snapshots_and_profile() {
        let snaps = vec![Snapshot {
            date: "2024-03-01".into(),
            summary: "Discussed TCS valuation.".into(),
            message_count: 4,
            created_at: Utc::now(),
        }];
        let inputs = PromptInputs {
            entity: None,
            intent: IntentCategory::General,
            snapshots: &snaps,
            profile: Some("  Conservative, 10-year horizon "),
            today: today(),
        };
        let p = build_system_prompt(&inputs);
        assert!(p.starts_with("You are Prysm, an expert financial advisor."));
        assert!(p.contains("[2024-03-01] Discussed TCS valuation."));
        assert!(p.contains("### INVESTOR PROFILE:\nConservative, 10-year horizon\n"));
    }
}
