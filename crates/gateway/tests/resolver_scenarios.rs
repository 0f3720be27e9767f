mod common;

use std::sync::Arc;

use chrono::Utc;
use pr_domain::config::ResolverConfig;
use pr_domain::intent::{IntentCategory, SymbolSource};
use pr_gateway::runtime::EntityResolver;
use pr_providers::scripted::ScriptedProvider;
use pr_sessions::Turn;

fn resolver(classifier: &Arc<ScriptedProvider>) -> EntityResolver {
    EntityResolver::new(Some(common::binding(classifier)), &ResolverConfig::default()).unwrap()
}

fn tcs_history() -> Vec<Turn> {
    let now = Utc::now();
    vec![
        Turn::user("Show me TCS risk", now),
        Turn::assistant(
            r#"[RISK:{"ticker":"TCS","score":0,"level":"LOW","factors":[]}] TCS looks defensive with a low beta."#,
            now,
        ),
    ]
}

#[tokio::test]
async fn anaphoric_follow_up_inherits_last_symbol() {
    let classifier = Arc::new(
        ScriptedProvider::new("cls").with_reply(r#"{"stock_symbol": null, "intent": "future"}"#),
    );
    let r = resolver(&classifier)
        .resolve("what about its future outlook", &tcs_history())
        .await;

    assert_eq!(r.entity_symbol.as_deref(), Some("TCS"));
    assert_eq!(r.intent_category, IntentCategory::Future);
    assert_eq!(r.source, SymbolSource::Sticky);
    assert!(!r.is_enforced);
}

#[tokio::test]
async fn metric_acronyms_in_answers_do_not_replace_the_entity() {
    let now = Utc::now();
    let history = vec![
        Turn::user("Show me TCS risk", now),
        Turn::assistant(
            "TCS risk is moderate; its EBITDA margin and 5Y CAGR remain healthy, ROCE near 50%.",
            now,
        ),
    ];
    let classifier = Arc::new(
        ScriptedProvider::new("cls").with_reply(r#"{"stock_symbol": null, "intent": "future"}"#),
    );
    let r = resolver(&classifier)
        .resolve("what about its future outlook", &history)
        .await;

    assert_eq!(r.entity_symbol.as_deref(), Some("TCS"));
    assert_eq!(r.source, SymbolSource::Sticky);
}

#[tokio::test]
async fn classifier_symbol_is_enforced_and_prompt_carries_hint() {
    let classifier = Arc::new(
        ScriptedProvider::new("cls")
            .with_reply("```json\n{\"stock_symbol\": \"infy.ns\", \"intent\": \"risk\"}\n```"),
    );
    let r = resolver(&classifier)
        .resolve("how risky is Infosys?", &tcs_history())
        .await;

    assert_eq!(r.entity_symbol.as_deref(), Some("INFY"));
    assert_eq!(r.source, SymbolSource::Classifier);
    assert!(r.is_enforced);

    let requests = classifier.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].json_mode);
    let prompt = requests[0].messages[0].content.text().unwrap_or_default().to_string();
    assert!(prompt.contains("LAST DISCUSSED SYMBOL: TCS"));
    assert!(prompt.contains("USER MESSAGE: \"how risky is Infosys?\""));
    assert!(!prompt.contains("[RISK:"), "payloads must not reach the classifier");
}

#[tokio::test]
async fn placeholder_symbol_without_follow_up_cues_resolves_to_nothing() {
    let classifier = Arc::new(
        ScriptedProvider::new("cls").with_reply(r#"{"stock_symbol": "TICKER", "intent": "general"}"#),
    );
    let r = resolver(&classifier)
        .resolve(
            "What is a sensible way to build an emergency fund first",
            &tcs_history(),
        )
        .await;

    assert_eq!(r.entity_symbol, None);
    assert_eq!(r.intent_category, IntentCategory::General);
    assert_eq!(r.source, SymbolSource::None);
}

#[tokio::test]
async fn short_message_sticks_even_for_general_intent() {
    let classifier = Arc::new(
        ScriptedProvider::new("cls").with_reply(r#"{"stock_symbol": null, "intent": "general"}"#),
    );
    let r = resolver(&classifier).resolve("and dividends?", &tcs_history()).await;
    assert_eq!(r.entity_symbol.as_deref(), Some("TCS"));
    assert_eq!(r.source, SymbolSource::Sticky);
}

#[tokio::test]
async fn classifier_failure_degrades_to_last_symbol() {
    let classifier = Arc::new(ScriptedProvider::new("cls").with_reply_error("timeout"));
    let r = resolver(&classifier).resolve("tell me everything", &tcs_history()).await;
    assert_eq!(r.entity_symbol.as_deref(), Some("TCS"));
    assert_eq!(r.intent_category, IntentCategory::Analysis);
    assert_eq!(r.source, SymbolSource::Degraded);

    let classifier = Arc::new(ScriptedProvider::new("cls").with_reply("I think it is TCS"));
    let r = resolver(&classifier).resolve("hello there", &[]).await;
    assert_eq!(r.entity_symbol, None);
    assert_eq!(r.intent_category, IntentCategory::General);
}

#[tokio::test]
async fn comparison_keeps_distinct_secondary_only() {
    let classifier = Arc::new(
        ScriptedProvider::new("cls")
            .with_reply(r#"{"stock_symbol": "tcs", "second_symbol": "INFY.BO", "intent": "compare"}"#)
            .with_reply(r#"{"stock_symbol": "TCS", "second_symbol": "TCS", "intent": "comparison"}"#),
    );
    let resolver = resolver(&classifier);

    let r = resolver.resolve("compare TCS and Infosys", &[]).await;
    assert_eq!(r.entity_symbol.as_deref(), Some("TCS"));
    assert_eq!(r.secondary_symbol.as_deref(), Some("INFY"));
    assert_eq!(r.intent_category, IntentCategory::Comparison);

    let r = resolver.resolve("compare TCS with itself", &[]).await;
    assert_eq!(r.secondary_symbol, None);
}

#[tokio::test]
async fn without_a_classifier_history_still_helps() {
    let r = EntityResolver::new(None, &ResolverConfig::default())
        .unwrap()
        .resolve("more on that", &tcs_history())
        .await;
    assert_eq!(r.entity_symbol.as_deref(), Some("TCS"));
    assert_eq!(r.source, SymbolSource::Degraded);
}
