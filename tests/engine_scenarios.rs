//! End-to-end checks through the public engine API

use chrono::{TimeZone, Utc};
use guarddog::api::ScanContentRequest;
use guarddog::compliance::{ComplianceRule, RuleType, Transaction};
use guarddog::monitor::{InMemoryStatsStore, StatsStore};
use guarddog::patterns::{RiskTier, SensitiveCategory, ViolationType};
use guarddog::{CallEvent, Decision, Error, GuardDogConfig, GuardEngine};
use std::sync::Arc;

fn scan(engine: &GuardEngine, content: &str) -> guarddog::api::ScanContentResponse {
    engine.scan_content(&ScanContentRequest::new(content)).unwrap()
}

fn rate_rule() -> ComplianceRule {
    ComplianceRule::new("rate-limit", "Rate limit", RuleType::RateLimit)
        .with_config("threshold", 100)
}

#[test]
fn scenario_a_investment_directive_blocks() {
    let engine = GuardEngine::with_defaults();
    let resp = scan(
        &engine,
        "You should definitely invest in Tesla stock right now, guaranteed 50% return",
    );
    assert!(resp.is_violation);
    assert_eq!(resp.action, Decision::Block);
    assert_eq!(resp.violation_type, Some(ViolationType::FinancialAdvice));
    assert!(resp.modified_content.is_none());
    assert!(resp.confidence > 0.0);
}

#[test]
fn scenario_b_insider_claim_rewritten() {
    let engine = GuardEngine::with_defaults();
    let resp = scan(
        &engine,
        "Trust me, I have confidential insider data that Bitcoin hits $100k next week",
    );
    assert_eq!(resp.action, Decision::Rewrite);
    assert_eq!(resp.violation_type, Some(ViolationType::UnverifiedData));
    let rewritten = resp.modified_content.unwrap();
    assert!(!rewritten.contains("confidential insider"));
    assert!(rewritten.contains("[unverified claim removed]"));
}

#[test]
fn scenario_c_pii_classified_and_masked() {
    let engine = GuardEngine::with_defaults();
    let content = "SSN: 123-45-6789, Email: john@example.com";

    let findings = engine.classify(content).unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].category, SensitiveCategory::Ssn);
    assert_eq!(findings[0].risk_tier, RiskTier::High);
    assert_eq!(findings[1].category, SensitiveCategory::Email);
    assert_eq!(findings[1].risk_tier, RiskTier::Medium);
    for finding in &findings {
        assert!(!finding.redacted_snippet.contains("123-45-6789"));
        assert!(!finding.redacted_snippet.contains("john@example.com"));
    }

    let resp = scan(&engine, content);
    assert_eq!(resp.action, Decision::Rewrite);
    assert_eq!(resp.violation_type, Some(ViolationType::PiiExposure));
    let rewritten = resp.modified_content.unwrap();
    assert!(!rewritten.contains("123-45-6789"));
    assert!(!rewritten.contains("john@example.com"));
}

#[test]
fn scenario_d_prudent_advice_allowed() {
    let engine = GuardEngine::with_defaults();
    let resp = scan(&engine, "Diversify your portfolio and consult a financial advisor");
    assert!(!resp.is_violation);
    assert_eq!(resp.action, Decision::Allow);
    assert_eq!(resp.confidence, 0.0);
    assert!(resp.violation_type.is_none());
}

#[test]
fn scenario_e_rate_limit_threshold() {
    let engine = GuardEngine::with_defaults();
    let rules = vec![rate_rule()];

    let busy = CallEvent::new("openai", "/v1/chat").with_metadata("callsInWindow", 150);
    let resp = engine.monitor_call(&busy, &rules).unwrap();
    assert!(resp.triggered_rule_ids.contains("rate-limit"));
    assert_eq!(resp.alerts.len(), 1);
    assert_eq!(resp.alerts[0].rule_id(), Some("rate-limit"));

    let quiet = CallEvent::new("openai", "/v1/chat").with_metadata("callsInWindow", 50);
    let resp = engine.monitor_call(&quiet, &rules).unwrap();
    assert!(resp.triggered_rule_ids.is_empty());
    assert!(resp.alerts.is_empty());
}

#[test]
fn rewritten_content_rescans_clean() {
    let engine = GuardEngine::with_defaults();
    for content in [
        "Trust me, I have confidential insider data that Bitcoin hits $100k next week",
        "SSN: 123-45-6789, Email: john@example.com",
        "contact 123-45-6789@example.com for the file",
        "card 4111111111111111@mail.com",
        "Trust me, reach me at jane.doe@example.org or 555-123-4567",
    ] {
        let first = scan(&engine, content);
        let rewritten = first.modified_content.unwrap();
        let second = scan(&engine, &rewritten);
        assert_eq!(second.action, Decision::Allow, "rescan of {:?}", rewritten);
    }
}

#[test]
fn blocking_rule_dominates_rewrite() {
    let engine = GuardEngine::with_defaults();
    let rules = vec![ComplianceRule::new("big", "Big amounts", RuleType::Custom)
        .with_config("predicate", "high_value_transaction")
        .with_config("threshold", 10000)
        .with_config("action", "block")];
    let event = CallEvent::new("openai", "/v1/chat/completions")
        .with_response("Trust me, I have confidential insider data that Bitcoin hits $100k")
        .with_metadata("generative", true)
        .with_metadata("amount", 25000);

    let evaluation = engine.evaluate(&event, &rules).unwrap();
    assert_eq!(evaluation.verdict.decision, Decision::Block);
    assert_eq!(evaluation.verdict.confidence, 1.0);
    assert!(evaluation.verdict.rewritten_content.is_none());
    assert_eq!(evaluation.incidents.len(), 1);
    assert_eq!(evaluation.incidents[0].action, Decision::Block);
}

#[test]
fn disabled_rules_never_fire() {
    let engine = GuardEngine::with_defaults();
    let rules = vec![rate_rule().with_active(false)];
    let event = CallEvent::new("openai", "/v1/chat").with_metadata("callsInWindow", 500);
    let resp = engine.monitor_call(&event, &rules).unwrap();
    assert!(resp.triggered_rule_ids.is_empty());
    assert!(resp.alerts.is_empty());
    assert!(resp.diagnostics.is_empty());
}

#[test]
fn clean_content_has_no_findings() {
    let engine = GuardEngine::with_defaults();
    for content in [
        "",
        "The quarterly report is attached.",
        "Interest rates were unchanged this month.",
    ] {
        assert!(engine.classify(content).unwrap().is_empty(), "{:?}", content);
    }
}

#[test]
fn oversized_and_binary_input_rejected() {
    let mut config = GuardDogConfig::default();
    config.engine.max_content_bytes = 64;
    let engine = GuardEngine::new(config, Arc::new(InMemoryStatsStore::new())).unwrap();

    let big = "a".repeat(65);
    assert!(matches!(
        engine.scan_content(&ScanContentRequest::new(big.clone())),
        Err(Error::Input(_))
    ));

    let event = CallEvent::new("openai", "/v1/chat").with_request(big);
    assert!(matches!(engine.evaluate(&event, &[]), Err(Error::Input(_))));

    assert!(matches!(
        engine.scan_content(&ScanContentRequest::new("nul\0byte")),
        Err(Error::Input(_))
    ));
}

#[test]
fn stats_count_per_day() {
    let store = Arc::new(InMemoryStatsStore::new());
    let engine = GuardEngine::new(GuardDogConfig::default(), store.clone()).unwrap();
    let day = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();

    let clean = CallEvent::new("plaid", "/accounts").with_timestamp(day);
    let rewrite = CallEvent::new("openai", "/v1/chat")
        .with_timestamp(day)
        .with_response("Email me at john@example.com")
        .with_metadata("generative", true);
    let block = CallEvent::new("openai", "/v1/chat")
        .with_timestamp(day)
        .with_response("You should definitely buy now, guaranteed returns")
        .with_metadata("generative", true);

    for event in [&clean, &rewrite, &block] {
        engine.evaluate(event, &[]).unwrap();
    }

    let stats = store.snapshot(day.date_naive());
    assert_eq!(stats.scanned, 3);
    assert_eq!(stats.flagged, 2);
    assert_eq!(stats.blocked, 1);
    assert_eq!(engine.stats(day.date_naive()), stats);
}

#[test]
fn transaction_batch_checks() {
    let engine = GuardEngine::with_defaults();
    let transactions = vec![
        Transaction::new(50.0).with_id("t1"),
        Transaction::new(12500.0).with_id("t2"),
    ];
    let alerts = engine.scan_transactions(&transactions, "ledger");
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].source, "ledger");
}
