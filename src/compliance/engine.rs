//! Rule engine
//!
//! Evaluates the caller's active rule set against one call event and the
//! classifier's findings. Rules are independent: a malformed or
//! under-specified rule is skipped with a diagnostic and never stops the
//! others from running.

use super::rules::{
    ComplianceRule, ConsentConfig, CustomPredicate, ParsedRule, PiiDetectionConfig, RuleAction,
    RuleKind,
};
use crate::privacy::{dedupe_findings, SensitiveFinding};
use crate::types::{value_as_f64, AlertRecord, CallEvent, Diagnostic, RecordOrigin};
use chrono::Timelike;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Result of evaluating a rule set
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluation {
    pub triggered_rule_ids: BTreeSet<String>,
    pub alerts: Vec<AlertRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Triggered rules configured with `action = block`
    pub blocking_rule_ids: BTreeSet<String>,
}

impl RuleEvaluation {
    pub fn requires_block(&self) -> bool {
        !self.blocking_rule_ids.is_empty()
    }
}

/// Outcome of a single rule check
enum Outcome {
    Fired { reason: String, details: Map<String, Value> },
    Quiet,
    Missing(String),
}

impl Outcome {
    fn fired(reason: impl Into<String>) -> Self {
        Self::Fired {
            reason: reason.into(),
            details: Map::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Self::Fired { details, .. } = &mut self {
            details.insert(key.to_string(), value.into());
        }
        self
    }
}

/// Stateless evaluator over caller-owned rules
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every active rule against `event` and `findings`
    pub fn evaluate(
        &self,
        event: &CallEvent,
        findings: &[SensitiveFinding],
        rules: &[ComplianceRule],
    ) -> RuleEvaluation {
        let mut result = RuleEvaluation::default();

        for rule in rules.iter().filter(|r| r.is_active) {
            let parsed = match ParsedRule::parse(rule) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(rule_id = %rule.id, error = %e, "Skipping malformed rule");
                    result.diagnostics.push(Diagnostic::from_error(&rule.id, &e));
                    continue;
                }
            };

            match check(&parsed.kind, event, findings) {
                Outcome::Fired { reason, details } => {
                    tracing::debug!(
                        rule_id = %rule.id,
                        rule_type = %rule.rule_type,
                        action = ?parsed.action,
                        "Rule fired"
                    );
                    let mut alert = AlertRecord::new(
                        parsed.severity,
                        &event.source,
                        RecordOrigin::Rule {
                            rule_id: rule.id.clone(),
                            rule_type: rule.rule_type,
                        },
                        format!("{}: {}", rule.name, reason),
                    )
                    .at(event.timestamp)
                    .detail("endpoint", event.endpoint.clone());
                    alert.details.extend(details);

                    if parsed.action == RuleAction::Block {
                        result.blocking_rule_ids.insert(rule.id.clone());
                    }
                    result.triggered_rule_ids.insert(rule.id.clone());
                    result.alerts.push(alert);
                }
                Outcome::Quiet => {
                    tracing::debug!(rule_id = %rule.id, "Rule did not fire");
                }
                Outcome::Missing(key) => {
                    tracing::debug!(rule_id = %rule.id, key = %key, "Rule input missing");
                    result.diagnostics.push(Diagnostic::missing_input(
                        &rule.id,
                        format!("metadata '{}' is required by this rule", key),
                    ));
                }
            }
        }

        result
    }
}

fn check(kind: &RuleKind, event: &CallEvent, findings: &[SensitiveFinding]) -> Outcome {
    match kind {
        RuleKind::RateLimit(cfg) => match event.metadata_f64("callsInWindow") {
            None => Outcome::Missing("callsInWindow".to_string()),
            Some(calls) if calls > cfg.threshold => {
                Outcome::fired(format!("{} calls in window exceeds {}", calls, cfg.threshold))
                    .with_detail("callsInWindow", calls)
                    .with_detail("threshold", cfg.threshold)
            }
            Some(_) => Outcome::Quiet,
        },
        RuleKind::PiiDetection(cfg) => check_pii(cfg, findings),
        RuleKind::ConsentType(cfg) => check_consent(cfg, event, findings),
        RuleKind::Custom(predicate) => check_predicate(predicate, event),
    }
}

fn check_pii(cfg: &PiiDetectionConfig, findings: &[SensitiveFinding]) -> Outcome {
    let watched: Vec<SensitiveFinding> = findings
        .iter()
        .filter(|f| cfg.watched_tiers.contains(&f.risk_tier))
        .cloned()
        .collect();
    let count = if cfg.dedupe {
        dedupe_findings(&watched).len()
    } else {
        watched.len()
    };
    if count == 0 {
        return Outcome::Quiet;
    }

    let categories: BTreeSet<String> = watched.iter().map(|f| f.category.to_string()).collect();
    Outcome::fired(format!("{} sensitive finding(s) at watched tiers", count))
        .with_detail("findingCount", count)
        .with_detail(
            "categories",
            categories.into_iter().map(Value::from).collect::<Vec<_>>(),
        )
}

fn check_consent(cfg: &ConsentConfig, event: &CallEvent, findings: &[SensitiveFinding]) -> Outcome {
    let regulated: BTreeSet<String> = findings
        .iter()
        .filter(|f| cfg.regulated_categories.contains(&f.category))
        .map(|f| f.category.to_string())
        .collect();
    if regulated.is_empty() {
        return Outcome::Quiet;
    }

    match event.metadata_bool("hasConsent") {
        None => Outcome::Missing("hasConsent".to_string()),
        Some(true) => Outcome::Quiet,
        Some(false) => Outcome::fired(format!(
            "{} regulated data processed without consent",
            cfg.regulation
        ))
        .with_detail("regulation", cfg.regulation.clone())
        .with_detail(
            "categories",
            regulated.into_iter().map(Value::from).collect::<Vec<_>>(),
        ),
    }
}

fn check_predicate(predicate: &CustomPredicate, event: &CallEvent) -> Outcome {
    match predicate {
        CustomPredicate::MetadataEquals { key, value } => match event.metadata.get(key) {
            None => Outcome::Missing(key.clone()),
            Some(actual) if loosely_equal(actual, value) => {
                Outcome::fired(format!("metadata '{}' equals {}", key, value))
            }
            Some(_) => Outcome::Quiet,
        },
        CustomPredicate::MetadataExceeds { key, threshold } => match event.metadata_f64(key) {
            None => Outcome::Missing(key.clone()),
            Some(actual) if actual > *threshold => {
                Outcome::fired(format!("metadata '{}' = {} exceeds {}", key, actual, threshold))
                    .with_detail(key, actual)
            }
            Some(_) => Outcome::Quiet,
        },
        CustomPredicate::MetadataPresent { key } => {
            if event.metadata.contains_key(key) {
                Outcome::fired(format!("metadata '{}' is present", key))
            } else {
                Outcome::Quiet
            }
        }
        CustomPredicate::HighValueTransaction { threshold } => match event.metadata_f64("amount") {
            None => Outcome::Missing("amount".to_string()),
            Some(amount) if amount > *threshold => {
                Outcome::fired(format!("amount {} exceeds {}", amount, threshold))
                    .with_detail("amount", amount)
                    .with_detail("threshold", *threshold)
            }
            Some(_) => Outcome::Quiet,
        },
        CustomPredicate::OutsideBusinessHours {
            start_hour,
            end_hour,
        } => {
            let hour = event.timestamp.hour();
            if hour < *start_hour || hour >= *end_hour {
                Outcome::fired(format!(
                    "call at {:02}:00 UTC is outside {:02}:00-{:02}:00",
                    hour, start_hour, end_hour
                ))
            } else {
                Outcome::Quiet
            }
        }
    }
}

/// Equality that tolerates numbers sent as strings
fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (value_as_f64(actual), value_as_f64(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => match (actual, expected) {
            (Value::String(a), Value::Bool(b)) | (Value::Bool(b), Value::String(a)) => {
                a.parse::<bool>().map(|a| a == *b).unwrap_or(false)
            }
            _ => false,
        },
    }
}
