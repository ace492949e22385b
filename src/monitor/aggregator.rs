//! Decision aggregator
//!
//! Folds the rule engine's result and an optional content scan into one
//! [`Verdict`], emits the alert and incident records the caller persists,
//! and bumps the day counters.

use super::stats::StatsStore;
use crate::compliance::RuleEvaluation;
use crate::leakage::ScanResult;
use crate::privacy::SensitiveFinding;
use crate::types::{AlertRecord, AlertSeverity, Decision, IncidentRecord, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Verdict plus the records produced alongside it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub verdict: Verdict,
    pub alerts: Vec<AlertRecord>,
    pub incidents: Vec<IncidentRecord>,
}

/// Merges component outputs under block > rewrite > allow
#[derive(Clone)]
pub struct DecisionAggregator {
    stats: Arc<dyn StatsStore>,
}

impl std::fmt::Debug for DecisionAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionAggregator").finish_non_exhaustive()
    }
}

impl DecisionAggregator {
    pub fn new(stats: Arc<dyn StatsStore>) -> Self {
        Self { stats }
    }

    pub fn stats(&self) -> &Arc<dyn StatsStore> {
        &self.stats
    }

    pub fn aggregate(
        &self,
        source: &str,
        findings: Vec<SensitiveFinding>,
        rules: RuleEvaluation,
        scan: Option<ScanResult>,
        at: DateTime<Utc>,
    ) -> Aggregation {
        let scan = scan.unwrap_or_else(ScanResult::allow);

        let rule_decision = if rules.requires_block() {
            Decision::Block
        } else {
            Decision::Allow
        };
        let decision = rule_decision.dominant(scan.decision);

        let mut confidence: f64 = 0.0;
        if rule_decision == decision && decision == Decision::Block {
            confidence = 1.0;
        }
        if scan.decision == decision && decision != Decision::Allow {
            confidence = confidence.max(scan.confidence);
        }

        let rewritten_content = if decision == Decision::Rewrite {
            scan.rewritten_content.clone()
        } else {
            None
        };

        let mut incidents = Vec::new();
        if let Some(violation_type) = scan.violation_type.filter(|_| scan.is_violation()) {
            let severity = match scan.decision {
                Decision::Block => AlertSeverity::Critical,
                _ => AlertSeverity::High,
            };
            incidents.push(IncidentRecord {
                id: format!("incident-{}", uuid::Uuid::new_v4()),
                severity,
                description: format!(
                    "{} detected in generated content ({} match(es)), action {}",
                    violation_type,
                    scan.matches.len(),
                    decision
                ),
                source: source.to_string(),
                violation_type,
                action: decision,
                confidence: scan.confidence,
                timestamp: at,
            });
        }

        self.stats.record(at.date_naive(), decision);

        tracing::debug!(
            source = source,
            decision = %decision,
            confidence = confidence,
            rules_triggered = rules.triggered_rule_ids.len(),
            incidents = incidents.len(),
            "Verdict aggregated"
        );

        Aggregation {
            verdict: Verdict {
                decision,
                confidence,
                violation_type: scan.violation_type,
                rewritten_content,
                triggered_rule_ids: rules.triggered_rule_ids,
                findings,
            },
            alerts: rules.alerts,
            incidents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::InMemoryStatsStore;
    use crate::patterns::ViolationType;
    use chrono::TimeZone;

    fn aggregator() -> (DecisionAggregator, Arc<InMemoryStatsStore>) {
        let store = Arc::new(InMemoryStatsStore::new());
        (DecisionAggregator::new(store.clone()), store)
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn rewrite_scan() -> ScanResult {
        ScanResult {
            decision: Decision::Rewrite,
            confidence: 0.8,
            violation_type: Some(ViolationType::UnverifiedData),
            rewritten_content: Some("[unverified claim removed]".to_string()),
            matches: Vec::new(),
        }
    }

    fn blocking_rules() -> RuleEvaluation {
        let mut rules = RuleEvaluation::default();
        rules.triggered_rule_ids.insert("big".to_string());
        rules.blocking_rule_ids.insert("big".to_string());
        rules
    }

    #[test]
    fn test_allow_when_nothing_fires() {
        let (agg, store) = aggregator();
        let out = agg.aggregate("svc", Vec::new(), RuleEvaluation::default(), None, at());
        assert_eq!(out.verdict.decision, Decision::Allow);
        assert_eq!(out.verdict.confidence, 0.0);
        assert!(out.verdict.violation_type.is_none());
        assert!(out.incidents.is_empty());
        let stats = store.snapshot(at().date_naive());
        assert_eq!((stats.scanned, stats.flagged, stats.blocked), (1, 0, 0));
    }

    #[test]
    fn test_rewrite_carries_content_and_incident() {
        let (agg, store) = aggregator();
        let out = agg.aggregate(
            "openai",
            Vec::new(),
            RuleEvaluation::default(),
            Some(rewrite_scan()),
            at(),
        );
        assert_eq!(out.verdict.decision, Decision::Rewrite);
        assert_eq!(out.verdict.confidence, 0.8);
        assert!(out.verdict.rewritten_content.is_some());
        assert_eq!(out.incidents.len(), 1);
        assert_eq!(out.incidents[0].severity, AlertSeverity::High);
        assert_eq!(store.snapshot(at().date_naive()).flagged, 1);
    }

    #[test]
    fn test_blocking_rule_dominates_rewrite() {
        let (agg, store) = aggregator();
        let out = agg.aggregate("openai", Vec::new(), blocking_rules(), Some(rewrite_scan()), at());
        assert_eq!(out.verdict.decision, Decision::Block);
        assert_eq!(out.verdict.confidence, 1.0);
        assert!(out.verdict.rewritten_content.is_none());
        assert!(out.verdict.triggered_rule_ids.contains("big"));
        assert_eq!(out.incidents[0].action, Decision::Block);
        assert_eq!(out.incidents[0].severity, AlertSeverity::High);
        assert_eq!(store.snapshot(at().date_naive()).blocked, 1);
    }

    #[test]
    fn test_blocked_scan_is_critical_incident() {
        let (agg, _) = aggregator();
        let scan = ScanResult {
            decision: Decision::Block,
            confidence: 0.6,
            violation_type: Some(ViolationType::FinancialAdvice),
            rewritten_content: None,
            matches: Vec::new(),
        };
        let out = agg.aggregate("openai", Vec::new(), RuleEvaluation::default(), Some(scan), at());
        assert_eq!(out.verdict.decision, Decision::Block);
        assert_eq!(out.verdict.confidence, 0.6);
        assert_eq!(out.incidents[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_flag_only_rules_do_not_change_decision() {
        let (agg, _) = aggregator();
        let mut rules = RuleEvaluation::default();
        rules.triggered_rule_ids.insert("rate".to_string());
        let out = agg.aggregate("svc", Vec::new(), rules, None, at());
        assert_eq!(out.verdict.decision, Decision::Allow);
        assert!(out.verdict.triggered_rule_ids.contains("rate"));
    }
}
