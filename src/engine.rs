//! GuardDog engine
//!
//! Wires the classifier, rule engine, content scanner and aggregator into
//! the two pure entry points. Inputs are checked before anything is
//! classified; a rejected input yields an error and no partial verdict.

use crate::api::{
    scan_message, MonitorCallResponse, ScanContentRequest, ScanContentResponse,
};
use crate::compliance::{ComplianceRule, RuleEngine, RuleEvaluation, Transaction, TransactionMonitor};
use crate::config::GuardDogConfig;
use crate::error::{Error, Result};
use crate::leakage::ContentScanner;
use crate::monitor::{
    AnomalyDetector, DecisionAggregator, InMemoryStatsStore, MonitoringStats, StatsStore,
};
use crate::patterns::PatternLibrary;
use crate::privacy::{highest_tier, DataClassifier, SensitiveFinding, CONTENT_FIELD};
use crate::types::{AlertRecord, CallEvent, Diagnostic, IncidentRecord, Verdict};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Full result of evaluating one call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub verdict: Verdict,
    pub alerts: Vec<AlertRecord>,
    pub incidents: Vec<IncidentRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub risk_score: u8,
}

/// The risk classification and decision engine
#[derive(Debug)]
pub struct GuardEngine {
    config: GuardDogConfig,
    library: Arc<PatternLibrary>,
    classifier: DataClassifier,
    rules: RuleEngine,
    scanner: ContentScanner,
    aggregator: DecisionAggregator,
    transactions: TransactionMonitor,
    anomalies: AnomalyDetector,
}

impl GuardEngine {
    /// Build an engine from a validated configuration
    pub fn new(config: GuardDogConfig, stats: Arc<dyn StatsStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, stats))
    }

    /// Default configuration with in-memory counters
    pub fn with_defaults() -> Self {
        Self::build(GuardDogConfig::default(), Arc::new(InMemoryStatsStore::new()))
    }

    fn build(config: GuardDogConfig, stats: Arc<dyn StatsStore>) -> Self {
        let library = Arc::new(config.build_library());
        for diagnostic in library.diagnostics() {
            tracing::warn!(
                pattern = %diagnostic.subject,
                message = %diagnostic.message,
                "Pattern library built with a skipped pattern"
            );
        }

        Self {
            classifier: DataClassifier::new(library.clone()),
            rules: RuleEngine::new(),
            scanner: ContentScanner::new(library.clone(), &config.scanner),
            aggregator: DecisionAggregator::new(stats),
            transactions: TransactionMonitor::new(config.transactions.clone()),
            anomalies: AnomalyDetector::new(config.anomaly.clone()),
            library,
            config,
        }
    }

    pub fn config(&self) -> &GuardDogConfig {
        &self.config
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn classifier(&self) -> &DataClassifier {
        &self.classifier
    }

    pub fn anomaly_detector(&self) -> &AnomalyDetector {
        &self.anomalies
    }

    /// Counters for one UTC day
    pub fn stats(&self, day: NaiveDate) -> MonitoringStats {
        self.aggregator.stats().snapshot(day)
    }

    /// Reject oversized or non-text content
    pub fn check_input(&self, content: &str) -> Result<()> {
        let limit = self.config.engine.max_content_bytes;
        if content.len() > limit {
            return Err(Error::Input(format!(
                "content is {} bytes, limit is {}",
                content.len(),
                limit
            )));
        }
        if content.contains('\0') {
            return Err(Error::Input("content contains NUL bytes".to_string()));
        }
        Ok(())
    }

    /// Classify text or a JSON payload after input checks
    pub fn classify(&self, content: &str) -> Result<Vec<SensitiveFinding>> {
        self.check_input(content)?;
        Ok(self.classifier.classify_payload(content, CONTENT_FIELD))
    }

    /// Scan a piece of generated content
    pub fn scan_content(&self, request: &ScanContentRequest) -> Result<ScanContentResponse> {
        self.check_input(&request.content)?;

        let findings = self.classifier.classify(&request.content);
        let scan = self.scanner.scan(&request.content);
        let aggregation = self.aggregator.aggregate(
            request.source(),
            findings,
            RuleEvaluation::default(),
            Some(scan),
            Utc::now(),
        );
        let verdict = aggregation.verdict;

        Ok(ScanContentResponse {
            is_violation: verdict.decision.is_violation(),
            violation_type: verdict.violation_type,
            action: verdict.decision,
            modified_content: verdict.rewritten_content,
            confidence: verdict.confidence,
            message: scan_message(verdict.decision, verdict.violation_type),
        })
    }

    /// Classify, evaluate rules, scan generative output, and aggregate
    pub fn evaluate(&self, event: &CallEvent, rules: &[ComplianceRule]) -> Result<Evaluation> {
        for payload in [&event.request_payload, &event.response_payload]
            .into_iter()
            .flatten()
        {
            self.check_input(payload)?;
        }

        let mut findings = Vec::new();
        if let Some(request) = &event.request_payload {
            findings.extend(self.classifier.classify_payload(request, "request"));
        }
        if let Some(response) = &event.response_payload {
            findings.extend(self.classifier.classify_payload(response, "response"));
        }

        let mut rule_result = self.rules.evaluate(event, &findings, rules);
        let mut diagnostics = self.library.diagnostics().to_vec();
        diagnostics.append(&mut rule_result.diagnostics);

        let scan = if event.is_generative() {
            event
                .response_payload
                .as_deref()
                .map(|content| self.scanner.scan(content))
        } else {
            None
        };

        let aggregation =
            self.aggregator
                .aggregate(&event.source, findings, rule_result, scan, event.timestamp);
        let risk_score = risk_score(&aggregation.verdict);

        tracing::info!(
            source = %event.source,
            endpoint = %event.endpoint,
            decision = %aggregation.verdict.decision,
            risk_score = risk_score,
            alerts = aggregation.alerts.len(),
            "Call evaluated"
        );

        Ok(Evaluation {
            verdict: aggregation.verdict,
            alerts: aggregation.alerts,
            incidents: aggregation.incidents,
            diagnostics,
            risk_score,
        })
    }

    /// `monitor-call` projection of [`GuardEngine::evaluate`]
    pub fn monitor_call(
        &self,
        event: &CallEvent,
        rules: &[ComplianceRule],
    ) -> Result<MonitorCallResponse> {
        let evaluation = self.evaluate(event, rules)?;
        Ok(MonitorCallResponse {
            risk_score: evaluation.risk_score,
            decision: evaluation.verdict.decision,
            triggered_rule_ids: evaluation.verdict.triggered_rule_ids,
            alerts: evaluation.alerts,
            incidents: evaluation.incidents,
            diagnostics: evaluation.diagnostics,
        })
    }

    /// Run the configured transaction checks over a batch
    pub fn scan_transactions(&self, transactions: &[Transaction], source: &str) -> Vec<AlertRecord> {
        self.transactions.scan(transactions, source)
    }
}

/// Highest finding weight or verdict confidence, plus 10 per triggered rule
fn risk_score(verdict: &Verdict) -> u8 {
    let tier = highest_tier(&verdict.findings)
        .map(|t| t.risk_weight())
        .unwrap_or(0);
    let confidence = (verdict.confidence * 100.0).round() as u32;
    let rules = 10 * verdict.triggered_rule_ids.len() as u32;
    (tier.max(confidence) + rules).min(100) as u8
}
