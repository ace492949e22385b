//! Domain records shared across the engine
//!
//! Inbound [`CallEvent`]s, the outbound [`Verdict`], and the output-only
//! [`AlertRecord`] / [`IncidentRecord`] projections handed to persistence
//! and notification collaborators. Wire types use camelCase JSON.

use crate::compliance::RuleType;
use crate::compliance::TransactionCheck;
use crate::error::Error;
use crate::monitor::AnomalyKind;
use crate::patterns::ViolationType;
use crate::privacy::SensitiveFinding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Final action for a piece of content. Ordered so that `max` is dominance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Allow,
    Rewrite,
    Block,
}

impl Decision {
    /// Block dominates rewrite dominates allow
    pub fn dominant(self, other: Decision) -> Decision {
        self.max(other)
    }

    pub fn is_violation(self) -> bool {
        self != Decision::Allow
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Rewrite => write!(f, "rewrite"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// Severity of an emitted alert or incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    #[default]
    Warning,
    High,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One monitored API or model call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    pub source: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub request_payload: Option<String>,
    #[serde(default)]
    pub response_payload: Option<String>,
    #[serde(rename = "timestampUTC", alias = "timestamp", default = "chrono::Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl CallEvent {
    pub fn new(source: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            endpoint: endpoint.into(),
            method: "POST".to_string(),
            request_payload: None,
            response_payload: None,
            timestamp: Utc::now(),
            latency_ms: 0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_request(mut self, payload: impl Into<String>) -> Self {
        self.request_payload = Some(payload.into());
        self
    }

    pub fn with_response(mut self, payload: impl Into<String>) -> Self {
        self.response_payload = Some(payload.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Numeric metadata value; numeric strings are accepted
    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        value_as_f64(self.metadata.get(key)?)
    }

    /// Boolean metadata value; "true"/"false" strings are accepted
    pub fn metadata_bool(&self, key: &str) -> Option<bool> {
        match self.metadata.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key)?.as_str()
    }

    /// Whether the response payload is model-generated content
    pub fn is_generative(&self) -> bool {
        self.metadata_bool("generative").unwrap_or(false)
    }
}

/// Lenient numeric view of a JSON value
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Final verdict for one evaluation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub decision: Decision,
    pub confidence: f64,
    pub violation_type: Option<ViolationType>,
    pub rewritten_content: Option<String>,
    pub triggered_rule_ids: BTreeSet<String>,
    pub findings: Vec<SensitiveFinding>,
}

/// What produced an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordOrigin {
    Rule {
        #[serde(rename = "ruleId")]
        rule_id: String,
        #[serde(rename = "ruleType")]
        rule_type: RuleType,
    },
    Violation {
        #[serde(rename = "violationType")]
        violation_type: ViolationType,
    },
    Anomaly {
        #[serde(rename = "anomalyType")]
        anomaly: AnomalyKind,
    },
    Transaction {
        check: TransactionCheck,
        #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
        transaction_id: Option<String>,
    },
}

/// Alert emitted for the caller to persist and notify on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: String,
    pub severity: AlertSeverity,
    pub description: String,
    pub source: String,
    pub origin: RecordOrigin,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub details: serde_json::Map<String, Value>,
}

impl AlertRecord {
    pub fn new(
        severity: AlertSeverity,
        source: impl Into<String>,
        origin: RecordOrigin,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("alert-{}", uuid::Uuid::new_v4()),
            severity,
            description: description.into(),
            source: source.into(),
            origin,
            timestamp: Utc::now(),
            details: serde_json::Map::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Rule id when the alert came from a compliance rule
    pub fn rule_id(&self) -> Option<&str> {
        match &self.origin {
            RecordOrigin::Rule { rule_id, .. } => Some(rule_id),
            _ => None,
        }
    }
}

/// Content-violation incident emitted for the caller to persist
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub id: String,
    pub severity: AlertSeverity,
    pub description: String,
    pub source: String,
    pub violation_type: ViolationType,
    pub action: Decision,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Kind of degraded-evaluation diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Malformed rule or pattern configuration; the item was skipped
    Configuration,
    /// Matcher fault; the pattern was skipped
    Internal,
    /// Metadata a rule needs was absent; the rule did not fire
    MissingInput,
}

/// Non-fatal problem surfaced alongside partial results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Rule id or pattern name the diagnostic refers to
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn missing_input(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::MissingInput, subject, message)
    }

    /// Classify an engine error as a diagnostic for `subject`
    pub fn from_error(subject: impl Into<String>, error: &Error) -> Self {
        let kind = match error {
            Error::Internal(_) => DiagnosticKind::Internal,
            _ => DiagnosticKind::Configuration,
        };
        Self::new(kind, subject, error.to_string())
    }
}
