//! Wire types for the two engine entry points
//!
//! | Operation      | Request               | Response               |
//! |----------------|-----------------------|------------------------|
//! | `scan-content` | [`ScanContentRequest`] | [`ScanContentResponse`] |
//! | `monitor-call` | [`MonitorCallRequest`] | [`MonitorCallResponse`] |
//!
//! All types serialize as camelCase JSON. Transport is the caller's choice.

use crate::compliance::ComplianceRule;
use crate::patterns::ViolationType;
use crate::types::{AlertRecord, CallEvent, Decision, Diagnostic, IncidentRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Content to scan, with optional caller metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanContentRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ScanContentRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Label used as the record source; defaults to `scan-content`
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("scan-content")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanContentResponse {
    pub is_violation: bool,
    pub violation_type: Option<ViolationType>,
    pub action: Decision,
    pub modified_content: Option<String>,
    pub confidence: f64,
    pub message: String,
}

/// One call plus the caller's current rule set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorCallRequest {
    pub event: CallEvent,
    #[serde(default)]
    pub rules: Vec<ComplianceRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorCallResponse {
    /// Uncalibrated 0-100 heuristic
    pub risk_score: u8,
    pub decision: Decision,
    pub triggered_rule_ids: BTreeSet<String>,
    pub alerts: Vec<AlertRecord>,
    pub incidents: Vec<IncidentRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Human-readable summary for a scan outcome
pub(crate) fn scan_message(action: Decision, violation_type: Option<ViolationType>) -> String {
    let kind = violation_type
        .map(|v| v.to_string())
        .unwrap_or_else(|| "policy violation".to_string());
    match action {
        Decision::Allow => "Content passed compliance checks".to_string(),
        Decision::Rewrite => format!("Content modified: {} removed", kind),
        Decision::Block => format!("Content blocked: {} detected", kind),
    }
}
