//! Content risk scanner
//!
//! Runs every violation detector over model-generated text and reduces
//! their hits to one action. Block dominates rewrite dominates allow. The
//! rewrite is a single left-to-right pass over the rewrite-level spans of
//! all detectors, so the output is deterministic for a given library.

use super::detector::{PatternDetector, PiiLeakDetector, ViolationDetector, ViolationMatch};
use crate::config::ScannerConfig;
use crate::patterns::{replace_spans, PatternLibrary, Span, ViolationType};
use crate::types::Decision;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of scanning one piece of generated content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub decision: Decision,
    pub confidence: f64,
    pub violation_type: Option<ViolationType>,
    /// Present iff `decision` is rewrite
    pub rewritten_content: Option<String>,
    pub matches: Vec<ViolationMatch>,
}

impl ScanResult {
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            confidence: 0.0,
            violation_type: None,
            rewritten_content: None,
            matches: Vec::new(),
        }
    }

    pub fn is_violation(&self) -> bool {
        self.decision != Decision::Allow
    }
}

/// Per-detector summary used while reducing
struct DetectorHit {
    violation_type: ViolationType,
    decision: Decision,
    confidence: f64,
    replacements: Vec<(Span, String)>,
    matches: Vec<ViolationMatch>,
}

/// Composes violation detectors into a single decision
pub struct ContentScanner {
    detectors: Vec<Box<dyn ViolationDetector>>,
}

impl std::fmt::Debug for ContentScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types: Vec<ViolationType> = self.detectors.iter().map(|d| d.violation_type()).collect();
        f.debug_struct("ContentScanner").field("detectors", &types).finish()
    }
}

impl ContentScanner {
    /// Standard detector set: financial advice, unverified data, PII exposure
    pub fn new(library: Arc<PatternLibrary>, config: &ScannerConfig) -> Self {
        let mut pii = PiiLeakDetector::new(library.clone(), config.min_leak_tier);
        if config.scan_encoded {
            pii = pii.with_encoded_detection();
        }

        Self::with_detectors(vec![
            Box::new(PatternDetector::financial_advice(&library)),
            Box::new(PatternDetector::unverified_data(&library, &config.disclaimer)),
            Box::new(pii),
        ])
    }

    /// Scanner over a caller-chosen detector set, in priority order
    pub fn with_detectors(detectors: Vec<Box<dyn ViolationDetector>>) -> Self {
        Self { detectors }
    }

    pub fn scan(&self, content: &str) -> ScanResult {
        let hits: Vec<DetectorHit> = self
            .detectors
            .iter()
            .filter_map(|detector| {
                let matches = detector.find(content);
                let severity = matches.iter().map(|m| m.severity).max()?;
                Some(DetectorHit {
                    violation_type: detector.violation_type(),
                    decision: severity.decision(),
                    confidence: detector.confidence(&matches),
                    replacements: detector.replacements(&matches),
                    matches,
                })
            })
            .collect();

        let Some(decision) = hits.iter().map(|h| h.decision).max() else {
            return ScanResult::allow();
        };

        // Highest confidence at the final level; ties keep the earlier detector
        let mut lead: Option<&DetectorHit> = None;
        for hit in hits.iter().filter(|h| h.decision == decision) {
            if lead.map_or(true, |l| hit.confidence > l.confidence) {
                lead = Some(hit);
            }
        }
        let (confidence, violation_type) = lead
            .map(|h| (h.confidence, Some(h.violation_type)))
            .unwrap_or((0.0, None));

        let rewritten_content = (decision == Decision::Rewrite).then(|| {
            let replacements: Vec<(Span, String)> = hits
                .iter()
                .flat_map(|h| h.replacements.iter().cloned())
                .collect();
            replace_spans(content, &replacements)
        });

        match decision {
            Decision::Block => tracing::warn!(
                violation_type = ?violation_type,
                confidence = confidence,
                "Generated content blocked"
            ),
            Decision::Rewrite => tracing::info!(
                violation_type = ?violation_type,
                confidence = confidence,
                "Generated content rewritten"
            ),
            Decision::Allow => {}
        }

        ScanResult {
            decision,
            confidence,
            violation_type,
            rewritten_content,
            matches: hits.into_iter().flat_map(|h| h.matches).collect(),
        }
    }
}
