//! Violation detectors
//!
//! Each violation category is one [`ViolationDetector`]: it finds matches
//! in generated text, scores them, and knows which replacement each
//! rewrite-level match takes. The scanner composes detectors and owns the
//! final decision.

use crate::patterns::{
    replace_spans, PatternLibrary, RewriteStrategy, RiskTier, SensitiveCategory, Severity, Span,
    ViolationPattern, ViolationType,
};
use crate::privacy::DataClassifier;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Mask for a base64 blob whose decoded text carries sensitive data
pub const ENCODED_PII_MASK: &str = "[ENCODED_PII_REDACTED]";

/// Default replacement for an unverified claim
pub const DEFAULT_DISCLAIMER: &str = "[unverified claim removed]";

/// One detector hit in generated content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationMatch {
    pub violation_type: ViolationType,
    pub severity: Severity,
    /// Name of the pattern that matched
    pub pattern: String,
    pub span: Span,
    pub weight: f64,
    /// Text substituted for the span when the content is rewritten
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

/// Capability shared by every violation category
pub trait ViolationDetector: Send + Sync {
    fn violation_type(&self) -> ViolationType;

    /// All matches in `content`, in library order
    fn find(&self, content: &str) -> Vec<ViolationMatch>;

    /// Sum of match weights, capped at 1.0
    fn confidence(&self, matches: &[ViolationMatch]) -> f64 {
        matches.iter().map(|m| m.weight).sum::<f64>().min(1.0)
    }

    /// Span replacements for rewrite-level matches, in priority order
    fn replacements(&self, matches: &[ViolationMatch]) -> Vec<(Span, String)> {
        matches
            .iter()
            .filter(|m| m.severity == Severity::Rewrite)
            .filter_map(|m| m.replacement.clone().map(|r| (m.span, r)))
            .collect()
    }

    fn rewrite(&self, content: &str, matches: &[ViolationMatch]) -> String {
        replace_spans(content, &self.replacements(matches))
    }
}

/// Detector backed by the library's violation patterns of one type
#[derive(Debug, Clone)]
pub struct PatternDetector {
    violation_type: ViolationType,
    patterns: Vec<ViolationPattern>,
    disclaimer: String,
}

impl PatternDetector {
    pub fn new(library: &PatternLibrary, violation_type: ViolationType, disclaimer: &str) -> Self {
        Self {
            violation_type,
            patterns: library.violation_patterns_for(violation_type).cloned().collect(),
            disclaimer: disclaimer.to_string(),
        }
    }

    /// Financial-advice detector; every built-in pattern blocks
    pub fn financial_advice(library: &PatternLibrary) -> Self {
        Self::new(library, ViolationType::FinancialAdvice, DEFAULT_DISCLAIMER)
    }

    /// Unverified-data detector; hits are replaced with `disclaimer`
    pub fn unverified_data(library: &PatternLibrary, disclaimer: &str) -> Self {
        Self::new(library, ViolationType::UnverifiedData, disclaimer)
    }

    fn replacement_for(&self, pattern: &ViolationPattern) -> Option<String> {
        match pattern.rewrite {
            RewriteStrategy::None => None,
            RewriteStrategy::Disclaimer => Some(self.disclaimer.clone()),
            RewriteStrategy::CategoryMask => Some(SensitiveCategory::Other.mask().to_string()),
        }
    }
}

impl ViolationDetector for PatternDetector {
    fn violation_type(&self) -> ViolationType {
        self.violation_type
    }

    fn find(&self, content: &str) -> Vec<ViolationMatch> {
        let mut matches = Vec::new();
        for pattern in &self.patterns {
            let replacement = self.replacement_for(pattern);
            for span in pattern.matcher.find_spans(content) {
                matches.push(ViolationMatch {
                    violation_type: self.violation_type,
                    severity: pattern.severity,
                    pattern: pattern.name.clone(),
                    span,
                    weight: pattern.weight,
                    replacement: replacement.clone(),
                });
            }
        }
        matches
    }
}

/// Sensitive data surfacing in generated output
#[derive(Debug, Clone)]
pub struct PiiLeakDetector {
    classifier: DataClassifier,
    min_tier: RiskTier,
    encoded_blob: Option<Regex>,
}

impl PiiLeakDetector {
    pub fn new(library: Arc<PatternLibrary>, min_tier: RiskTier) -> Self {
        Self {
            classifier: DataClassifier::new(library),
            min_tier,
            encoded_blob: None,
        }
    }

    /// Also inspect base64 blobs for encoded sensitive data
    pub fn with_encoded_detection(mut self) -> Self {
        // A fixed, known-good expression; failure only disables the check
        self.encoded_blob = Regex::new(r"[A-Za-z0-9+/]{20,}={0,2}").ok();
        self
    }

    fn encoded_matches(&self, content: &str) -> Vec<ViolationMatch> {
        let Some(blob) = &self.encoded_blob else {
            return Vec::new();
        };

        let mut matches = Vec::new();
        for m in blob.find_iter(content) {
            let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(m.as_str()) else {
                continue;
            };
            let Ok(text) = String::from_utf8(decoded) else {
                continue;
            };
            let top = self
                .classifier
                .classify(&text)
                .into_iter()
                .filter(|f| f.risk_tier >= self.min_tier)
                .max_by_key(|f| f.risk_tier);
            if let Some(finding) = top {
                matches.push(ViolationMatch {
                    violation_type: ViolationType::PiiExposure,
                    severity: Severity::Rewrite,
                    pattern: format!("base64:{}", finding.pattern),
                    span: Span::new(m.start(), m.end()),
                    weight: finding.risk_tier.confidence(),
                    replacement: Some(ENCODED_PII_MASK.to_string()),
                });
            }
        }
        matches
    }
}

impl ViolationDetector for PiiLeakDetector {
    fn violation_type(&self) -> ViolationType {
        ViolationType::PiiExposure
    }

    fn find(&self, content: &str) -> Vec<ViolationMatch> {
        let mut matches: Vec<ViolationMatch> = self
            .classifier
            .classify(content)
            .into_iter()
            .filter(|f| f.risk_tier >= self.min_tier)
            .map(|f| ViolationMatch {
                violation_type: ViolationType::PiiExposure,
                severity: Severity::Rewrite,
                pattern: f.pattern,
                span: f.offset_span,
                weight: f.risk_tier.confidence(),
                replacement: Some(f.redacted_snippet),
            })
            .collect();
        matches.extend(self.encoded_matches(content));
        matches
    }

    /// Exposure is as bad as its worst finding
    fn confidence(&self, matches: &[ViolationMatch]) -> f64 {
        matches.iter().map(|m| m.weight).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Arc<PatternLibrary> {
        Arc::new(PatternLibrary::builtin())
    }

    #[test]
    fn test_financial_advice_matches_block() {
        let detector = PatternDetector::financial_advice(&library());
        let matches = detector.find("I recommend you buy this fund, it's risk-free returns");
        assert!(!matches.is_empty());
        assert!(matches.iter().all(|m| m.severity == Severity::Block));
        assert!(matches.iter().all(|m| m.replacement.is_none()));
    }

    #[test]
    fn test_confidence_capped() {
        let detector = PatternDetector::financial_advice(&library());
        let matches = detector
            .find("You should definitely invest in Tesla stock right now, guaranteed 50% return");
        assert_eq!(detector.confidence(&matches), 1.0);
    }

    #[test]
    fn test_unverified_rewrite_uses_disclaimer() {
        let detector = PatternDetector::unverified_data(&library(), "[claim withheld]");
        let text = "Off the record, the deal closes Friday";
        let matches = detector.find(text);
        assert_eq!(detector.rewrite(text, &matches), "[claim withheld], the deal closes Friday");
    }

    #[test]
    fn test_pii_leak_min_tier() {
        let detector = PiiLeakDetector::new(library(), RiskTier::Medium);
        // names are low tier and do not count as leakage
        assert!(detector.find("Say hello to Jane Smith").is_empty());
        let matches = detector.find("reach me at jane@example.com");
        assert_eq!(matches.len(), 1);
        assert_eq!(detector.confidence(&matches), RiskTier::Medium.confidence());
    }

    #[test]
    fn test_pii_leak_rewrite_masks() {
        let detector = PiiLeakDetector::new(library(), RiskTier::Medium);
        let text = "SSN: 123-45-6789, Email: john@example.com";
        let matches = detector.find(text);
        assert_eq!(
            detector.rewrite(text, &matches),
            "SSN: XXX-XX-XXXX, Email: [EMAIL_REDACTED]"
        );
        assert_eq!(detector.confidence(&matches), RiskTier::High.confidence());
    }

    #[test]
    fn test_encoded_pii_detected() {
        let detector = PiiLeakDetector::new(library(), RiskTier::Medium).with_encoded_detection();
        let encoded =
            base64::engine::general_purpose::STANDARD.encode("customer ssn 123-45-6789 on file");
        let text = format!("payload: {}", encoded);
        let matches = detector.find(&text);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].pattern.starts_with("base64:"));
        assert_eq!(detector.rewrite(&text, &matches), format!("payload: {}", ENCODED_PII_MASK));
    }

    #[test]
    fn test_benign_base64_ignored() {
        let detector = PiiLeakDetector::new(library(), RiskTier::Medium).with_encoded_detection();
        let encoded = base64::engine::general_purpose::STANDARD
            .encode("Hello, this is a normal message with enough length");
        assert!(detector.find(&format!("blob {}", encoded)).is_empty());
    }
}
