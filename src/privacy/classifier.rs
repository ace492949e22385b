//! Data classifier for detecting sensitive data

use crate::patterns::{replace_spans, PatternLibrary, RiskTier, SensitiveCategory, Span};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Source field used when content is classified without a field label
pub const CONTENT_FIELD: &str = "content";

/// A single sensitive-data detection. Carries the mask, never the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveFinding {
    /// Category of the detected data
    pub category: SensitiveCategory,
    /// Risk tier from the pattern library
    pub risk_tier: RiskTier,
    /// Field (or JSON path) the data was found in
    pub source_field: String,
    /// Redacted stand-in for the matched text
    pub redacted_snippet: String,
    /// Byte span within the classified string
    pub offset_span: Span,
    /// Pattern that produced the finding
    pub pattern: String,
}

/// Data classifier over the pattern library's sensitive-data catalog
#[derive(Debug, Clone)]
pub struct DataClassifier {
    library: Arc<PatternLibrary>,
}

impl DataClassifier {
    /// Create a classifier over the given library
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        Self { library }
    }

    /// Classify a piece of text
    pub fn classify(&self, content: &str) -> Vec<SensitiveFinding> {
        self.classify_field(content, CONTENT_FIELD)
    }

    /// Classify text, labelling findings with `field`
    pub fn classify_field(&self, content: &str, field: &str) -> Vec<SensitiveFinding> {
        if content.is_empty() {
            return Vec::new();
        }

        let mut findings = Vec::new();
        for pattern in self.library.list_sensitive_patterns() {
            for span in pattern.matcher.find_spans(content) {
                findings.push(SensitiveFinding {
                    category: pattern.category,
                    risk_tier: pattern.risk_tier,
                    source_field: field.to_string(),
                    redacted_snippet: pattern.category.mask().to_string(),
                    offset_span: span,
                    pattern: pattern.name.clone(),
                });
            }
        }
        findings
    }

    /// Classify a payload. JSON payloads are walked leaf by leaf and each
    /// finding records its JSON path under `field`; anything else is text.
    pub fn classify_payload(&self, payload: &str, field: &str) -> Vec<SensitiveFinding> {
        let trimmed = payload.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(payload) {
                return self.classify_value(&value, field);
            }
        }
        self.classify_field(payload, field)
    }

    /// Recursively classify the string leaves of a JSON value
    pub fn classify_value(&self, value: &Value, root: &str) -> Vec<SensitiveFinding> {
        let mut findings = Vec::new();
        self.walk_value(value, root.to_string(), &mut findings);
        findings
    }

    fn walk_value(&self, value: &Value, path: String, findings: &mut Vec<SensitiveFinding>) {
        match value {
            Value::String(text) => findings.extend(self.classify_field(text, &path)),
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    self.walk_value(child, child_path, findings);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    self.walk_value(child, format!("{}[{}]", path, i), findings);
                }
            }
            _ => {}
        }
    }

    /// Redact sensitive data in text
    pub fn redact(&self, content: &str) -> String {
        let replacements: Vec<(Span, String)> = self
            .classify(content)
            .into_iter()
            .map(|f| (f.offset_span, f.redacted_snippet))
            .collect();
        replace_spans(content, &replacements)
    }

    /// Check if text contains any sensitive data
    pub fn contains_sensitive(&self, content: &str) -> bool {
        self.library
            .list_sensitive_patterns()
            .iter()
            .any(|p| p.matcher.is_match(content))
    }
}

/// Highest risk tier among findings
pub fn highest_tier(findings: &[SensitiveFinding]) -> Option<RiskTier> {
    findings.iter().map(|f| f.risk_tier).max()
}

/// Collapse findings that share category, field and span, keeping the first
pub fn dedupe_findings(findings: &[SensitiveFinding]) -> Vec<&SensitiveFinding> {
    let mut seen = HashSet::new();
    findings
        .iter()
        .filter(|f| seen.insert((f.category, f.source_field.as_str(), f.offset_span)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{MatcherDef, SensitivePatternDef};

    fn create_test_classifier() -> DataClassifier {
        DataClassifier::new(Arc::new(PatternLibrary::builtin()))
    }

    #[test]
    fn test_classify_ssn_and_email() {
        let classifier = create_test_classifier();
        let findings = classifier.classify("SSN: 123-45-6789, Email: john@example.com");

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].category, SensitiveCategory::Ssn);
        assert_eq!(findings[0].risk_tier, RiskTier::High);
        assert_eq!(findings[1].category, SensitiveCategory::Email);
        assert_eq!(findings[1].risk_tier, RiskTier::Medium);
        assert_eq!(findings[0].source_field, CONTENT_FIELD);
    }

    #[test]
    fn test_classify_credit_card() {
        let classifier = create_test_classifier();
        let findings = classifier.classify("My card number is 4111-1111-1111-1111");

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, SensitiveCategory::CreditCard);
        assert_eq!(findings[0].redacted_snippet, "XXXX-XXXX-XXXX-XXXX");
    }

    #[test]
    fn test_luhn_invalid_card_ignored() {
        let classifier = create_test_classifier();
        let findings = classifier.classify("Order ref 1234-5678-9012-3456");
        assert!(findings
            .iter()
            .all(|f| f.category != SensitiveCategory::CreditCard));
    }

    #[test]
    fn test_account_number_masks_digits_only() {
        let classifier = create_test_classifier();
        let text = "Please debit account number 004512398";
        let findings = classifier.classify(text);
        let account = findings
            .iter()
            .find(|f| f.category == SensitiveCategory::AccountNumber)
            .unwrap();
        assert_eq!(&text[account.offset_span.start..account.offset_span.end], "004512398");
    }

    #[test]
    fn test_classify_normal_text() {
        let classifier = create_test_classifier();
        assert!(classifier.classify("hello, how are you today?").is_empty());
        assert!(!classifier.contains_sensitive("hello, how are you today?"));
    }

    #[test]
    fn test_empty_content() {
        let classifier = create_test_classifier();
        assert!(classifier.classify("").is_empty());
    }

    #[test]
    fn test_snippet_never_contains_raw_text() {
        let classifier = create_test_classifier();
        let text = "Reach me at 555-123-4567 or jane.doe@bank.com, SSN 987-65-4321, lives at 42 Oak Street";
        let findings = classifier.classify(text);
        assert!(findings.len() >= 4);
        for f in &findings {
            let raw = &text[f.offset_span.start..f.offset_span.end];
            assert!(!f.redacted_snippet.contains(raw), "{} leaked", f.pattern);
        }
    }

    #[test]
    fn test_redact() {
        let classifier = create_test_classifier();
        let redacted = classifier.redact("My SSN is 123-45-6789 and email is test@example.com");
        assert_eq!(
            redacted,
            "My SSN is XXX-XX-XXXX and email is [EMAIL_REDACTED]"
        );
    }

    #[test]
    fn test_classify_json_payload_paths() {
        let classifier = create_test_classifier();
        let payload = r#"{"user": {"email": "a.b@example.com", "phones": ["555-123-4567"]}, "count": 3}"#;
        let findings = classifier.classify_payload(payload, "request");

        let fields: Vec<&str> = findings.iter().map(|f| f.source_field.as_str()).collect();
        assert!(fields.contains(&"request.user.email"));
        assert!(fields.contains(&"request.user.phones[0]"));
    }

    #[test]
    fn test_classify_payload_falls_back_to_text() {
        let classifier = create_test_classifier();
        let findings = classifier.classify_payload("{not json 123-45-6789", "response");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].source_field, "response");
    }

    #[test]
    fn test_overlapping_patterns_retained_and_deduped() {
        let extra = SensitivePatternDef {
            name: "ssn_again".to_string(),
            category: SensitiveCategory::Ssn,
            risk_tier: RiskTier::High,
            matcher: MatcherDef::regex(r"\d{3}-\d{2}-\d{4}"),
            description: String::new(),
        };
        let classifier =
            DataClassifier::new(Arc::new(PatternLibrary::with_extensions(&[extra], &[])));
        let findings = classifier.classify("id 123-45-6789");
        assert_eq!(findings.len(), 2);
        assert_eq!(dedupe_findings(&findings).len(), 1);
    }

    #[test]
    fn test_highest_tier() {
        let classifier = create_test_classifier();
        let findings = classifier.classify("mail x@y.io, card 4111 1111 1111 1111");
        assert_eq!(highest_tier(&findings), Some(RiskTier::High));
        assert_eq!(highest_tier(&[]), None);
    }
}
