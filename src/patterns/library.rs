//! Pattern library: the ordered catalog of detectors
//!
//! Two catalogs live here. Sensitive-data patterns feed the classifier and
//! are tagged with a [`SensitiveCategory`] and [`RiskTier`]. Violation
//! patterns feed the content scanner and are tagged with a [`ViolationType`],
//! a [`Severity`], a [`RewriteStrategy`] and a heuristic weight.
//!
//! The library is immutable once built. Built-in catalogs always come first;
//! deployments append extra definitions through configuration. A definition
//! that fails to compile is skipped and recorded as an internal diagnostic,
//! so one corrupted pattern never takes the rest of the catalog down.

use super::matcher::{Matcher, MatcherDef, Validator};
use crate::error::{Error, Result};
use crate::types::{Decision, Diagnostic};
use serde::{Deserialize, Serialize};

/// Category of sensitive data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveCategory {
    Ssn,
    CreditCard,
    Email,
    Phone,
    AccountNumber,
    Address,
    Name,
    Other,
}

impl SensitiveCategory {
    /// Fixed redaction mask substituted for a span of this category
    pub fn mask(&self) -> &'static str {
        match self {
            Self::Ssn => "XXX-XX-XXXX",
            Self::CreditCard => "XXXX-XXXX-XXXX-XXXX",
            Self::Email => "[EMAIL_REDACTED]",
            Self::Phone => "XXX-XXX-XXXX",
            Self::AccountNumber => "[ACCOUNT_REDACTED]",
            Self::Address => "[ADDRESS_REDACTED]",
            Self::Name => "[NAME_REDACTED]",
            Self::Other => "[REDACTED]",
        }
    }

    /// Categories that identify a person (everything but `Other`)
    pub fn personal() -> Vec<Self> {
        vec![
            Self::Ssn,
            Self::CreditCard,
            Self::Email,
            Self::Phone,
            Self::AccountNumber,
            Self::Address,
            Self::Name,
        ]
    }
}

impl std::fmt::Display for SensitiveCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ssn => write!(f, "ssn"),
            Self::CreditCard => write!(f, "credit_card"),
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
            Self::AccountNumber => write!(f, "account_number"),
            Self::Address => write!(f, "address"),
            Self::Name => write!(f, "name"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Risk tier of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Heuristic confidence that a finding of this tier is a real exposure
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Low => 0.5,
            Self::Medium => 0.7,
            Self::High => 0.9,
        }
    }

    /// Contribution to a call's 0-100 risk score
    pub fn risk_weight(&self) -> u32 {
        match self {
            Self::Low => 15,
            Self::Medium => 40,
            Self::High => 70,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Class of disallowed generated content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// Investment recommendations, guaranteed-return language
    FinancialAdvice,
    /// Insider/confidential-source claims, unverifiable predictions
    UnverifiedData,
    /// Sensitive data leaking into generated output
    PiiExposure,
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FinancialAdvice => write!(f, "financial_advice"),
            Self::UnverifiedData => write!(f, "unverified_data"),
            Self::PiiExposure => write!(f, "pii_exposure"),
        }
    }
}

/// Action a violation pattern demands when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Rewrite,
    Block,
}

impl Severity {
    pub fn decision(&self) -> Decision {
        match self {
            Self::Rewrite => Decision::Rewrite,
            Self::Block => Decision::Block,
        }
    }
}

/// How a rewrite-level hit is replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStrategy {
    /// No rewrite (block-level patterns)
    #[default]
    None,
    /// Replace the clause with the neutral disclaimer template
    Disclaimer,
    /// Replace the span with a category mask
    CategoryMask,
}

/// Serializable sensitive-data pattern definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivePatternDef {
    pub name: String,
    pub category: SensitiveCategory,
    pub risk_tier: RiskTier,
    pub matcher: MatcherDef,
    #[serde(default)]
    pub description: String,
}

/// Serializable violation pattern definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationPatternDef {
    pub name: String,
    pub violation_type: ViolationType,
    pub severity: Severity,
    #[serde(default)]
    pub rewrite: RewriteStrategy,
    pub weight: f64,
    pub matcher: MatcherDef,
    #[serde(default)]
    pub description: String,
}

/// Compiled sensitive-data pattern
#[derive(Debug, Clone)]
pub struct SensitivePattern {
    pub name: String,
    pub category: SensitiveCategory,
    pub risk_tier: RiskTier,
    pub matcher: Matcher,
    pub description: String,
}

/// Compiled violation pattern
#[derive(Debug, Clone)]
pub struct ViolationPattern {
    pub name: String,
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub rewrite: RewriteStrategy,
    pub weight: f64,
    pub matcher: Matcher,
    pub description: String,
}

impl SensitivePattern {
    fn compile(def: &SensitivePatternDef) -> Result<Self> {
        Ok(Self {
            name: def.name.clone(),
            category: def.category,
            risk_tier: def.risk_tier,
            matcher: Matcher::compile(&def.matcher)?,
            description: def.description.clone(),
        })
    }
}

impl ViolationPattern {
    fn compile(def: &ViolationPatternDef) -> Result<Self> {
        if !(def.weight > 0.0 && def.weight <= 1.0) {
            return Err(Error::Internal(format!(
                "weight {} outside (0, 1]",
                def.weight
            )));
        }
        match (def.severity, def.rewrite) {
            (Severity::Rewrite, RewriteStrategy::None) => {
                return Err(Error::Internal(
                    "rewrite-level pattern needs a rewrite strategy".to_string(),
                ));
            }
            (Severity::Block, RewriteStrategy::Disclaimer | RewriteStrategy::CategoryMask) => {
                tracing::debug!(
                    pattern = %def.name,
                    "Rewrite strategy on a block-level pattern is never applied"
                );
            }
            _ => {}
        }

        Ok(Self {
            name: def.name.clone(),
            violation_type: def.violation_type,
            severity: def.severity,
            rewrite: def.rewrite,
            weight: def.weight,
            matcher: Matcher::compile(&def.matcher)?,
            description: def.description.clone(),
        })
    }
}

/// Immutable, ordered catalog of detectors
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    sensitive: Vec<SensitivePattern>,
    violations: Vec<ViolationPattern>,
    diagnostics: Vec<Diagnostic>,
}

impl PatternLibrary {
    /// Library holding only the built-in catalogs
    pub fn builtin() -> Self {
        Self::from_definitions(default_sensitive_patterns(), default_violation_patterns())
    }

    /// Built-in catalogs followed by deployment-specific extensions
    pub fn with_extensions(
        extra_sensitive: &[SensitivePatternDef],
        extra_violations: &[ViolationPatternDef],
    ) -> Self {
        let mut sensitive = default_sensitive_patterns();
        sensitive.extend_from_slice(extra_sensitive);
        let mut violations = default_violation_patterns();
        violations.extend_from_slice(extra_violations);
        Self::from_definitions(sensitive, violations)
    }

    /// Compile definitions in order, skipping (and recording) broken ones
    pub fn from_definitions(
        sensitive: Vec<SensitivePatternDef>,
        violations: Vec<ViolationPatternDef>,
    ) -> Self {
        let mut diagnostics = Vec::new();

        let sensitive = sensitive
            .iter()
            .filter_map(|def| match SensitivePattern::compile(def) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::error!(pattern = %def.name, error = %e, "Skipping sensitive pattern");
                    diagnostics.push(Diagnostic::from_error(&def.name, &e));
                    None
                }
            })
            .collect();

        let violations = violations
            .iter()
            .filter_map(|def| match ViolationPattern::compile(def) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::error!(pattern = %def.name, error = %e, "Skipping violation pattern");
                    diagnostics.push(Diagnostic::from_error(&def.name, &e));
                    None
                }
            })
            .collect();

        Self {
            sensitive,
            violations,
            diagnostics,
        }
    }

    /// Sensitive-data detectors in library order
    pub fn list_sensitive_patterns(&self) -> &[SensitivePattern] {
        &self.sensitive
    }

    /// Violation detectors in library order
    pub fn list_violation_patterns(&self) -> &[ViolationPattern] {
        &self.violations
    }

    /// Violation detectors of one type, in library order
    pub fn violation_patterns_for(
        &self,
        violation_type: ViolationType,
    ) -> impl Iterator<Item = &ViolationPattern> {
        self.violations
            .iter()
            .filter(move |p| p.violation_type == violation_type)
    }

    /// Faults recorded while building the library
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---- Sensitive-data catalog ----

/// Built-in sensitive-data patterns, in library order
pub fn default_sensitive_patterns() -> Vec<SensitivePatternDef> {
    vec![
        SensitivePatternDef {
            name: "ssn".to_string(),
            category: SensitiveCategory::Ssn,
            risk_tier: RiskTier::High,
            matcher: MatcherDef::regex(r"\b\d{3}-?\d{2}-?\d{4}\b"),
            description: "Social Security Number".to_string(),
        },
        SensitivePatternDef {
            name: "credit_card".to_string(),
            category: SensitiveCategory::CreditCard,
            risk_tier: RiskTier::High,
            matcher: MatcherDef::validated_regex(
                r"\b(?:\d{4}[\s-]?){3}\d{4}\b",
                Validator::Luhn,
            ),
            description: "Credit card number (16 digits, Luhn-valid)".to_string(),
        },
        SensitivePatternDef {
            name: "credit_card_amex".to_string(),
            category: SensitiveCategory::CreditCard,
            risk_tier: RiskTier::High,
            matcher: MatcherDef::validated_regex(
                r"\b3[47]\d{2}[\s-]?\d{6}[\s-]?\d{5}\b",
                Validator::Luhn,
            ),
            description: "American Express card number".to_string(),
        },
        SensitivePatternDef {
            name: "account_number".to_string(),
            category: SensitiveCategory::AccountNumber,
            risk_tier: RiskTier::High,
            matcher: MatcherDef::regex(
                r"(?i)\b(?:account|acct|routing)(?:\s*(?:number|num|no\.?|#))?\s*[:#]?\s*(\d{6,17})\b",
            ),
            description: "Bank account or routing number".to_string(),
        },
        SensitivePatternDef {
            name: "email".to_string(),
            category: SensitiveCategory::Email,
            risk_tier: RiskTier::Medium,
            matcher: MatcherDef::regex(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
            description: "Email address".to_string(),
        },
        SensitivePatternDef {
            name: "phone".to_string(),
            category: SensitiveCategory::Phone,
            risk_tier: RiskTier::Medium,
            matcher: MatcherDef::regex(r"(?:\(\d{3}\)\s*|\b\d{3}[-.]?)\d{3}[-.]?\d{4}\b"),
            description: "Phone number".to_string(),
        },
        SensitivePatternDef {
            name: "address".to_string(),
            category: SensitiveCategory::Address,
            risk_tier: RiskTier::Low,
            matcher: MatcherDef::regex(
                r"\b\d{1,6}\s+(?:[A-Z][a-z]+\s+){1,4}(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd|Court|Ct|Way)\b",
            ),
            description: "Street address".to_string(),
        },
        SensitivePatternDef {
            name: "name".to_string(),
            category: SensitiveCategory::Name,
            risk_tier: RiskTier::Low,
            matcher: MatcherDef::regex(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b"),
            description: "Personal name (capitalized word pair)".to_string(),
        },
    ]
}

// ---- Violation catalog ----

/// Built-in violation patterns, in library order
pub fn default_violation_patterns() -> Vec<ViolationPatternDef> {
    vec![
        // Financial advice: always blocks
        ViolationPatternDef {
            name: "directive_to_trade".to_string(),
            violation_type: ViolationType::FinancialAdvice,
            severity: Severity::Block,
            rewrite: RewriteStrategy::None,
            weight: 0.5,
            matcher: MatcherDef::regex(
                r"(?i)\byou\s+(?:should|must|need\s+to|have\s+to|ought\s+to)\s+(?:definitely\s+|really\s+|absolutely\s+)?(?:invest|buy|sell|short)\b",
            ),
            description: "Direct instruction to trade".to_string(),
        },
        ViolationPatternDef {
            name: "guaranteed_return".to_string(),
            violation_type: ViolationType::FinancialAdvice,
            severity: Severity::Block,
            rewrite: RewriteStrategy::None,
            weight: 0.6,
            matcher: MatcherDef::regex(
                r"(?i)\bguarantee[ds]?\s+(?:an?\s+)?(?:\d+(?:\.\d+)?%\s+)?(?:returns?|profits?|gains?|income|payouts?)\b",
            ),
            description: "Guaranteed-return language".to_string(),
        },
        ViolationPatternDef {
            name: "no_risk_claim".to_string(),
            violation_type: ViolationType::FinancialAdvice,
            severity: Severity::Block,
            rewrite: RewriteStrategy::None,
            weight: 0.5,
            matcher: MatcherDef::regex(
                r"(?i)\b(?:risk[-\s]free\s+(?:investment|return|profit)s?|can'?t\s+lose|cannot\s+lose|no[-\s]risk|double\s+your\s+money|triple\s+your\s+money)\b",
            ),
            description: "Claims of riskless profit".to_string(),
        },
        ViolationPatternDef {
            name: "personal_recommendation".to_string(),
            violation_type: ViolationType::FinancialAdvice,
            severity: Severity::Block,
            rewrite: RewriteStrategy::None,
            weight: 0.5,
            matcher: MatcherDef::regex(
                r"(?i)\bi\s+(?:strongly\s+)?(?:recommend|advise)\s+(?:that\s+you\s+|you\s+)?(?:buy|buying|invest|investing|sell|selling)\b",
            ),
            description: "Personal investment recommendation".to_string(),
        },
        ViolationPatternDef {
            name: "urgency_to_trade".to_string(),
            violation_type: ViolationType::FinancialAdvice,
            severity: Severity::Block,
            rewrite: RewriteStrategy::None,
            weight: 0.3,
            matcher: MatcherDef::regex(
                r"(?i)\b(?:buy|invest|sell)\b[^.!?]{0,40}?\b(?:right\s+now|immediately|today|before\s+it'?s\s+too\s+late)\b",
            ),
            description: "Pressure to trade immediately".to_string(),
        },
        // Unverified data: clause replaced with the disclaimer
        ViolationPatternDef {
            name: "claimed_insider_access".to_string(),
            violation_type: ViolationType::UnverifiedData,
            severity: Severity::Rewrite,
            rewrite: RewriteStrategy::Disclaimer,
            weight: 0.7,
            matcher: MatcherDef::regex(
                r"(?i)\b(?:i|we)\s+(?:have|got|possess)\s+(?:some\s+|access\s+to\s+)?(?:(?:confidential|insider|inside|secret|non-public|private|exclusive)\s+)+(?:data|information|info|tips?|knowledge|sources?|intel)\b",
            ),
            description: "Speaker claims access to non-public information".to_string(),
        },
        ViolationPatternDef {
            name: "insider_information".to_string(),
            violation_type: ViolationType::UnverifiedData,
            severity: Severity::Rewrite,
            rewrite: RewriteStrategy::Disclaimer,
            weight: 0.6,
            matcher: MatcherDef::regex(
                r"(?i)\b(?:(?:confidential|insider|inside|non-public|secret)\s+)+(?:data|information|info|tips?|knowledge|sources?|intel)\b",
            ),
            description: "Reference to insider or confidential information".to_string(),
        },
        ViolationPatternDef {
            name: "unverifiable_assurance".to_string(),
            violation_type: ViolationType::UnverifiedData,
            severity: Severity::Rewrite,
            rewrite: RewriteStrategy::Disclaimer,
            weight: 0.4,
            matcher: MatcherDef::phrases(&[
                "trust me",
                "take my word for it",
                "sources tell me",
                "i heard from an insider",
                "off the record",
            ]),
            description: "Appeal to unverifiable authority".to_string(),
        },
        ViolationPatternDef {
            name: "price_prediction".to_string(),
            violation_type: ViolationType::UnverifiedData,
            severity: Severity::Rewrite,
            rewrite: RewriteStrategy::Disclaimer,
            weight: 0.5,
            matcher: MatcherDef::regex(
                r"(?i)\b(?:will|is\s+going\s+to|are\s+going\s+to|hits?|reach(?:es)?|soars?\s+to|jumps?\s+to)\s+(?:hit\s+|reach\s+)?\$?\d[\d,]*(?:\.\d+)?\s?[kmb%]?\s+(?:by|next|this|within|before)\s+\w+",
            ),
            description: "Dated price prediction".to_string(),
        },
    ]
}
