//! Pattern library
//!
//! Ordered catalogs of sensitive-data and violation detectors, plus the pure
//! span matchers they are built from.

pub mod library;
pub mod matcher;

pub use library::{
    default_sensitive_patterns, default_violation_patterns, PatternLibrary, RewriteStrategy,
    RiskTier, SensitiveCategory, SensitivePattern, SensitivePatternDef, Severity, ViolationPattern,
    ViolationPatternDef, ViolationType,
};
pub use matcher::{luhn_valid, replace_spans, Matcher, MatcherDef, Span, Validator};
