//! Sensitive data classification
//!
//! Detects PII and financial identifiers in call payloads and produces
//! findings that carry a fixed mask instead of the matched text.

pub mod classifier;

pub use classifier::{dedupe_findings, highest_tier, DataClassifier, SensitiveFinding, CONTENT_FIELD};
