//! Generated-content leakage and risk scanning
//!
//! ```text
//! model output → PatternDetector (financial advice)   ─┐
//!              → PatternDetector (unverified data)    ─┼→ ContentScanner → ScanResult
//!              → PiiLeakDetector (plain + base64 PII) ─┘
//! ```

pub mod detector;
pub mod scanner;

pub use detector::{
    PatternDetector, PiiLeakDetector, ViolationDetector, ViolationMatch, DEFAULT_DISCLAIMER,
    ENCODED_PII_MASK,
};
pub use scanner::{ContentScanner, ScanResult};
