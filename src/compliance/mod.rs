//! Compliance rules
//!
//! Caller-owned rule records, their typed configuration, the stateless rule
//! engine that evaluates them per call, and batch transaction checks.

pub mod engine;
pub mod rules;
pub mod transactions;

pub use engine::{RuleEngine, RuleEvaluation};
pub use rules::{
    default_rules, ComplianceRule, ConsentConfig, CustomPredicate, ParsedRule,
    PiiDetectionConfig, RateLimitConfig, RuleAction, RuleKind, RuleType,
};
pub use transactions::{Transaction, TransactionCheck, TransactionMonitor};
