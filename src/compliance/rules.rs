//! Compliance rule records and their typed configuration
//!
//! A [`ComplianceRule`] arrives with an untyped JSON config map, the shape
//! the caller persists. Before evaluation each rule is parsed into a
//! [`ParsedRule`] whose [`RuleKind`] carries typed configuration, so the
//! engine dispatches through a single match instead of poking at maps.

use crate::error::{Error, Result};
use crate::patterns::{RiskTier, SensitiveCategory};
use crate::types::AlertSeverity;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Rule type discriminator as persisted by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    RateLimit,
    PiiDetection,
    ConsentType,
    Custom,
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "rate_limit"),
            Self::PiiDetection => write!(f, "pii_detection"),
            Self::ConsentType => write!(f, "consent_type"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// What a firing rule contributes to the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Flag only: emit an alert, leave the decision alone
    #[default]
    Alert,
    /// Emit an alert and force the verdict to block
    Block,
}

/// A configurable compliance policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rule_type: RuleType,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_triggered_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl ComplianceRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rule_type: RuleType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            rule_type,
            config: Map::new(),
            is_active: true,
            last_triggered_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
}

/// `rate_limit`: fires when `callsInWindow` exceeds the threshold
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateLimitConfig {
    pub threshold: f64,
}

/// `pii_detection`: fires on any finding at a watched tier
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiiDetectionConfig {
    #[serde(default = "default_watched_tiers", alias = "watched_tiers")]
    pub watched_tiers: BTreeSet<RiskTier>,
    /// Collapse category+span duplicates before counting
    #[serde(default)]
    pub dedupe: bool,
}

fn default_watched_tiers() -> BTreeSet<RiskTier> {
    BTreeSet::from([RiskTier::High])
}

/// `consent_type`: fires on regulated data without consent
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentConfig {
    #[serde(default = "default_regulated", alias = "regulated_categories")]
    pub regulated_categories: BTreeSet<SensitiveCategory>,
    #[serde(default = "default_regulation")]
    pub regulation: String,
}

fn default_regulated() -> BTreeSet<SensitiveCategory> {
    SensitiveCategory::personal().into_iter().collect()
}

fn default_regulation() -> String {
    "GDPR".to_string()
}

/// Built-in predicates available to `custom` rules
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "predicate", rename_all = "snake_case")]
pub enum CustomPredicate {
    MetadataEquals {
        key: String,
        value: Value,
    },
    MetadataExceeds {
        key: String,
        threshold: f64,
    },
    MetadataPresent {
        key: String,
    },
    /// Reads `metadata.amount`
    HighValueTransaction {
        threshold: f64,
    },
    /// Hours are UTC; the window is `[start_hour, end_hour)`
    OutsideBusinessHours {
        #[serde(default = "default_start_hour", alias = "startHour")]
        start_hour: u32,
        #[serde(default = "default_end_hour", alias = "endHour")]
        end_hour: u32,
    },
}

fn default_start_hour() -> u32 {
    9
}

fn default_end_hour() -> u32 {
    18
}

/// Typed rule configuration, one variant per rule type
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    RateLimit(RateLimitConfig),
    PiiDetection(PiiDetectionConfig),
    ConsentType(ConsentConfig),
    Custom(CustomPredicate),
}

#[derive(Debug, Default, Deserialize)]
struct RuleOptions {
    #[serde(default)]
    severity: AlertSeverity,
    #[serde(default)]
    action: RuleAction,
}

/// A rule whose configuration has been validated
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRule {
    pub kind: RuleKind,
    pub severity: AlertSeverity,
    pub action: RuleAction,
}

impl ParsedRule {
    /// Parse a rule's config map. Any malformed value is a configuration error.
    pub fn parse(rule: &ComplianceRule) -> Result<Self> {
        let options: RuleOptions = parse_config(rule)?;

        let kind = match rule.rule_type {
            RuleType::RateLimit => RuleKind::RateLimit(parse_config(rule)?),
            RuleType::PiiDetection => RuleKind::PiiDetection(parse_config(rule)?),
            RuleType::ConsentType => RuleKind::ConsentType(parse_config(rule)?),
            RuleType::Custom => {
                let predicate: CustomPredicate = parse_config(rule)?;
                if let CustomPredicate::OutsideBusinessHours {
                    start_hour,
                    end_hour,
                } = predicate
                {
                    if start_hour >= end_hour || end_hour > 24 {
                        return Err(Error::Configuration(format!(
                            "rule '{}': business hours {}..{} are not a valid UTC window",
                            rule.id, start_hour, end_hour
                        )));
                    }
                }
                RuleKind::Custom(predicate)
            }
        };

        Ok(Self {
            kind,
            severity: options.severity,
            action: options.action,
        })
    }
}

fn parse_config<T: DeserializeOwned>(rule: &ComplianceRule) -> Result<T> {
    serde_json::from_value(Value::Object(rule.config.clone()))
        .map_err(|e| Error::Configuration(format!("rule '{}': {}", rule.id, e)))
}

/// Starter rule set used when the caller supplies none
pub fn default_rules() -> Vec<ComplianceRule> {
    vec![
        ComplianceRule::new("rate-limit", "API rate limit", RuleType::RateLimit)
            .with_description("More than 100 calls in the current window")
            .with_config("threshold", 100),
        ComplianceRule::new("pii-high", "High-risk PII in traffic", RuleType::PiiDetection)
            .with_description("SSNs, card or account numbers in a payload")
            .with_config("watchedTiers", serde_json::json!(["high"]))
            .with_config("dedupe", true)
            .with_config("severity", "high"),
        ComplianceRule::new("gdpr-consent", "GDPR consent", RuleType::ConsentType)
            .with_description("Personal data processed without recorded consent")
            .with_config("regulation", "GDPR")
            .with_config("severity", "high"),
        ComplianceRule::new("high-value-txn", "High-value transaction", RuleType::Custom)
            .with_description("Transaction amount above 10,000")
            .with_config("predicate", "high_value_transaction")
            .with_config("threshold", 10_000)
            .with_config("severity", "high"),
    ]
}
