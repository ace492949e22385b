//! GuardDog configuration management

use crate::error::{Error, Result};
use crate::leakage::DEFAULT_DISCLAIMER;
use crate::patterns::{PatternLibrary, RiskTier, SensitivePatternDef, ViolationPatternDef};
use crate::types::AlertSeverity;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main GuardDog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardDogConfig {
    /// Input limits
    #[serde(default)]
    pub engine: EngineConfig,

    /// Data classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Content scanner configuration
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Transaction compliance checks
    #[serde(default)]
    pub transactions: TransactionRulesConfig,

    /// Anomaly detection thresholds
    #[serde(default)]
    pub anomaly: AnomalyThresholds,
}

/// Engine input limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest content accepted, in bytes
    pub max_content_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: 256 * 1024,
        }
    }
}

/// Data classifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Deployment-specific sensitive-data patterns, appended after the built-ins
    #[serde(default)]
    pub extra_patterns: Vec<SensitivePatternDef>,
}

/// Content scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Replacement text for unverified claims
    pub disclaimer: String,

    /// Lowest finding tier that counts as leakage in generated output
    pub min_leak_tier: RiskTier,

    /// Inspect base64 blobs for encoded sensitive data
    pub scan_encoded: bool,

    /// Deployment-specific violation patterns, appended after the built-ins
    #[serde(default)]
    pub extra_patterns: Vec<ViolationPatternDef>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
            min_leak_tier: RiskTier::Medium,
            scan_encoded: true,
            extra_patterns: Vec::new(),
        }
    }
}

/// Transaction compliance configuration
///
/// Without a `[transactions]` section both checks run with defaults; inside
/// the section an omitted check is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRulesConfig {
    /// Run transaction checks at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Single-transaction amount threshold
    #[serde(default)]
    pub high_value: Option<HighValueConfig>,

    /// Rolling-window velocity check
    #[serde(default)]
    pub rapid: Option<RapidTransactionsConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for TransactionRulesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            high_value: Some(HighValueConfig::default()),
            rapid: Some(RapidTransactionsConfig::default()),
        }
    }
}

/// High-value transaction check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighValueConfig {
    pub threshold: f64,
    #[serde(default = "default_high")]
    pub severity: AlertSeverity,
}

fn default_high() -> AlertSeverity {
    AlertSeverity::High
}

impl Default for HighValueConfig {
    fn default() -> Self {
        Self {
            threshold: 10_000.0,
            severity: AlertSeverity::High,
        }
    }
}

/// Rapid-transactions check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RapidTransactionsConfig {
    /// Alert when the window holds more than this many transactions
    pub count: usize,
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
    #[serde(default = "default_critical")]
    pub severity: AlertSeverity,
}

fn default_window_minutes() -> i64 {
    60
}

fn default_critical() -> AlertSeverity {
    AlertSeverity::Critical
}

impl Default for RapidTransactionsConfig {
    fn default() -> Self {
        Self {
            count: 10,
            window_minutes: default_window_minutes(),
            severity: AlertSeverity::Critical,
        }
    }
}

/// Anomaly detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    /// Volume spike when calls exceed this multiple of the mean
    pub call_volume_multiplier: f64,
    /// Spike is critical at or above this multiple
    pub critical_volume_multiplier: f64,
    /// Tolerated share of calls outside business hours
    pub unusual_hour_ratio: f64,
    /// Source is stale after this many hours without activity
    pub stale_after_hours: i64,
    /// Single-IP share of calls that raises an alert
    pub ip_concentration_ratio: f64,
    /// Alert when calls come from more countries than this
    pub country_spread_limit: usize,
    /// Business hours, UTC, inclusive
    pub business_start_hour: u32,
    pub business_end_hour: u32,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            call_volume_multiplier: 3.0,
            critical_volume_multiplier: 5.0,
            unusual_hour_ratio: 0.1,
            stale_after_hours: 2,
            ip_concentration_ratio: 0.3,
            country_spread_limit: 10,
            business_start_hour: 9,
            business_end_hour: 18,
        }
    }
}

impl GuardDogConfig {
    /// Load and validate a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.engine.max_content_bytes == 0 {
            return Err(Error::Configuration(
                "engine.max_content_bytes must be positive".to_string(),
            ));
        }

        if self.scanner.disclaimer.trim().is_empty() {
            return Err(Error::Configuration(
                "scanner.disclaimer must not be empty".to_string(),
            ));
        }

        // A disclaimer that re-triggers a pattern would make rewrites unstable
        let library = self.build_library();
        let retriggers = library
            .list_violation_patterns()
            .iter()
            .map(|p| &p.matcher)
            .chain(library.list_sensitive_patterns().iter().map(|p| &p.matcher))
            .any(|m| m.is_match(&self.scanner.disclaimer));
        if retriggers {
            return Err(Error::Configuration(format!(
                "scanner.disclaimer '{}' matches a detection pattern",
                self.scanner.disclaimer
            )));
        }

        if let Some(rapid) = &self.transactions.rapid {
            if rapid.window_minutes < 0 || Duration::try_minutes(rapid.window_minutes).is_none() {
                return Err(Error::Configuration(format!(
                    "transactions.rapid.window_minutes {} is out of range",
                    rapid.window_minutes
                )));
            }
        }

        let a = &self.anomaly;
        if a.call_volume_multiplier <= 0.0 || a.critical_volume_multiplier < a.call_volume_multiplier
        {
            return Err(Error::Configuration(
                "anomaly volume multipliers must be positive and ordered".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&a.unusual_hour_ratio) || !(0.0..=1.0).contains(&a.ip_concentration_ratio)
        {
            return Err(Error::Configuration(
                "anomaly ratios must be within [0, 1]".to_string(),
            ));
        }
        if a.stale_after_hours < 0 || Duration::try_hours(a.stale_after_hours).is_none() {
            return Err(Error::Configuration(format!(
                "anomaly.stale_after_hours {} is out of range",
                a.stale_after_hours
            )));
        }
        if a.business_start_hour > a.business_end_hour || a.business_end_hour > 23 {
            return Err(Error::Configuration(
                "anomaly business hours must satisfy start <= end <= 23".to_string(),
            ));
        }

        Ok(())
    }

    /// Built-in catalogs plus this configuration's extra patterns
    pub fn build_library(&self) -> PatternLibrary {
        PatternLibrary::with_extensions(
            &self.classifier.extra_patterns,
            &self.scanner.extra_patterns,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GuardDogConfig::default();
        assert_eq!(config.engine.max_content_bytes, 262_144);
        assert_eq!(config.scanner.disclaimer, "[unverified claim removed]");
        assert_eq!(config.scanner.min_leak_tier, RiskTier::Medium);
        assert!(config.transactions.enabled);
        assert_eq!(config.anomaly.call_volume_multiplier, 3.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&GuardDogConfig::default()).unwrap();
        let parsed = GuardDogConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.engine.max_content_bytes, 262_144);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = GuardDogConfig::from_toml_str(
            r#"
            [scanner]
            disclaimer = "[claim withheld]"
            min_leak_tier = "high"
            scan_encoded = false
            "#,
        )
        .unwrap();
        assert_eq!(config.scanner.disclaimer, "[claim withheld]");
        assert_eq!(config.scanner.min_leak_tier, RiskTier::High);
        assert_eq!(config.engine.max_content_bytes, 262_144);
    }

    #[test]
    fn test_transaction_checks_individually_optional() {
        let config = GuardDogConfig::from_toml_str(
            r#"
            [transactions.high_value]
            threshold = 5000.0
            "#,
        )
        .unwrap();
        assert!(config.transactions.enabled);
        assert_eq!(config.transactions.high_value.unwrap().threshold, 5000.0);
        assert!(config.transactions.rapid.is_none());
    }

    #[test]
    fn test_extra_patterns_from_toml() {
        let config = GuardDogConfig::from_toml_str(
            r#"
            [[classifier.extra_patterns]]
            name = "employee_id"
            category = "other"
            risk_tier = "medium"
            matcher = { kind = "regex", pattern = "\\bEMP-\\d{6}\\b" }

            [[scanner.extra_patterns]]
            name = "rumor"
            violation_type = "unverified_data"
            severity = "rewrite"
            rewrite = "disclaimer"
            weight = 0.4
            matcher = { kind = "phrases", phrases = ["rumor has it"] }
            "#,
        )
        .unwrap();
        let library = config.build_library();
        assert!(library.diagnostics().is_empty());
        assert_eq!(
            library.list_sensitive_patterns().last().unwrap().name,
            "employee_id"
        );
        assert_eq!(library.list_violation_patterns().last().unwrap().name, "rumor");
    }

    #[test]
    fn test_retriggering_disclaimer_rejected() {
        let mut config = GuardDogConfig::default();
        config.scanner.disclaimer = "trust me".to_string();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.scanner.disclaimer = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_anomaly_thresholds_rejected() {
        let mut config = GuardDogConfig::default();
        config.anomaly.unusual_hour_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_durations_rejected() {
        let err = GuardDogConfig::from_toml_str(
            "[transactions.rapid]\ncount = 1\nwindow_minutes = 9223372036854775807\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err =
            GuardDogConfig::from_toml_str("[anomaly]\nstale_after_hours = 9223372036854775807\n")
                .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = GuardDogConfig::from_toml_str("[anomaly]\nstale_after_hours = -1\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let err = GuardDogConfig::from_toml_str("[engine\nmax_content_bytes = ").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nmax_content_bytes = 1024").unwrap();
        let config = GuardDogConfig::from_file(file.path()).unwrap();
        assert_eq!(config.engine.max_content_bytes, 1024);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GuardDogConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
