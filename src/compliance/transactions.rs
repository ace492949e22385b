//! Transaction compliance checks
//!
//! Transactions are opaque upstream records; only `amount` and a timestamp
//! are read. Two checks run over a batch in arrival order: a single-amount
//! threshold and a rolling-window velocity check.

use crate::config::TransactionRulesConfig;
use crate::types::{value_as_f64, AlertRecord, RecordOrigin};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// Which transaction check produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCheck {
    HighValueTransaction,
    RapidTransactions,
}

impl std::fmt::Display for TransactionCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighValueTransaction => write!(f, "high_value_transaction"),
            Self::RapidTransactions => write!(f, "rapid_transactions"),
        }
    }
}

/// One upstream transaction record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, alias = "transaction_id", alias = "transactionId")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default, alias = "date")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).unwrap_or(0.0))
}

impl Transaction {
    pub fn new(amount: f64) -> Self {
        Self {
            id: None,
            amount,
            timestamp: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp.to_rfc3339());
        self
    }

    /// Parsed timestamp. Naive timestamps and bare dates are taken as UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|n| n.and_utc())
    }
}

/// Runs the configured transaction checks over a batch
#[derive(Debug, Clone)]
pub struct TransactionMonitor {
    config: TransactionRulesConfig,
}

impl TransactionMonitor {
    pub fn new(config: TransactionRulesConfig) -> Self {
        Self { config }
    }

    /// Scan transactions in order and return one alert per violation
    pub fn scan(&self, transactions: &[Transaction], source: &str) -> Vec<AlertRecord> {
        let mut alerts = Vec::new();
        if !self.config.enabled {
            return alerts;
        }

        let rapid = self.config.rapid.as_ref().and_then(|rapid| {
            let span = Duration::try_minutes(rapid.window_minutes);
            if span.is_none() {
                tracing::warn!(
                    window_minutes = rapid.window_minutes,
                    "Rapid transaction window out of range, check skipped"
                );
            }
            span.map(|span| (rapid, span))
        });
        let mut window: VecDeque<DateTime<Utc>> = VecDeque::new();

        for tx in transactions {
            if let Some(high) = &self.config.high_value {
                if tx.amount > high.threshold {
                    alerts.push(
                        AlertRecord::new(
                            high.severity,
                            source,
                            origin(TransactionCheck::HighValueTransaction, tx),
                            format!(
                                "Transaction amount {:.2} exceeds {:.2}",
                                tx.amount, high.threshold
                            ),
                        )
                        .detail("amount", tx.amount)
                        .detail("threshold", high.threshold),
                    );
                }
            }

            let (Some((rapid, span)), Some(ts)) = (rapid, tx.parsed_timestamp()) else {
                continue;
            };

            if rapid.window_minutes > 0 {
                // Past the start of time every earlier transaction is in the window
                if let Some(cutoff) = ts.checked_sub_signed(span) {
                    window.retain(|t| *t >= cutoff);
                }
            }
            window.push_back(ts);

            if rapid.count > 0 && window.len() > rapid.count {
                alerts.push(
                    AlertRecord::new(
                        rapid.severity,
                        source,
                        origin(TransactionCheck::RapidTransactions, tx),
                        format!(
                            "{} transactions within {} minutes exceeds {}",
                            window.len(),
                            rapid.window_minutes,
                            rapid.count
                        ),
                    )
                    .detail("transactionCount", window.len())
                    .detail("threshold", rapid.count)
                    .detail("windowMinutes", rapid.window_minutes),
                );
            }
        }

        if !alerts.is_empty() {
            tracing::info!(
                source = source,
                transactions = transactions.len(),
                alerts = alerts.len(),
                "Transaction checks raised alerts"
            );
        }
        alerts
    }
}

fn origin(check: TransactionCheck, tx: &Transaction) -> RecordOrigin {
    RecordOrigin::Transaction {
        check,
        transaction_id: tx.id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HighValueConfig, RapidTransactionsConfig};
    use crate::types::AlertSeverity;
    use chrono::TimeZone;

    fn monitor() -> TransactionMonitor {
        TransactionMonitor::new(TransactionRulesConfig {
            enabled: true,
            high_value: Some(HighValueConfig {
                threshold: 10_000.0,
                severity: AlertSeverity::High,
            }),
            rapid: Some(RapidTransactionsConfig {
                count: 3,
                window_minutes: 60,
                severity: AlertSeverity::Critical,
            }),
        })
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, minute, 0).unwrap()
    }

    #[test]
    fn test_high_value_transaction() {
        let txs = vec![
            Transaction::new(5_000.0).with_id("t1"),
            Transaction::new(15_000.0).with_id("t2"),
        ];
        let alerts = monitor().scan(&txs, "plaid");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
        assert_eq!(
            alerts[0].origin,
            RecordOrigin::Transaction {
                check: TransactionCheck::HighValueTransaction,
                transaction_id: Some("t2".to_string()),
            }
        );
    }

    #[test]
    fn test_rapid_transactions_window() {
        let txs: Vec<Transaction> = (0..5).map(|i| Transaction::new(10.0).at(at(i * 5))).collect();
        let alerts = monitor().scan(&txs, "plaid");
        // 4th and 5th transactions push the window past 3
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Critical));
    }

    #[test]
    fn test_rapid_window_expires() {
        let txs = vec![
            Transaction::new(10.0).at(at(0)),
            Transaction::new(10.0).at(at(1)),
            Transaction::new(10.0).at(at(2)),
            Transaction::new(10.0).at(Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()),
        ];
        assert!(monitor().scan(&txs, "plaid").is_empty());
    }

    #[test]
    fn test_huge_window_counts_everything() {
        let mut config = monitor().config;
        if let Some(rapid) = config.rapid.as_mut() {
            rapid.window_minutes = Duration::MAX.num_minutes();
        }
        let txs: Vec<Transaction> = (0..4).map(|i| Transaction::new(10.0).at(at(i))).collect();
        let alerts = TransactionMonitor::new(config).scan(&txs, "ledger");
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn test_unrepresentable_window_skips_rapid_check() {
        let mut config = monitor().config;
        if let Some(rapid) = config.rapid.as_mut() {
            rapid.count = 1;
            rapid.window_minutes = i64::MAX;
        }
        let txs = vec![
            Transaction::new(20_000.0).at(at(0)),
            Transaction::new(10.0).at(at(1)),
        ];
        let alerts = TransactionMonitor::new(config).scan(&txs, "ledger");
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].origin,
            RecordOrigin::Transaction {
                check: TransactionCheck::HighValueTransaction,
                transaction_id: None,
            }
        );
    }

    #[test]
    fn test_missing_timestamp_skips_rapid_check() {
        let txs: Vec<Transaction> = (0..6).map(|_| Transaction::new(1.0)).collect();
        assert!(monitor().scan(&txs, "plaid").is_empty());
    }

    #[test]
    fn test_disabled_monitor() {
        let mut config = monitor().config;
        config.enabled = false;
        let txs = vec![Transaction::new(1_000_000.0)];
        assert!(TransactionMonitor::new(config).scan(&txs, "plaid").is_empty());
    }

    #[test]
    fn test_deserialize_upstream_shapes() {
        let txs: Vec<Transaction> = serde_json::from_str(
            r#"[
                {"transaction_id": "a", "amount": "12000.50", "date": "2026-03-02"},
                {"amount": 5, "timestamp": "2026-03-02T10:00:00", "merchant": "ACME"}
            ]"#,
        )
        .unwrap();
        assert_eq!(txs[0].id.as_deref(), Some("a"));
        assert_eq!(txs[0].amount, 12000.5);
        assert!(txs[0].parsed_timestamp().is_some());
        assert!(txs[1].parsed_timestamp().is_some());
        assert_eq!(txs[1].extra["merchant"], "ACME");
    }
}
