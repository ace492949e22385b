//! Traffic anomaly detection
//!
//! Heuristics over API source snapshots and recent call events: volume
//! spikes, degraded sources, escalated alert status, stale sources,
//! off-hours traffic and IP/country concentration. Every anomaly is emitted
//! as an [`AlertRecord`] with an anomaly origin.

use crate::config::AnomalyThresholds;
use crate::types::{AlertRecord, AlertSeverity, CallEvent, RecordOrigin};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TEMPORAL_SOURCE: &str = "Temporal Analysis";
const GEOGRAPHIC_SOURCE: &str = "Geographic Analysis";

/// Kind of detected anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    VolumeSpike,
    ServiceStatus,
    AlertEscalation,
    StaleData,
    UnusualTiming,
    IpConcentration,
    GeographicSpread,
}

/// Point-in-time view of one monitored API source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSourceSnapshot {
    pub name: String,
    #[serde(default)]
    pub calls_today: u64,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_alert_status")]
    pub alert_status: String,
    /// RFC 3339; unparseable values skip the staleness check
    #[serde(default)]
    pub last_activity: Option<String>,
}

fn default_status() -> String {
    "unknown".to_string()
}

fn default_alert_status() -> String {
    "normal".to_string()
}

impl ApiSourceSnapshot {
    pub fn new(name: impl Into<String>, calls_today: u64) -> Self {
        Self {
            name: name.into(),
            calls_today,
            status: "active".to_string(),
            alert_status: default_alert_status(),
            last_activity: None,
        }
    }

    fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_activity.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// Threshold-driven anomaly heuristics
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    /// Per-source checks against the fleet's mean daily volume
    pub fn detect_source_anomalies(
        &self,
        sources: &[ApiSourceSnapshot],
        now: DateTime<Utc>,
    ) -> Vec<AlertRecord> {
        let mean = if sources.is_empty() {
            0.0
        } else {
            sources.iter().map(|s| s.calls_today as f64).sum::<f64>() / sources.len() as f64
        };

        let mut alerts = Vec::new();
        for source in sources {
            let calls = source.calls_today as f64;

            if mean > 0.0 && calls > mean * self.thresholds.call_volume_multiplier {
                let severity = if calls >= mean * self.thresholds.critical_volume_multiplier {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                };
                alerts.push(
                    anomaly(
                        severity,
                        &source.name,
                        AnomalyKind::VolumeSpike,
                        format!(
                            "{} has {} calls today, {:.1}x the average",
                            source.name,
                            source.calls_today,
                            calls / mean
                        ),
                        now,
                    )
                    .detail("currentCalls", source.calls_today)
                    .detail("averageCalls", mean)
                    .detail("multiplier", calls / mean),
                );
            }

            if source.status != "active" {
                let severity = if source.status == "down" {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                };
                alerts.push(
                    anomaly(
                        severity,
                        &source.name,
                        AnomalyKind::ServiceStatus,
                        format!("{} status is {}", source.name, source.status),
                        now,
                    )
                    .detail("status", source.status.clone()),
                );
            }

            if source.alert_status != "normal" {
                let severity = if source.alert_status == "critical" {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                };
                alerts.push(
                    anomaly(
                        severity,
                        &source.name,
                        AnomalyKind::AlertEscalation,
                        format!(
                            "{} alert status escalated to {}",
                            source.name, source.alert_status
                        ),
                        now,
                    )
                    .detail("alertStatus", source.alert_status.clone()),
                );
            }

            let stale_after = chrono::Duration::try_hours(self.thresholds.stale_after_hours);
            if let (Some(last), Some(stale_after)) = (source.last_activity_at(), stale_after) {
                let idle = now - last;
                if idle > stale_after {
                    let hours = idle.num_seconds() as f64 / 3600.0;
                    alerts.push(
                        anomaly(
                            AlertSeverity::Warning,
                            &source.name,
                            AnomalyKind::StaleData,
                            format!(
                                "{} has not reported activity for {:.1} hours",
                                source.name, hours
                            ),
                            now,
                        )
                        .detail("hoursSinceActivity", hours),
                    );
                }
            }
        }

        if !alerts.is_empty() {
            tracing::info!(
                sources = sources.len(),
                anomalies = alerts.len(),
                "Source anomalies detected"
            );
        }
        alerts
    }

    /// Share of calls landing outside business hours (UTC, inclusive)
    pub fn detect_temporal_anomalies(&self, events: &[CallEvent]) -> Vec<AlertRecord> {
        if events.is_empty() {
            return Vec::new();
        }

        let total = events.len();
        let in_hours = events
            .iter()
            .filter(|e| {
                let hour = e.timestamp.hour();
                hour >= self.thresholds.business_start_hour
                    && hour <= self.thresholds.business_end_hour
            })
            .count();
        let ratio = in_hours as f64 / total as f64;

        if ratio >= 1.0 - self.thresholds.unusual_hour_ratio {
            return Vec::new();
        }

        let latest = events.iter().map(|e| e.timestamp).max().unwrap_or_else(Utc::now);
        vec![anomaly(
            AlertSeverity::Warning,
            TEMPORAL_SOURCE,
            AnomalyKind::UnusualTiming,
            format!(
                "{:.1}% of API calls occurred outside business hours",
                (1.0 - ratio) * 100.0
            ),
            latest,
        )
        .detail("businessHoursRatio", ratio)
        .detail("totalCalls", total)
        .detail("nonBusinessCalls", total - in_hours)]
    }

    /// IP concentration and country spread, read from `clientIp` / `country`
    pub fn detect_geographic_anomalies(&self, events: &[CallEvent]) -> Vec<AlertRecord> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut ips: BTreeMap<&str, usize> = BTreeMap::new();
        let mut countries: BTreeMap<&str, usize> = BTreeMap::new();
        for event in events {
            let ip = event
                .metadata_str("clientIp")
                .or_else(|| event.metadata_str("clientIP"))
                .unwrap_or("unknown");
            let country = event.metadata_str("country").unwrap_or("unknown");
            *ips.entry(ip).or_default() += 1;
            *countries.entry(country).or_default() += 1;
        }

        let total = events.len();
        let latest = events.iter().map(|e| e.timestamp).max().unwrap_or_else(Utc::now);
        let mut alerts = Vec::new();

        for (ip, count) in &ips {
            if *count as f64 > total as f64 * self.thresholds.ip_concentration_ratio {
                let percentage = *count as f64 / total as f64 * 100.0;
                alerts.push(
                    anomaly(
                        AlertSeverity::Warning,
                        GEOGRAPHIC_SOURCE,
                        AnomalyKind::IpConcentration,
                        format!(
                            "Single IP {} made {} calls ({:.1}% of total)",
                            ip, count, percentage
                        ),
                        latest,
                    )
                    .detail("ipAddress", *ip)
                    .detail("callCount", *count)
                    .detail("percentage", percentage),
                );
            }
        }

        if countries.len() > self.thresholds.country_spread_limit {
            alerts.push(
                anomaly(
                    AlertSeverity::Info,
                    GEOGRAPHIC_SOURCE,
                    AnomalyKind::GeographicSpread,
                    format!(
                        "API calls received from {} different countries",
                        countries.len()
                    ),
                    latest,
                )
                .detail("countryCount", countries.len())
                .detail(
                    "countries",
                    countries.keys().map(|c| c.to_string()).collect::<Vec<_>>(),
                ),
            );
        }

        alerts
    }
}

fn anomaly(
    severity: AlertSeverity,
    source: &str,
    kind: AnomalyKind,
    description: String,
    at: DateTime<Utc>,
) -> AlertRecord {
    AlertRecord::new(severity, source, RecordOrigin::Anomaly { anomaly: kind }, description).at(at)
}
