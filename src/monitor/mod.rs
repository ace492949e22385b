//! Verdict aggregation and traffic monitoring
//!
//! The aggregator turns component outputs into a verdict and keeps the
//! day counters current through an injected [`StatsStore`]. The anomaly
//! detector watches source snapshots and call streams.

pub mod aggregator;
pub mod anomaly;
pub mod stats;

pub use aggregator::{Aggregation, DecisionAggregator};
pub use anomaly::{AnomalyDetector, AnomalyKind, ApiSourceSnapshot};
pub use stats::{InMemoryStatsStore, MonitoringStats, StatsStore};
