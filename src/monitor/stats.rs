//! Day-scoped monitoring counters

use crate::types::Decision;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Counter snapshot for one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStats {
    pub day: NaiveDate,
    pub scanned: u64,
    /// Evaluations whose decision was not allow
    pub flagged: u64,
    pub blocked: u64,
}

impl MonitoringStats {
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            scanned: 0,
            flagged: 0,
            blocked: 0,
        }
    }
}

/// Counter store injected into the aggregator.
///
/// Implementations must tolerate concurrent `record` calls; resetting a day
/// is the caller's scheduling concern.
pub trait StatsStore: Send + Sync {
    fn record(&self, day: NaiveDate, decision: Decision);

    fn snapshot(&self, day: NaiveDate) -> MonitoringStats;

    /// Drop one day's counters. Stores keep every recorded day until it is
    /// reset, so long-running callers must reset past days themselves.
    fn reset(&self, day: NaiveDate);
}

#[derive(Debug, Default)]
struct DayCounters {
    scanned: AtomicU64,
    flagged: AtomicU64,
    blocked: AtomicU64,
}

/// In-process store: a mutex guards day-slot lookup, counters are atomic
#[derive(Debug, Default)]
pub struct InMemoryStatsStore {
    days: Mutex<HashMap<NaiveDate, Arc<DayCounters>>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every day before `day`
    pub fn prune_before(&self, day: NaiveDate) {
        let mut days = self.days.lock().unwrap_or_else(|e| e.into_inner());
        days.retain(|d, _| *d >= day);
    }

    fn slot(&self, day: NaiveDate) -> Arc<DayCounters> {
        let mut days = self.days.lock().unwrap_or_else(|e| e.into_inner());
        days.entry(day).or_default().clone()
    }
}

impl StatsStore for InMemoryStatsStore {
    fn record(&self, day: NaiveDate, decision: Decision) {
        let counters = self.slot(day);
        counters.scanned.fetch_add(1, Ordering::Relaxed);
        if decision != Decision::Allow {
            counters.flagged.fetch_add(1, Ordering::Relaxed);
        }
        if decision == Decision::Block {
            counters.blocked.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self, day: NaiveDate) -> MonitoringStats {
        let days = self.days.lock().unwrap_or_else(|e| e.into_inner());
        match days.get(&day) {
            Some(c) => MonitoringStats {
                day,
                scanned: c.scanned.load(Ordering::Relaxed),
                flagged: c.flagged.load(Ordering::Relaxed),
                blocked: c.blocked.load(Ordering::Relaxed),
            },
            None => MonitoringStats::empty(day),
        }
    }

    fn reset(&self, day: NaiveDate) {
        let mut days = self.days.lock().unwrap_or_else(|e| e.into_inner());
        days.remove(&day);
    }
}
