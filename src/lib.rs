//! GuardDog - Risk classification and decision engine
//!
//! GuardDog sits beside a financial application's outbound API and
//! AI-model traffic. It classifies sensitive data in payloads, evaluates
//! caller-owned compliance rules against each call, scans generated text
//! for regulated violations, and folds everything into one decision:
//! allow, rewrite or block.
//!
//! ## Architecture
//!
//! ```text
//!            CallEvent + rules                 generated content
//!                   │                                 │
//!      ┌────────────▼────────────┐                    │
//!      │     Data Classifier     │◄─── Pattern ───┐   │
//!      │  (sensitive findings)   │     Library    │   │
//!      └────────────┬────────────┘                │   │
//!                   │                   ┌─────────▼───▼──────────┐
//!      ┌────────────▼────────────┐      │  Content Risk Scanner  │
//!      │       Rule Engine       │      │ (advice / claims / PII) │
//!      │ (alerts, block requests)│      └───────────┬────────────┘
//!      └────────────┬────────────┘                  │
//!                   └──────────────┬────────────────┘
//!                     ┌────────────▼────────────┐
//!                     │   Decision Aggregator   │──► stats store
//!                     │ block > rewrite > allow │
//!                     └────────────┬────────────┘
//!                                  ▼
//!                 Verdict + AlertRecords + IncidentRecords
//! ```
//!
//! Every component is a pure function of its inputs plus the immutable
//! pattern library. Persistence of alerts and incidents belongs to the
//! caller; only the daily counters live behind [`monitor::StatsStore`].
//!
//! ## Modules
//!
//! - [`patterns`]: Sensitive-data and violation pattern catalogs
//! - [`privacy`]: Data classification and redaction
//! - [`compliance`]: Rule engine and transaction checks
//! - [`leakage`]: Content risk scanning and rewriting
//! - [`monitor`]: Decision aggregation, counters and anomaly heuristics
//! - [`engine`]: The facade wiring it all together
//! - [`api`]: Wire types for `scan-content` and `monitor-call`
//! - [`config`]: Configuration management

pub mod api;
pub mod compliance;
pub mod config;
pub mod engine;
pub mod error;
pub mod leakage;
pub mod monitor;
pub mod patterns;
pub mod privacy;
pub mod types;

pub use config::GuardDogConfig;
pub use engine::{Evaluation, GuardEngine};
pub use error::{Error, Result};
pub use types::{AlertRecord, CallEvent, Decision, Diagnostic, IncidentRecord, Verdict};
