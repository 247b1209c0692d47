//! Scheduled notification execution for vulnwatch.
//!
//! This crate provides:
//! - Store traits consumed by the executor (`EventStore`, `RuleStore`)
//! - `EventAggregator` turning a time window into overview/summary/details
//! - `RuleExecutor` orchestrating per-group dispatch and the watermark
//! - Outcome aggregation and the pure watermark-advance decision
//! - In-memory store implementations for tests and the local harness

pub mod aggregate;
pub mod executor;
pub mod memory;
pub mod observer;
pub mod outcome;
pub mod store;

pub use aggregate::{AggregationError, EventAggregator};
pub use executor::{ExecuteError, RuleExecutor};
pub use memory::{MemoryEventStore, MemoryRuleStore};
pub use observer::{RunObserver, TracingObserver};
pub use outcome::{decide_watermark, GroupError, GroupOutcome, RunReport, WatermarkDecision};
pub use store::{EventStore, RuleStore, RuleStoreError, StoreError};
