//! Store traits consumed by the executor.
//!
//! Timeout and cancellation handling belongs to the implementations; the
//! executor propagates their failures synchronously.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use vulnwatch_model::{EventGroup, EventRecord, ScheduledRule};

/// Event store failures. Any failure aborts the run in progress.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("event store unreachable: {0}")]
    Unreachable(String),

    #[error("event query failed: {0}")]
    Query(String),
}

/// Rule persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum RuleStoreError {
    #[error("scheduled rule {0} not found")]
    NotFound(Uuid),

    #[error("rule store error: {0}")]
    Backend(String),
}

/// Read access to the external event store.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// All events of `group` for one project with occurrence time strictly
    /// after `since`. The watermark is exclusive, so an event at exactly
    /// `since` must not be returned. Suppressed events are included only
    /// when `include_suppressed` is set. Ordering is store-defined but
    /// must be stable within a single call.
    async fn events_since(
        &self,
        project_id: Uuid,
        group: EventGroup,
        include_suppressed: bool,
        since: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, StoreError>;
}

/// Rule persistence as seen by the executor: load by id, write back the
/// watermark.
#[async_trait::async_trait]
pub trait RuleStore: Send + Sync {
    async fn load_rule(&self, id: Uuid) -> Result<ScheduledRule, RuleStoreError>;

    /// Advance the rule's last-execution timestamp. Implementations must
    /// never move the stored value backward.
    async fn advance_watermark(&self, id: Uuid, to: DateTime<Utc>) -> Result<(), RuleStoreError>;
}
