//! Per-group outcomes and the watermark-advance decision.
//!
//! Outcomes are collected as an ordered list during a run and reduced once
//! at the end by [`decide_watermark`] — there are no mutable accumulation
//! flags threaded through the group loop.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use vulnwatch_model::EventGroup;
use vulnwatch_publish::{DispatchError, PublishError, ResolutionError};

/// Errors failing a single group. They never abort sibling groups.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("group {0} is not supported for scheduled publishing")]
    UnsupportedGroup(EventGroup),

    #[error("malformed publisher configuration: {0}")]
    ConfigParse(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl From<DispatchError> for GroupError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::ConfigParse(msg) => GroupError::ConfigParse(msg),
            DispatchError::Resolution(e) => GroupError::Resolution(e),
            DispatchError::Publish(e) => GroupError::Publish(e),
        }
    }
}

/// Outcome of one configured group within one run.
#[derive(Debug)]
pub enum GroupOutcome {
    /// No new events and the rule suppresses empty runs; neither an error
    /// nor a success.
    Skipped,
    /// The group's message was delivered.
    Published,
    /// The group failed; the error is carried for logging.
    Failed(GroupError),
}

/// Whether the rule's last-execution timestamp moves after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkDecision {
    Advance,
    Hold,
}

/// Reduce a run's outcomes into the watermark decision.
///
/// Advance on a clean run, and on a run with errors provided at least one
/// group published — a single stuck publisher must not block delivery
/// progress for the others indefinitely. Hold only when something failed
/// and nothing was delivered, so the next tick retries the same window.
/// A run with no groups, or where every group was skipped, counts as clean.
pub fn decide_watermark<'a, I>(outcomes: I) -> WatermarkDecision
where
    I: IntoIterator<Item = &'a GroupOutcome>,
{
    let mut any_error = false;
    let mut any_success = false;
    for outcome in outcomes {
        match outcome {
            GroupOutcome::Failed(_) => any_error = true,
            GroupOutcome::Published => any_success = true,
            GroupOutcome::Skipped => {}
        }
    }
    if !any_error || any_success {
        WatermarkDecision::Advance
    } else {
        WatermarkDecision::Hold
    }
}

/// Transient record of one rule execution; drives logging only.
#[derive(Debug)]
pub struct RunReport {
    pub rule_id: Uuid,
    /// The shared exclusive window start captured before the group loop.
    pub window_start: DateTime<Utc>,
    pub outcomes: Vec<(EventGroup, GroupOutcome)>,
    pub decision: WatermarkDecision,
}

impl RunReport {
    pub fn published_count(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Published))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Failed(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Skipped))
    }

    fn count(&self, pred: impl Fn(&GroupOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}
