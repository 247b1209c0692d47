//! Structured observation of rule executions.
//!
//! The executor reports outcomes through a sink injected at construction
//! rather than a global logger, so tests can capture emitted events
//! deterministically. The default sink forwards to `tracing`.

use vulnwatch_model::{EventGroup, ScheduledRule};

use crate::outcome::{GroupError, GroupOutcome, RunReport, WatermarkDecision};

/// Sink for per-group and per-run outcomes.
pub trait RunObserver: Send + Sync {
    fn on_group(&self, rule: &ScheduledRule, group: EventGroup, outcome: &GroupOutcome);
    fn on_finished(&self, rule: &ScheduledRule, report: &RunReport);
}

/// Default observer emitting structured `tracing` events.
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_group(&self, rule: &ScheduledRule, group: EventGroup, outcome: &GroupOutcome) {
        match outcome {
            GroupOutcome::Skipped => {
                tracing::debug!(rule_id = %rule.id, %group, "no updates, group skipped");
            }
            GroupOutcome::Published => {
                tracing::info!(rule_id = %rule.id, %group, "group published");
            }
            GroupOutcome::Failed(GroupError::UnsupportedGroup(_)) => {
                tracing::warn!(
                    rule_id = %rule.id,
                    %group,
                    "group is not supported for scheduled publishing"
                );
            }
            GroupOutcome::Failed(error) => {
                tracing::error!(rule_id = %rule.id, %group, %error, "group failed");
            }
        }
    }

    fn on_finished(&self, rule: &ScheduledRule, report: &RunReport) {
        match report.decision {
            WatermarkDecision::Advance => {
                tracing::info!(
                    rule_id = %rule.id,
                    published = report.published_count(),
                    skipped = report.skipped_count(),
                    failed = report.failed_count(),
                    "scheduled notification rule processed"
                );
            }
            WatermarkDecision::Hold => {
                tracing::error!(
                    rule_id = %rule.id,
                    failed = report.failed_count(),
                    "errors during scheduled notification processing, watermark held"
                );
            }
        }
    }
}
