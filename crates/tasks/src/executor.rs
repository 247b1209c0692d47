//! Per-rule dispatch orchestration.
//!
//! One execution walks the rule's configured groups sequentially,
//! aggregates each group's window, builds and dispatches the message, and
//! reduces the collected outcomes into the watermark decision. Group
//! failures are isolated; only load-time or store failures abort the run.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use uuid::Uuid;

use vulnwatch_model::{
    EventGroup, NotificationLevel, OutboundMessage, ScheduledRule, ScheduledSubject,
};
use vulnwatch_publish::{Dispatcher, PublishContext, PublisherRegistry};

use crate::aggregate::{AggregationError, EventAggregator};
use crate::observer::{RunObserver, TracingObserver};
use crate::outcome::{decide_watermark, GroupError, GroupOutcome, RunReport, WatermarkDecision};
use crate::store::{EventStore, RuleStore, RuleStoreError};

/// Errors aborting a whole run. The watermark is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Rule(#[from] RuleStoreError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("scheduled rule {0} is disabled")]
    RuleDisabled(Uuid),
}

/// Executes scheduled notification rules.
///
/// Safe to share across concurrently executing rules; the scheduler must
/// guarantee at most one concurrent execution per rule id.
pub struct RuleExecutor {
    rules: Arc<dyn RuleStore>,
    events: Arc<dyn EventStore>,
    dispatcher: Dispatcher,
    observer: Arc<dyn RunObserver>,
}

impl RuleExecutor {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        events: Arc<dyn EventStore>,
        registry: Arc<PublisherRegistry>,
    ) -> Self {
        Self::with_observer(rules, events, registry, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        rules: Arc<dyn RuleStore>,
        events: Arc<dyn EventStore>,
        registry: Arc<PublisherRegistry>,
        observer: Arc<dyn RunObserver>,
    ) -> Self {
        Self {
            rules,
            events,
            dispatcher: Dispatcher::new(registry),
            observer,
        }
    }

    /// Scheduler-facing entry point. Fire-and-forget: all outcomes are
    /// observed through logs, not a return channel.
    pub async fn run(&self, rule_id: Uuid) {
        match self.execute(rule_id).await {
            Ok(_) => {}
            Err(ExecuteError::RuleDisabled(_)) => {
                tracing::debug!(%rule_id, "rule disabled, nothing to do");
            }
            Err(error) => {
                tracing::error!(%rule_id, %error, "scheduled notification run aborted");
            }
        }
    }

    /// Execute one rule and return its report.
    ///
    /// The window start is the rule's current last-execution timestamp,
    /// captured once before any mutation so every group shares the same
    /// window. The watermark advances to "now" only when
    /// [`decide_watermark`] says so.
    pub async fn execute(&self, rule_id: Uuid) -> Result<RunReport, ExecuteError> {
        let rule = self.rules.load_rule(rule_id).await?;
        if !rule.enabled {
            return Err(ExecuteError::RuleDisabled(rule_id));
        }

        tracing::info!(
            %rule_id,
            rule = %rule.name,
            groups = rule.notify_on.len(),
            "processing scheduled notification rule"
        );

        let window_start = rule.last_execution;
        let aggregator = EventAggregator::new(self.events.as_ref());

        let mut outcomes = Vec::with_capacity(rule.notify_on.len());
        for group in rule.notify_on.iter().copied() {
            let outcome = self
                .process_group(&rule, group, window_start, &aggregator)
                .await?;
            self.observer.on_group(&rule, group, &outcome);
            outcomes.push((group, outcome));
        }

        let decision = decide_watermark(outcomes.iter().map(|(_, o)| o));
        if decision == WatermarkDecision::Advance {
            // Advancing even without publishing avoids duplicate
            // notifications on the next tick and signals the run ended
            // without failure.
            self.rules.advance_watermark(rule.id, Utc::now()).await?;
        }

        let report = RunReport {
            rule_id,
            window_start,
            outcomes,
            decision,
        };
        self.observer.on_finished(&rule, &report);
        Ok(report)
    }

    /// Process one configured group. Returns `Err` only for aggregation
    /// failures, which abort the run; everything else becomes a
    /// [`GroupOutcome`].
    async fn process_group(
        &self,
        rule: &ScheduledRule,
        group: EventGroup,
        window_start: DateTime<Utc>,
        aggregator: &EventAggregator<'_>,
    ) -> Result<GroupOutcome, AggregationError> {
        if !group.supports_scheduled() {
            return Ok(GroupOutcome::Failed(GroupError::UnsupportedGroup(group)));
        }

        let digest = aggregator
            .aggregate(&rule.projects, window_start, group, rule.include_suppressed)
            .await?;

        if digest.overview.new_count == 0 && rule.publish_only_with_updates {
            return Ok(GroupOutcome::Skipped);
        }

        let Some(subject) = ScheduledSubject::for_group(group, digest) else {
            return Ok(GroupOutcome::Failed(GroupError::UnsupportedGroup(group)));
        };
        let message = build_message(rule, group, window_start, subject);
        let ctx = PublishContext::new(rule, &message);

        match self.dispatcher.dispatch(&ctx, rule, &message).await {
            Ok(()) => Ok(GroupOutcome::Published),
            Err(error) => Ok(GroupOutcome::Failed(error.into())),
        }
    }
}

/// Build the outbound message for one group from its digest.
///
/// Title and lead-in are derived from the overview counts, the rule name,
/// and the window start rendered in the local zone; the window itself is
/// stored and compared in UTC.
fn build_message(
    rule: &ScheduledRule,
    group: EventGroup,
    window_start: DateTime<Utc>,
    subject: ScheduledSubject,
) -> OutboundMessage {
    let overview = subject.digest().overview;
    let noun = match group {
        EventGroup::PolicyViolation => "policy violations",
        _ => "vulnerabilities",
    };
    let local_window = window_start
        .with_timezone(&Local)
        .format("%Y-%m-%dT%H:%M:%S");

    OutboundMessage {
        scope: rule.scope,
        group,
        level: NotificationLevel::Informational,
        title: format!(
            "{} new {} across {} project(s) in scheduled rule '{}'",
            overview.new_count, noun, overview.affected_project_count, rule.name
        ),
        content: format!(
            "Find below a summary of new {} since {} in scheduled rule '{}'.",
            noun, local_window, rule.name
        ),
        timestamp: Utc::now(),
        subject,
    }
}
