//! Scheduled notification rules and their validation checks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{EventGroup, Project};
use crate::publisher::PublisherDescriptor;

/// Scope a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationScope {
    Portfolio,
    System,
}

impl fmt::Display for NotificationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationScope::Portfolio => write!(f, "PORTFOLIO"),
            NotificationScope::System => write!(f, "SYSTEM"),
        }
    }
}

/// A named recipient group used by targeted-delivery publishers (email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub name: String,
    pub emails: Vec<String>,
}

/// A persisted rule describing what events to watch, how often, and where
/// to send notifications.
///
/// `last_execution` is the exclusive lower bound of the next run's event
/// window; it never moves backward. `projects` is the rule's scope, already
/// resolved (including descendants where configured) by the rule store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledRule {
    pub id: Uuid,
    pub name: String,
    pub scope: NotificationScope,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub projects: Vec<Project>,
    pub notify_on: Vec<EventGroup>,
    pub cron_expression: String,
    #[serde(default)]
    pub publish_only_with_updates: bool,
    #[serde(default)]
    pub include_suppressed: bool,
    pub publisher: PublisherDescriptor,
    /// Opaque publisher-specific configuration document (JSON text).
    #[serde(default)]
    pub publisher_config: Option<String>,
    pub last_execution: DateTime<Utc>,
    #[serde(default)]
    pub targets: Vec<DeliveryTarget>,
}

fn default_enabled() -> bool {
    true
}

/// Configuration errors detected by [`ScheduledRule::validate`].
#[derive(Debug, thiserror::Error)]
pub enum RuleValidationError {
    #[error("rule name must not be empty")]
    EmptyName,

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("group {0} is not valid for scheduled delivery")]
    UnsupportedGroup(EventGroup),

    #[error("publisher '{0}' does not support scheduled delivery")]
    PublisherNotScheduled(String),
}

impl ScheduledRule {
    /// Check a rule for configuration errors before accepting it.
    ///
    /// Returns the first error found: empty name, unparseable cron
    /// expression, a subscribed group that has no scheduled delivery path,
    /// or a publisher not flagged for scheduled use.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.name.trim().is_empty() {
            return Err(RuleValidationError::EmptyName);
        }

        let normalized = normalize_cron(&self.cron_expression);
        if let Err(e) = cron::Schedule::from_str(&normalized) {
            return Err(RuleValidationError::InvalidCron {
                expression: self.cron_expression.clone(),
                reason: e.to_string(),
            });
        }

        for group in &self.notify_on {
            if !group.supports_scheduled() {
                return Err(RuleValidationError::UnsupportedGroup(*group));
            }
        }

        if !self.publisher.supports_scheduled {
            return Err(RuleValidationError::PublisherNotScheduled(
                self.publisher.name.clone(),
            ));
        }

        Ok(())
    }

    /// The rule's cron expression normalized for the `cron` crate.
    pub fn normalized_cron(&self) -> String {
        normalize_cron(&self.cron_expression)
    }
}

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for
/// seconds. The `cron` crate requires six fields; rules use standard
/// 5-field cron.
pub fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}
