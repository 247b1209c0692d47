//! Layered notification payloads: overview counts, per-project summaries,
//! and full event details for one execution window.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventCategory, EventGroup, EventRecord, Project};
use crate::rule::NotificationScope;

/// Notification severity level. Scheduled runs always publish at
/// [`Informational`](NotificationLevel::Informational).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationLevel {
    Informational,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationLevel::Informational => write!(f, "INFORMATIONAL"),
            NotificationLevel::Warning => write!(f, "WARNING"),
            NotificationLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Window-wide aggregate counts for one event group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    /// Qualifying (non-suppressed) events across all projects in the window.
    pub new_count: usize,
    /// Projects with at least one qualifying event in the window.
    pub affected_project_count: usize,
}

/// Per-category counters within one project's summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// New non-suppressed events in the window.
    pub new: usize,
    /// All events for the project regardless of window.
    pub total: usize,
    /// New events in the window that are suppressed.
    pub suppressed_new: usize,
}

/// Per-project breakdown of counts keyed by categorical sub-type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project: Project,
    pub categories: BTreeMap<EventCategory, CategoryCounts>,
}

/// Full ordered event list for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub project: Project,
    pub events: Vec<EventRecord>,
}

/// The three aggregation layers for one group and one window.
///
/// `summaries` and `details` preserve project iteration order; event order
/// within a project is the store's query order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDigest {
    pub overview: Overview,
    pub summaries: Vec<ProjectSummary>,
    pub details: Vec<ProjectDetails>,
}

/// Structured subject of a scheduled notification — exactly one group's
/// digest, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "digest", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledSubject {
    NewVulnerabilities(EventDigest),
    PolicyViolations(EventDigest),
}

impl ScheduledSubject {
    /// Wrap a digest in the subject variant for `group`, or `None` when the
    /// group has no scheduled delivery path.
    pub fn for_group(group: EventGroup, digest: EventDigest) -> Option<Self> {
        match group {
            EventGroup::NewVulnerability => Some(ScheduledSubject::NewVulnerabilities(digest)),
            EventGroup::PolicyViolation => Some(ScheduledSubject::PolicyViolations(digest)),
            _ => None,
        }
    }

    pub fn digest(&self) -> &EventDigest {
        match self {
            ScheduledSubject::NewVulnerabilities(d) | ScheduledSubject::PolicyViolations(d) => d,
        }
    }

    pub fn group(&self) -> EventGroup {
        match self {
            ScheduledSubject::NewVulnerabilities(_) => EventGroup::NewVulnerability,
            ScheduledSubject::PolicyViolations(_) => EventGroup::PolicyViolation,
        }
    }
}

/// A fully built notification, ready for publisher dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub scope: NotificationScope,
    pub group: EventGroup,
    pub level: NotificationLevel,
    pub title: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub subject: ScheduledSubject,
}
