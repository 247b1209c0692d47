//! Event records, groups, and categorical sub-types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monitored project — the entity events are attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Categories of monitorable events a rule can subscribe to.
///
/// Only [`NewVulnerability`](EventGroup::NewVulnerability) and
/// [`PolicyViolation`](EventGroup::PolicyViolation) are valid for scheduled
/// delivery; the remaining groups are delivered through the real-time path
/// and are a configuration error when attached to a scheduled rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventGroup {
    NewVulnerability,
    PolicyViolation,
    BomProcessed,
    AnalysisDecision,
}

impl EventGroup {
    /// Whether this group may be attached to a scheduled rule.
    pub fn supports_scheduled(self) -> bool {
        matches!(
            self,
            EventGroup::NewVulnerability | EventGroup::PolicyViolation
        )
    }
}

impl fmt::Display for EventGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventGroup::NewVulnerability => write!(f, "NEW_VULNERABILITY"),
            EventGroup::PolicyViolation => write!(f, "POLICY_VIOLATION"),
            EventGroup::BomProcessed => write!(f, "BOM_PROCESSED"),
            EventGroup::AnalysisDecision => write!(f, "ANALYSIS_DECISION"),
        }
    }
}

/// Vulnerability severity, ordered most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
    Unassigned,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Informational => write!(f, "INFORMATIONAL"),
            Severity::Unassigned => write!(f, "UNASSIGNED"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(Severity::Critical),
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "LOW" => Ok(Severity::Low),
            "INFORMATIONAL" => Ok(Severity::Informational),
            "UNASSIGNED" => Ok(Severity::Unassigned),
            other => Err(format!("unknown severity: '{}'", other)),
        }
    }
}

/// Policy violation risk type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationKind {
    License,
    Operational,
    Security,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::License => write!(f, "LICENSE"),
            ViolationKind::Operational => write!(f, "OPERATIONAL"),
            ViolationKind::Security => write!(f, "SECURITY"),
        }
    }
}

impl FromStr for ViolationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LICENSE" => Ok(ViolationKind::License),
            "OPERATIONAL" => Ok(ViolationKind::Operational),
            "SECURITY" => Ok(ViolationKind::Security),
            other => Err(format!("unknown violation kind: '{}'", other)),
        }
    }
}

/// The categorical sub-type a summary groups events by: severity for
/// vulnerabilities, risk type for policy violations.
///
/// Serialized as its display string so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventCategory {
    Severity(Severity),
    Violation(ViolationKind),
}

impl EventCategory {
    /// The event group this category belongs to.
    pub fn group(self) -> EventGroup {
        match self {
            EventCategory::Severity(_) => EventGroup::NewVulnerability,
            EventCategory::Violation(_) => EventGroup::PolicyViolation,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCategory::Severity(s) => s.fmt(f),
            EventCategory::Violation(v) => v.fmt(f),
        }
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(severity) = s.parse::<Severity>() {
            return Ok(EventCategory::Severity(severity));
        }
        if let Ok(kind) = s.parse::<ViolationKind>() {
            return Ok(EventCategory::Violation(kind));
        }
        Err(format!("unknown event category: '{}'", s))
    }
}

impl Serialize for EventCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventCategory {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A single qualifying event as returned by the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub group: EventGroup,
    pub category: EventCategory,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suppressed: bool,
    pub occurred_at: DateTime<Utc>,
}
