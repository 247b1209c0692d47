//! Domain model for vulnwatch scheduled notifications.
//!
//! This crate provides:
//! - `ScheduledRule` and its validation rules
//! - Event records, groups, and categorical sub-types
//! - The layered `Overview`/`Summary`/`Details` digest payloads
//! - `PublisherDescriptor` registry entries for delivery backends

pub mod event;
pub mod payload;
pub mod publisher;
pub mod rule;

pub use event::{EventCategory, EventGroup, EventRecord, Project, Severity, ViolationKind};
pub use payload::{
    CategoryCounts, EventDigest, NotificationLevel, OutboundMessage, Overview, ProjectDetails,
    ProjectSummary, ScheduledSubject,
};
pub use publisher::{PublisherDescriptor, PublisherKind};
pub use rule::{DeliveryTarget, NotificationScope, RuleValidationError, ScheduledRule};
