//! Publisher capability traits and shared error types.

use serde_json::{Map, Value};
use uuid::Uuid;

use vulnwatch_model::{
    DeliveryTarget, EventGroup, NotificationScope, OutboundMessage, ScheduledRule,
};

/// The merged publisher configuration document: the rule's opaque key-value
/// document plus the two dispatcher-owned template keys.
pub type ConfigDocument = Map<String, Value>;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("template rendering failed: {0}")]
    Template(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Log and template context describing the rule and message being published.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PublishContext {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub publisher: String,
    pub scope: NotificationScope,
    pub group: EventGroup,
}

impl PublishContext {
    pub fn new(rule: &ScheduledRule, message: &OutboundMessage) -> Self {
        Self {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            publisher: rule.publisher.name.clone(),
            scope: message.scope,
            group: message.group,
        }
    }
}

/// Capability contract implemented by every delivery backend.
///
/// Publishers that need no configuration must function with a document
/// containing only the two dispatcher-injected template keys.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver a message using the backend's default addressing behavior.
    async fn publish(
        &self,
        ctx: &PublishContext,
        message: &OutboundMessage,
        config: &ConfigDocument,
    ) -> Result<(), PublishError>;

    /// Human-readable backend name (e.g., "webhook", "email").
    fn name(&self) -> &str;
}

/// Extension for backends that address explicit recipient groups.
///
/// The dispatcher routes here, instead of [`Publisher::publish`], when the
/// rule has at least one delivery target configured.
#[async_trait::async_trait]
pub trait TargetedPublisher: Publisher {
    async fn publish_to(
        &self,
        ctx: &PublishContext,
        message: &OutboundMessage,
        config: &ConfigDocument,
        targets: &[DeliveryTarget],
    ) -> Result<(), PublishError>;
}
