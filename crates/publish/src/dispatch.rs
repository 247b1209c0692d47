//! Config-document merging and publisher entry-point routing.
//!
//! The dispatcher owns the two reserved template keys: they are injected
//! from the publisher descriptor after the rule's own document is merged
//! and can never be overridden by rule configuration.

use std::sync::Arc;

use serde_json::{Map, Value};

use vulnwatch_model::{OutboundMessage, PublisherDescriptor, ScheduledRule};

use crate::registry::{PublisherRegistry, ResolutionError, ResolvedPublisher};
use crate::traits::{ConfigDocument, PublishContext, PublishError};

/// Reserved config key carrying the publisher's template body.
pub const CONFIG_TEMPLATE_KEY: &str = "template";
/// Reserved config key carrying the template MIME type.
pub const CONFIG_TEMPLATE_MIME_TYPE_KEY: &str = "mimeType";

/// Errors failing the dispatch of one group's message.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed publisher configuration: {0}")]
    ConfigParse(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Routes messages to the publisher configured on a rule.
pub struct Dispatcher {
    registry: Arc<PublisherRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<PublisherRegistry>) -> Self {
        Self { registry }
    }

    /// Build the merged config document for a rule.
    ///
    /// The rule's own document is parsed first (absent config yields an
    /// empty document, which is not an error); the dispatcher-owned
    /// template keys are injected last and overwrite any user value. A
    /// malformed document abandons the dispatch — no degraded delivery
    /// with partial settings is attempted.
    pub fn merged_config(
        descriptor: &PublisherDescriptor,
        raw: Option<&str>,
    ) -> Result<ConfigDocument, DispatchError> {
        let mut doc = match raw {
            None => Map::new(),
            Some(text) => {
                let value: Value = serde_json::from_str(text)
                    .map_err(|e| DispatchError::ConfigParse(e.to_string()))?;
                match value {
                    Value::Object(map) => map,
                    other => {
                        return Err(DispatchError::ConfigParse(format!(
                            "expected a JSON object at the document root, got {}",
                            json_type_name(&other)
                        )))
                    }
                }
            }
        };

        doc.insert(
            CONFIG_TEMPLATE_KEY.to_string(),
            Value::String(descriptor.template.clone()),
        );
        doc.insert(
            CONFIG_TEMPLATE_MIME_TYPE_KEY.to_string(),
            Value::String(descriptor.template_mime_type.clone()),
        );
        Ok(doc)
    }

    /// Dispatch one message to the rule's publisher.
    ///
    /// The targeted entry point is selected only when the resolved
    /// publisher is the targeted variant and the rule has at least one
    /// delivery target; otherwise the publisher's default addressing
    /// behavior applies.
    pub async fn dispatch(
        &self,
        ctx: &PublishContext,
        rule: &ScheduledRule,
        message: &OutboundMessage,
    ) -> Result<(), DispatchError> {
        let config = Self::merged_config(&rule.publisher, rule.publisher_config.as_deref())?;
        let resolved = self.registry.resolve(&rule.publisher)?;

        match resolved {
            ResolvedPublisher::Targeted(publisher) if !rule.targets.is_empty() => {
                publisher
                    .publish_to(ctx, message, &config, &rule.targets)
                    .await?
            }
            ResolvedPublisher::Targeted(publisher) => {
                publisher.publish(ctx, message, &config).await?
            }
            ResolvedPublisher::Standard(publisher) => {
                publisher.publish(ctx, message, &config).await?
            }
        }

        tracing::info!(
            rule_id = %ctx.rule_id,
            publisher = %ctx.publisher,
            group = %ctx.group,
            "notification published"
        );
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;
    use vulnwatch_model::{
        DeliveryTarget, EventDigest, EventGroup, NotificationLevel, NotificationScope,
        PublisherKind, ScheduledSubject,
    };

    use crate::traits::{Publisher, TargetedPublisher};

    #[derive(Default)]
    struct Recorded {
        configs: Vec<ConfigDocument>,
        targeted_calls: usize,
        standard_calls: usize,
    }

    struct RecordingPublisher {
        recorded: Arc<Mutex<Recorded>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(
            &self,
            _ctx: &PublishContext,
            _message: &OutboundMessage,
            config: &ConfigDocument,
        ) -> Result<(), PublishError> {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.configs.push(config.clone());
            recorded.standard_calls += 1;
            if self.fail {
                return Err(PublishError::Config("mock failure".to_string()));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[async_trait::async_trait]
    impl TargetedPublisher for RecordingPublisher {
        async fn publish_to(
            &self,
            _ctx: &PublishContext,
            _message: &OutboundMessage,
            config: &ConfigDocument,
            _targets: &[DeliveryTarget],
        ) -> Result<(), PublishError> {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.configs.push(config.clone());
            recorded.targeted_calls += 1;
            Ok(())
        }
    }

    fn sample_rule(kind: PublisherKind) -> ScheduledRule {
        let mut publisher = PublisherDescriptor::console();
        publisher.kind = kind;
        ScheduledRule {
            id: Uuid::new_v4(),
            name: "digest".to_string(),
            scope: NotificationScope::Portfolio,
            enabled: true,
            projects: Vec::new(),
            notify_on: vec![EventGroup::NewVulnerability],
            cron_expression: "0 8 * * *".to_string(),
            publish_only_with_updates: false,
            include_suppressed: false,
            publisher,
            publisher_config: None,
            last_execution: chrono::Utc::now(),
            targets: Vec::new(),
        }
    }

    fn sample_message() -> OutboundMessage {
        OutboundMessage {
            scope: NotificationScope::Portfolio,
            group: EventGroup::NewVulnerability,
            level: NotificationLevel::Informational,
            title: "t".to_string(),
            content: "c".to_string(),
            timestamp: chrono::Utc::now(),
            subject: ScheduledSubject::NewVulnerabilities(EventDigest::default()),
        }
    }

    fn recording_dispatcher(
        kind: PublisherKind,
        targeted: bool,
        fail: bool,
    ) -> (Dispatcher, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let publisher = Arc::new(RecordingPublisher {
            recorded: recorded.clone(),
            fail,
        });
        let mut registry = PublisherRegistry::new();
        if targeted {
            registry.register_targeted(kind, publisher);
        } else {
            registry.register_standard(kind, publisher);
        }
        (Dispatcher::new(Arc::new(registry)), recorded)
    }

    #[test]
    fn absent_config_yields_only_reserved_keys() {
        let config = Dispatcher::merged_config(&PublisherDescriptor::console(), None).unwrap();
        assert_eq!(config.len(), 2);
        assert!(config.contains_key(CONFIG_TEMPLATE_KEY));
        assert!(config.contains_key(CONFIG_TEMPLATE_MIME_TYPE_KEY));
    }

    #[test]
    fn reserved_keys_are_not_user_overridable() {
        let descriptor = PublisherDescriptor::console();
        let raw = r#"{"template": "evil", "mimeType": "application/x-evil", "destination": "x"}"#;
        let config = Dispatcher::merged_config(&descriptor, Some(raw)).unwrap();
        assert_eq!(
            config[CONFIG_TEMPLATE_KEY],
            Value::String(descriptor.template.clone())
        );
        assert_eq!(
            config[CONFIG_TEMPLATE_MIME_TYPE_KEY],
            Value::String(descriptor.template_mime_type.clone())
        );
        assert_eq!(config["destination"], Value::String("x".to_string()));
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let result = Dispatcher::merged_config(&PublisherDescriptor::console(), Some("{nope"));
        assert!(matches!(result, Err(DispatchError::ConfigParse(_))));
    }

    #[test]
    fn non_object_root_is_a_parse_error() {
        let result = Dispatcher::merged_config(&PublisherDescriptor::console(), Some("[1,2]"));
        match result {
            Err(DispatchError::ConfigParse(msg)) => assert!(msg.contains("an array")),
            other => panic!("expected ConfigParse, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_config_abandons_dispatch() {
        let (dispatcher, recorded) = recording_dispatcher(PublisherKind::Console, false, false);
        let mut rule = sample_rule(PublisherKind::Console);
        rule.publisher_config = Some("{broken".to_string());
        let message = sample_message();
        let ctx = PublishContext::new(&rule, &message);

        let result = dispatcher.dispatch(&ctx, &rule, &message).await;
        assert!(matches!(result, Err(DispatchError::ConfigParse(_))));
        assert_eq!(recorded.lock().unwrap().standard_calls, 0);
    }

    #[tokio::test]
    async fn targeted_variant_with_targets_routes_to_publish_to() {
        let (dispatcher, recorded) = recording_dispatcher(PublisherKind::Email, true, false);
        let mut rule = sample_rule(PublisherKind::Email);
        rule.targets = vec![DeliveryTarget {
            name: "oncall".to_string(),
            emails: vec!["oncall@example.com".to_string()],
        }];
        let message = sample_message();
        let ctx = PublishContext::new(&rule, &message);

        dispatcher.dispatch(&ctx, &rule, &message).await.unwrap();
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.targeted_calls, 1);
        assert_eq!(recorded.standard_calls, 0);
    }

    #[tokio::test]
    async fn targeted_variant_without_targets_falls_back_to_publish() {
        let (dispatcher, recorded) = recording_dispatcher(PublisherKind::Email, true, false);
        let rule = sample_rule(PublisherKind::Email);
        let message = sample_message();
        let ctx = PublishContext::new(&rule, &message);

        dispatcher.dispatch(&ctx, &rule, &message).await.unwrap();
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.targeted_calls, 0);
        assert_eq!(recorded.standard_calls, 1);
    }

    #[tokio::test]
    async fn standard_variant_ignores_targets() {
        let (dispatcher, recorded) = recording_dispatcher(PublisherKind::Console, false, false);
        let mut rule = sample_rule(PublisherKind::Console);
        rule.targets = vec![DeliveryTarget {
            name: "oncall".to_string(),
            emails: vec!["oncall@example.com".to_string()],
        }];
        let message = sample_message();
        let ctx = PublishContext::new(&rule, &message);

        dispatcher.dispatch(&ctx, &rule, &message).await.unwrap();
        assert_eq!(recorded.lock().unwrap().standard_calls, 1);
    }

    #[tokio::test]
    async fn publisher_failure_surfaces_as_publish_error() {
        let (dispatcher, _) = recording_dispatcher(PublisherKind::Console, false, true);
        let rule = sample_rule(PublisherKind::Console);
        let message = sample_message();
        let ctx = PublishContext::new(&rule, &message);

        let result = dispatcher.dispatch(&ctx, &rule, &message).await;
        assert!(matches!(result, Err(DispatchError::Publish(_))));
    }

    #[tokio::test]
    async fn unknown_kind_surfaces_as_resolution_error() {
        let dispatcher = Dispatcher::new(Arc::new(PublisherRegistry::new()));
        let rule = sample_rule(PublisherKind::Webhook);
        let message = sample_message();
        let ctx = PublishContext::new(&rule, &message);

        let result = dispatcher.dispatch(&ctx, &rule, &message).await;
        assert!(matches!(result, Err(DispatchError::Resolution(_))));
    }

    #[tokio::test]
    async fn dispatched_config_contains_reserved_keys() {
        let (dispatcher, recorded) = recording_dispatcher(PublisherKind::Console, false, false);
        let mut rule = sample_rule(PublisherKind::Console);
        rule.publisher_config = Some(r#"{"destination": "https://example.com"}"#.to_string());
        let message = sample_message();
        let ctx = PublishContext::new(&rule, &message);

        dispatcher.dispatch(&ctx, &rule, &message).await.unwrap();
        let recorded = recorded.lock().unwrap();
        let config = &recorded.configs[0];
        assert!(config.contains_key(CONFIG_TEMPLATE_KEY));
        assert!(config.contains_key(CONFIG_TEMPLATE_MIME_TYPE_KEY));
        assert_eq!(config["destination"], "https://example.com");
    }
}
