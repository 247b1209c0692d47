//! SMTP email publisher via `lettre`, the targeted-delivery variant.
//!
//! The default entry point addresses the config document's `destination`
//! list; `publish_to` addresses the rule's configured delivery targets
//! instead. SMTP transport settings come from the config document; SMTP
//! credentials are resolved from the `SMTP_USERNAME` and `SMTP_PASSWORD`
//! environment variables.

use std::sync::Arc;

use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use serde_json::Value;

use crate::dispatch::CONFIG_TEMPLATE_KEY;
use crate::templating::TemplateRenderer;
use crate::traits::{ConfigDocument, PublishContext, PublishError, Publisher, TargetedPublisher};

use vulnwatch_model::{DeliveryTarget, OutboundMessage};

pub struct EmailPublisher {
    renderer: Arc<TemplateRenderer>,
}

impl EmailPublisher {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Self {
        Self { renderer }
    }

    async fn deliver(
        &self,
        ctx: &PublishContext,
        message: &OutboundMessage,
        config: &ConfigDocument,
        recipients: Vec<Mailbox>,
    ) -> Result<(), PublishError> {
        if recipients.is_empty() {
            return Err(PublishError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let template = config
            .get(CONFIG_TEMPLATE_KEY)
            .and_then(|v| v.as_str())
            .ok_or_else(|| PublishError::Config("missing template".to_string()))?;
        let body = self.renderer.render(template, ctx, message)?;

        let from: Mailbox = config
            .get("from")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PublishError::Config("missing config key 'from'".to_string()))?
            .parse()
            .map_err(|e: lettre::address::AddressError| PublishError::Config(e.to_string()))?;

        let recipient_count = recipients.len();
        let mut builder = Message::builder().from(from);
        for recipient in recipients {
            builder = builder.to(recipient);
        }
        let email = builder
            .subject(&message.title)
            .body(body)
            .map_err(|e| PublishError::Smtp(e.to_string()))?;

        let transport = build_transport(config)?;
        transport
            .send(email)
            .await
            .map_err(|e| PublishError::Smtp(e.to_string()))?;

        tracing::info!(
            rule_id = %ctx.rule_id,
            subject = %message.title,
            recipients = recipient_count,
            "email notification delivered"
        );
        Ok(())
    }
}

/// Build the async SMTP transport from config document settings.
///
/// Port 465 uses implicit TLS; everything else uses STARTTLS unless `tls`
/// is explicitly disabled.
fn build_transport(
    config: &ConfigDocument,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, PublishError> {
    let host = config
        .get("smtpHost")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PublishError::Config("missing config key 'smtpHost'".to_string()))?;
    let port = config
        .get("smtpPort")
        .and_then(|v| v.as_u64())
        .map(|p| p as u16)
        .unwrap_or(587);
    let use_tls = config.get("tls").and_then(|v| v.as_bool()).unwrap_or(true);

    let mut builder = if port == 465 {
        AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| PublishError::Config(e.to_string()))?
            .port(port)
    } else if use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| PublishError::Config(e.to_string()))?
            .port(port)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port)
    };

    if let (Ok(username), Ok(password)) =
        (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
    {
        builder = builder.credentials(Credentials::new(username, password));
    }

    Ok(builder.build())
}

/// Parse the config document's `destination` into mailboxes. Accepts a
/// single comma-separated string or an array of strings.
fn recipients_from_config(config: &ConfigDocument) -> Result<Vec<Mailbox>, PublishError> {
    let addresses: Vec<&str> = match config.get("destination") {
        Some(Value::String(s)) => s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| PublishError::Config("destination entries must be strings".to_string()))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(PublishError::Config(
                "destination must be a string or array of strings".to_string(),
            ))
        }
        None => Vec::new(),
    };
    parse_mailboxes(addresses.into_iter())
}

/// Flatten delivery targets into a deduplicated mailbox list, preserving
/// first-seen order.
fn recipients_from_targets(targets: &[DeliveryTarget]) -> Result<Vec<Mailbox>, PublishError> {
    let mut seen = std::collections::HashSet::new();
    let addresses = targets
        .iter()
        .flat_map(|t| t.emails.iter())
        .map(String::as_str)
        .filter(|addr| seen.insert(addr.to_string()));
    parse_mailboxes(addresses)
}

fn parse_mailboxes<'a>(
    addresses: impl Iterator<Item = &'a str>,
) -> Result<Vec<Mailbox>, PublishError> {
    addresses
        .map(|addr| {
            addr.parse()
                .map_err(|e: lettre::address::AddressError| {
                    PublishError::Config(format!("invalid address '{addr}': {e}"))
                })
        })
        .collect()
}

#[async_trait::async_trait]
impl Publisher for EmailPublisher {
    async fn publish(
        &self,
        ctx: &PublishContext,
        message: &OutboundMessage,
        config: &ConfigDocument,
    ) -> Result<(), PublishError> {
        let recipients = recipients_from_config(config)?;
        self.deliver(ctx, message, config, recipients).await
    }

    fn name(&self) -> &str {
        "email"
    }
}

#[async_trait::async_trait]
impl TargetedPublisher for EmailPublisher {
    /// Address the rule's delivery targets; fall back to the config
    /// document's `destination` list when the targets carry no addresses.
    async fn publish_to(
        &self,
        ctx: &PublishContext,
        message: &OutboundMessage,
        config: &ConfigDocument,
        targets: &[DeliveryTarget],
    ) -> Result<(), PublishError> {
        let mut recipients = recipients_from_targets(targets)?;
        if recipients.is_empty() {
            recipients = recipients_from_config(config)?;
        }
        self.deliver(ctx, message, config, recipients).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_destination(value: Value) -> ConfigDocument {
        let mut config = ConfigDocument::new();
        config.insert("destination".to_string(), value);
        config
    }

    #[test]
    fn recipients_from_comma_separated_string() {
        let config = config_with_destination(Value::String(
            "alice@example.com, bob@example.com".to_string(),
        ));
        let recipients = recipients_from_config(&config).unwrap();
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].email.to_string(), "alice@example.com");
    }

    #[test]
    fn recipients_from_string_array() {
        let config = config_with_destination(serde_json::json!([
            "alice@example.com",
            "bob@example.com"
        ]));
        assert_eq!(recipients_from_config(&config).unwrap().len(), 2);
    }

    #[test]
    fn missing_destination_yields_no_recipients() {
        let config = ConfigDocument::new();
        assert!(recipients_from_config(&config).unwrap().is_empty());
    }

    #[test]
    fn non_string_destination_is_rejected() {
        let config = config_with_destination(Value::from(7));
        assert!(recipients_from_config(&config).is_err());
    }

    #[test]
    fn invalid_address_is_rejected() {
        let config = config_with_destination(Value::String("not-an-email".to_string()));
        assert!(recipients_from_config(&config).is_err());
    }

    #[test]
    fn targets_are_flattened_and_deduplicated() {
        let targets = vec![
            DeliveryTarget {
                name: "oncall".to_string(),
                emails: vec![
                    "alice@example.com".to_string(),
                    "bob@example.com".to_string(),
                ],
            },
            DeliveryTarget {
                name: "security".to_string(),
                emails: vec![
                    "bob@example.com".to_string(),
                    "carol@example.com".to_string(),
                ],
            },
        ];
        let recipients = recipients_from_targets(&targets).unwrap();
        let addresses: Vec<String> = recipients.iter().map(|m| m.email.to_string()).collect();
        assert_eq!(
            addresses,
            vec!["alice@example.com", "bob@example.com", "carol@example.com"]
        );
    }

    #[test]
    fn transport_requires_smtp_host() {
        let config = ConfigDocument::new();
        assert!(matches!(
            build_transport(&config),
            Err(PublishError::Config(_))
        ));
    }

    #[test]
    fn transport_builds_for_starttls_and_implicit_tls() {
        for port in [587u16, 465, 25] {
            let mut config = ConfigDocument::new();
            config.insert("smtpHost".to_string(), Value::String("smtp.example.com".to_string()));
            config.insert("smtpPort".to_string(), Value::from(port));
            if port == 25 {
                config.insert("tls".to_string(), Value::Bool(false));
            }
            assert!(build_transport(&config).is_ok(), "port {port}");
        }
    }
}
