//! HTTP webhook publisher.
//!
//! Renders the configured template and posts it to the config document's
//! `destination` URL, using the template MIME type as Content-Type.

use std::sync::Arc;

use crate::dispatch::{CONFIG_TEMPLATE_KEY, CONFIG_TEMPLATE_MIME_TYPE_KEY};
use crate::templating::TemplateRenderer;
use crate::traits::{ConfigDocument, PublishContext, PublishError, Publisher};

use vulnwatch_model::OutboundMessage;

pub struct WebhookPublisher {
    renderer: Arc<TemplateRenderer>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookPublisher {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Self {
        Self {
            renderer,
            client: reqwest::Client::new(),
        }
    }
}

/// Extract a required string value from the config document.
fn required_str<'a>(config: &'a ConfigDocument, key: &str) -> Result<&'a str, PublishError> {
    config
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| PublishError::Config(format!("missing config key '{key}'")))
}

#[async_trait::async_trait]
impl Publisher for WebhookPublisher {
    async fn publish(
        &self,
        ctx: &PublishContext,
        message: &OutboundMessage,
        config: &ConfigDocument,
    ) -> Result<(), PublishError> {
        let destination = required_str(config, "destination")?;
        let template = required_str(config, CONFIG_TEMPLATE_KEY)?;
        let mime_type = config
            .get(CONFIG_TEMPLATE_MIME_TYPE_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or("application/json");

        let body = self.renderer.render(template, ctx, message)?;

        let response = self
            .client
            .post(destination)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                rule_id = %ctx.rule_id,
                destination,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(PublishError::Endpoint {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(
            rule_id = %ctx.rule_id,
            destination,
            %status,
            "webhook notification delivered"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
