//! Console publisher emitting rendered notifications to the process log.
//!
//! Needs no configuration beyond the dispatcher-injected template keys,
//! which makes it the reference publisher for rules without a config
//! document.

use std::sync::Arc;

use crate::dispatch::CONFIG_TEMPLATE_KEY;
use crate::templating::TemplateRenderer;
use crate::traits::{ConfigDocument, PublishContext, PublishError, Publisher};

use vulnwatch_model::OutboundMessage;

pub struct ConsolePublisher {
    renderer: Arc<TemplateRenderer>,
}

impl ConsolePublisher {
    pub fn new(renderer: Arc<TemplateRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait::async_trait]
impl Publisher for ConsolePublisher {
    async fn publish(
        &self,
        ctx: &PublishContext,
        message: &OutboundMessage,
        config: &ConfigDocument,
    ) -> Result<(), PublishError> {
        let template = config
            .get(CONFIG_TEMPLATE_KEY)
            .and_then(|v| v.as_str())
            .ok_or_else(|| PublishError::Config("missing template".to_string()))?;

        let body = self.renderer.render(template, ctx, message)?;

        tracing::info!(
            rule_id = %ctx.rule_id,
            rule = %ctx.rule_name,
            group = %ctx.group,
            level = %message.level,
            "{}",
            body
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
