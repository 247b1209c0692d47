//! Minijinja template rendering for notification bodies.
//!
//! Publisher templates are arbitrary strings taken from the merged config
//! document (not pre-registered files), so a fresh
//! [`minijinja::Environment`] is created per render call.

use chrono::Utc;
use minijinja::value::ViaDeserialize;

use vulnwatch_model::{OutboundMessage, ProjectSummary};

use crate::traits::{PublishContext, PublishError};

/// Data available to publisher templates.
#[derive(serde::Serialize)]
struct TemplateInput<'a> {
    /// Rule and publisher identity.
    ctx: &'a PublishContext,
    /// The full outbound message including the structured subject.
    message: &'a OutboundMessage,
    /// Render time in ISO 8601 format.
    now: String,
}

/// Renders publisher templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a configured minijinja environment with custom filters.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();

        // `tojson` is registered explicitly to guarantee availability
        // regardless of enabled minijinja features.
        env.add_filter("tojson", tojson_filter);
        env.add_filter("summary_line", summary_line_filter);
        env.add_function("env", env_function);

        env
    }

    /// Render a template string against the publish context and message.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(
        &self,
        template_str: &str,
        ctx: &PublishContext,
        message: &OutboundMessage,
    ) -> Result<String, PublishError> {
        let input = TemplateInput {
            ctx,
            message,
            now: Utc::now().to_rfc3339(),
        };
        let env = Self::build_env();
        env.render_str(template_str, &input)
            .map_err(|e| PublishError::Template(e.to_string()))
    }

    /// Validate that a template string parses without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), PublishError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| PublishError::Template(e.to_string()))?;
        Ok(())
    }
}

/// Custom filter: serialize any template value as compact JSON.
fn tojson_filter(value: minijinja::Value) -> Result<String, minijinja::Error> {
    serde_json::to_string(&value).map_err(|e| {
        minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string())
    })
}

/// Custom filter: render a project summary as a single text line, e.g.
/// `acme-app 1.2.3: CRITICAL=2 HIGH=1`.
fn summary_line_filter(summary: ViaDeserialize<ProjectSummary>) -> String {
    let counts = summary
        .categories
        .iter()
        .map(|(category, c)| format!("{}={}", category, c.new))
        .collect::<Vec<_>>()
        .join(" ");
    match &summary.project.version {
        Some(version) => format!("{} {}: {}", summary.project.name, version, counts),
        None => format!("{}: {}", summary.project.name, counts),
    }
}

/// Global function: read an environment variable by name, empty if unset.
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "environment variable not found, returning empty string");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;
    use vulnwatch_model::{
        CategoryCounts, EventCategory, EventDigest, EventGroup, NotificationLevel,
        NotificationScope, Overview, Project, ScheduledSubject, Severity,
    };

    fn sample_context() -> PublishContext {
        PublishContext {
            rule_id: Uuid::new_v4(),
            rule_name: "Nightly digest".to_string(),
            publisher: "Console".to_string(),
            scope: NotificationScope::Portfolio,
            group: EventGroup::NewVulnerability,
        }
    }

    fn sample_message() -> OutboundMessage {
        let mut categories = BTreeMap::new();
        categories.insert(
            EventCategory::Severity(Severity::Critical),
            CategoryCounts {
                new: 2,
                total: 4,
                suppressed_new: 0,
            },
        );
        categories.insert(
            EventCategory::Severity(Severity::High),
            CategoryCounts {
                new: 1,
                total: 1,
                suppressed_new: 0,
            },
        );
        OutboundMessage {
            scope: NotificationScope::Portfolio,
            group: EventGroup::NewVulnerability,
            level: NotificationLevel::Informational,
            title: "3 new vulnerabilities".to_string(),
            content: "Summary below.".to_string(),
            timestamp: "2026-08-20T08:00:00Z".parse().unwrap(),
            subject: ScheduledSubject::NewVulnerabilities(EventDigest {
                overview: Overview {
                    new_count: 3,
                    affected_project_count: 1,
                },
                summaries: vec![ProjectSummary {
                    project: Project {
                        id: Uuid::new_v4(),
                        name: "acme-app".to_string(),
                        version: Some("1.2.3".to_string()),
                    },
                    categories,
                }],
                details: Vec::new(),
            }),
        }
    }

    #[test]
    fn render_title_and_overview() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render(
                "{{ message.title }} ({{ message.subject.digest.overview.new_count }} new)",
                &sample_context(),
                &sample_message(),
            )
            .unwrap();
        assert_eq!(out, "3 new vulnerabilities (3 new)");
    }

    #[test]
    fn render_summary_line_filter() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render(
                "{{ message.subject.digest.summaries[0] | summary_line }}",
                &sample_context(),
                &sample_message(),
            )
            .unwrap();
        assert_eq!(out, "acme-app 1.2.3: CRITICAL=2 HIGH=1");
    }

    #[test]
    fn render_tojson_filter() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render(
                "{{ message.subject.digest.overview | tojson }}",
                &sample_context(),
                &sample_message(),
            )
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["new_count"], 3);
    }

    #[test]
    fn render_context_fields() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render(
                "[{{ ctx.scope }}/{{ ctx.group }}] {{ ctx.rule_name }}",
                &sample_context(),
                &sample_message(),
            )
            .unwrap();
        assert_eq!(out, "[PORTFOLIO/NEW_VULNERABILITY] Nightly digest");
    }

    #[test]
    fn invalid_template_produces_error() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render("{{ unclosed", &sample_context(), &sample_message());
        match result.unwrap_err() {
            PublishError::Template(msg) => assert!(!msg.is_empty()),
            other => panic!("expected Template error, got: {other:?}"),
        }
    }

    #[test]
    fn validate_checks_syntax_only() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.validate("{{ message.title }}").is_ok());
        assert!(renderer.validate("{% for x in %}").is_err());
    }

    #[test]
    fn render_env_missing_returns_empty() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render(
                "[{{ env('VULNWATCH_NOT_SET_XYZ') }}]",
                &sample_context(),
                &sample_message(),
            )
            .unwrap();
        assert_eq!(out, "[]");
    }
}
