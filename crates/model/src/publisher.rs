//! Publisher registry entries mapping a descriptor to a delivery backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Statically-known publisher implementations.
///
/// Descriptors reference publishers by kind; the registry maps each kind to
/// a concrete factory. There is no runtime class loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherKind {
    Console,
    Webhook,
    Email,
}

impl fmt::Display for PublisherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublisherKind::Console => write!(f, "console"),
            PublisherKind::Webhook => write!(f, "webhook"),
            PublisherKind::Email => write!(f, "email"),
        }
    }
}

impl FromStr for PublisherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(PublisherKind::Console),
            "webhook" => Ok(PublisherKind::Webhook),
            "email" => Ok(PublisherKind::Email),
            other => Err(format!("unknown publisher kind: '{}'", other)),
        }
    }
}

/// Registry entry for one delivery backend: its kind, default template,
/// template MIME type, and whether it may be used for scheduled delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherDescriptor {
    pub name: String,
    pub kind: PublisherKind,
    pub template: String,
    pub template_mime_type: String,
    pub supports_scheduled: bool,
}

impl PublisherDescriptor {
    /// Default console publisher descriptor.
    pub fn console() -> Self {
        Self {
            name: "Console".to_string(),
            kind: PublisherKind::Console,
            template: "{{ message.title }}\n{{ message.content }}".to_string(),
            template_mime_type: "text/plain".to_string(),
            supports_scheduled: true,
        }
    }

    /// Default webhook publisher descriptor with a JSON body template.
    pub fn webhook() -> Self {
        Self {
            name: "Outbound Webhook".to_string(),
            kind: PublisherKind::Webhook,
            template: "{{ message | tojson }}".to_string(),
            template_mime_type: "application/json".to_string(),
            supports_scheduled: true,
        }
    }

    /// Default email publisher descriptor with a plain-text template.
    pub fn email() -> Self {
        Self {
            name: "Email".to_string(),
            kind: PublisherKind::Email,
            template: "{{ message.content }}\n\n{% for s in message.subject.digest.summaries %}\
{{ s | summary_line }}\n{% endfor %}"
                .to_string(),
            template_mime_type: "text/plain".to_string(),
            supports_scheduled: true,
        }
    }
}
