//! Maps publisher descriptors to statically-known implementations.
//!
//! Replaces reflection-style class loading with an explicit registry:
//! every [`PublisherKind`] is bound to a live instance up front, and the
//! targeted-delivery variant is expressed as a tagged union rather than
//! runtime type probing.

use std::collections::HashMap;
use std::sync::Arc;

use vulnwatch_model::{PublisherDescriptor, PublisherKind};

use crate::console::ConsolePublisher;
use crate::email::EmailPublisher;
use crate::templating::TemplateRenderer;
use crate::traits::{Publisher, TargetedPublisher};
use crate::webhook::WebhookPublisher;

/// A resolved publisher, tagged by whether it accepts explicit delivery
/// targets.
#[derive(Clone)]
pub enum ResolvedPublisher {
    Standard(Arc<dyn Publisher>),
    Targeted(Arc<dyn TargetedPublisher>),
}

impl ResolvedPublisher {
    pub fn name(&self) -> &str {
        match self {
            ResolvedPublisher::Standard(p) => p.name(),
            ResolvedPublisher::Targeted(p) => p.name(),
        }
    }
}

/// Errors resolving a descriptor to a live publisher.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("no publisher registered for kind '{0}'")]
    UnknownKind(PublisherKind),

    #[error("publisher '{0}' does not support scheduled delivery")]
    NotScheduled(String),
}

/// Registry of available publisher implementations, keyed by kind.
///
/// Lookups are read-only and safe to share across concurrently executing
/// rules.
pub struct PublisherRegistry {
    entries: HashMap<PublisherKind, ResolvedPublisher>,
}

impl PublisherRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry with the built-in console, webhook, and email
    /// publishers registered.
    pub fn with_defaults() -> Self {
        let renderer = Arc::new(TemplateRenderer::new());
        let mut registry = Self::new();
        registry.register_standard(
            PublisherKind::Console,
            Arc::new(ConsolePublisher::new(renderer.clone())),
        );
        registry.register_standard(
            PublisherKind::Webhook,
            Arc::new(WebhookPublisher::new(renderer.clone())),
        );
        registry.register_targeted(PublisherKind::Email, Arc::new(EmailPublisher::new(renderer)));
        registry
    }

    /// Register a publisher using the default addressing entry point only.
    pub fn register_standard(&mut self, kind: PublisherKind, publisher: Arc<dyn Publisher>) {
        self.entries
            .insert(kind, ResolvedPublisher::Standard(publisher));
    }

    /// Register a publisher that additionally accepts delivery targets.
    pub fn register_targeted(
        &mut self,
        kind: PublisherKind,
        publisher: Arc<dyn TargetedPublisher>,
    ) {
        self.entries
            .insert(kind, ResolvedPublisher::Targeted(publisher));
    }

    /// Resolve a descriptor to its registered implementation.
    ///
    /// Fails when the descriptor's kind has no registered publisher or the
    /// descriptor is not flagged for scheduled delivery.
    pub fn resolve(
        &self,
        descriptor: &PublisherDescriptor,
    ) -> Result<ResolvedPublisher, ResolutionError> {
        if !descriptor.supports_scheduled {
            return Err(ResolutionError::NotScheduled(descriptor.name.clone()));
        }
        self.entries
            .get(&descriptor.kind)
            .cloned()
            .ok_or(ResolutionError::UnknownKind(descriptor.kind))
    }
}

impl Default for PublisherRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_all_builtin_kinds() {
        let registry = PublisherRegistry::with_defaults();
        for descriptor in [
            PublisherDescriptor::console(),
            PublisherDescriptor::webhook(),
            PublisherDescriptor::email(),
        ] {
            assert!(registry.resolve(&descriptor).is_ok(), "{}", descriptor.name);
        }
    }

    #[test]
    fn email_resolves_to_targeted_variant() {
        let registry = PublisherRegistry::with_defaults();
        match registry.resolve(&PublisherDescriptor::email()).unwrap() {
            ResolvedPublisher::Targeted(_) => {}
            ResolvedPublisher::Standard(_) => panic!("email must be the targeted variant"),
        }
    }

    #[test]
    fn unknown_kind_fails_resolution() {
        let registry = PublisherRegistry::new();
        let result = registry.resolve(&PublisherDescriptor::console());
        assert!(matches!(result, Err(ResolutionError::UnknownKind(_))));
    }

    #[test]
    fn non_scheduled_descriptor_fails_resolution() {
        let registry = PublisherRegistry::with_defaults();
        let mut descriptor = PublisherDescriptor::console();
        descriptor.supports_scheduled = false;
        let result = registry.resolve(&descriptor);
        assert!(matches!(result, Err(ResolutionError::NotScheduled(_))));
    }
}
