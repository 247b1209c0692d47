//! Pluggable delivery backends for scheduled notifications.
//!
//! This crate provides:
//! - The `Publisher` capability trait and its targeted-delivery extension
//! - A registry mapping publisher kinds to statically-known implementations
//! - The dispatcher: config-document merging and entry-point routing
//! - Minijinja template rendering for notification bodies
//! - Console, webhook, and email publisher implementations

pub mod console;
pub mod dispatch;
pub mod email;
pub mod registry;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dispatch::{DispatchError, Dispatcher, CONFIG_TEMPLATE_KEY, CONFIG_TEMPLATE_MIME_TYPE_KEY};
pub use registry::{PublisherRegistry, ResolutionError, ResolvedPublisher};
pub use traits::{ConfigDocument, PublishContext, PublishError, Publisher, TargetedPublisher};
