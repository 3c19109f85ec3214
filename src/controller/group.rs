use std::sync::Arc;

use tracing::debug;

use super::core::{Controller, ControllerDescriptor};
use super::registrar::ControllerRegistrar;
use crate::app::RoutingContext;
use crate::pipeline::MiddlewareRef;

/// Controllers sharing a path prefix and a middleware list.
///
/// ```rust,ignore
/// ControllerGroup::new("/api")
///     .use_middleware(Arc::new(AuthMiddleware::new()))
///     .add(Arc::new(UserController))
///     .add(Arc::new(OrderController))
///     .register(&routing);
/// ```
pub struct ControllerGroup {
    prefix: String,
    name: Option<String>,
    middleware: Vec<MiddlewareRef>,
    members: Vec<(Arc<dyn Controller>, Vec<MiddlewareRef>)>,
}

impl ControllerGroup {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: None,
            middleware: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn use_middleware(mut self, middleware: MiddlewareRef) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Add a controller. It receives the group middleware added so far.
    pub fn add(mut self, controller: Arc<dyn Controller>) -> Self {
        let snapshot = self.middleware.clone();
        self.members.push((controller, snapshot));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Register every member in the order they were added.
    pub fn register(self, routing: &RoutingContext) -> Vec<ControllerDescriptor> {
        debug!(
            group = self.name.as_deref().unwrap_or("-"),
            prefix = %self.prefix,
            controllers = self.members.len(),
            "Registering controller group"
        );
        self.members
            .into_iter()
            .map(|(controller, middleware)| {
                ControllerRegistrar::new(routing)
                    .with_prefix(self.prefix.as_str())
                    .with_group_middleware(middleware)
                    .register(controller)
            })
            .collect()
    }
}
