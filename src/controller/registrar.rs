use std::sync::Arc;

use tracing::{debug, info};

use super::core::{Controller, ControllerDescriptor};
use crate::app::RoutingContext;
use crate::convention::{
    controller_base_path, describe_handler, join_paths, parse_handler_name, HANDLER_PREFIX,
};
use crate::pipeline::MiddlewareRef;
use crate::router::Route;

/// Turns a controller's operations into routes and live bindings.
///
/// A registrar carries the path prefix and the middleware snapshot that apply
/// to the controllers it registers; the bare one used by
/// [`RoutingContext::register_controller`] has neither.
pub struct ControllerRegistrar<'a> {
    routing: &'a RoutingContext,
    prefix: String,
    group_middleware: Vec<MiddlewareRef>,
}

impl<'a> ControllerRegistrar<'a> {
    pub fn new(routing: &'a RoutingContext) -> Self {
        Self {
            routing,
            prefix: String::new(),
            group_middleware: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Middleware appended after each controller's own list.
    pub fn with_group_middleware(mut self, middleware: Vec<MiddlewareRef>) -> Self {
        self.group_middleware = middleware;
        self
    }

    /// Register every `Handle*` operation of `controller`.
    ///
    /// Operations whose identifier is not a handler are skipped. Routes that
    /// already exist are overwritten, so registering the same controller twice
    /// leaves the route count unchanged.
    pub fn register(&self, controller: Arc<dyn Controller>) -> ControllerDescriptor {
        let _registration = self.routing.lock_registration();

        let type_name = controller.type_name().to_string();
        let segment = controller_base_path(&type_name);
        let base_path = join_paths(&self.prefix, &segment);
        let mut middleware = controller.middleware();
        middleware.extend(self.group_middleware.iter().cloned());

        let resource = segment.trim_start_matches('/').to_string();
        let mut routes = Vec::new();
        for operation in Arc::clone(&controller).operations() {
            if !operation.identifier.starts_with(HANDLER_PREFIX) {
                debug!(
                    controller = %type_name,
                    identifier = %operation.identifier,
                    "Skipping operation that is not a handler"
                );
                continue;
            }
            let info = match parse_handler_name(&operation.identifier, &base_path) {
                Ok(info) => info,
                Err(err) => {
                    debug!(controller = %type_name, error = %err, "Skipping operation");
                    continue;
                }
            };

            let owner = format!("{type_name}.{}", operation.identifier);
            let description = operation
                .description
                .clone()
                .unwrap_or_else(|| describe_handler(&resource, &operation.identifier));
            let mut route = Route::new(info.method, &info.path, owner.as_str(), description);
            route.set_name(
                operation
                    .name
                    .clone()
                    .unwrap_or_else(|| operation.identifier.clone()),
            );
            route.request_type = operation.request_type.clone();
            route.response_type = operation.response_type.clone();
            let key = route.key();

            self.routing.table_mut().insert_route(route);
            self.routing
                .dispatcher()
                .bind(key.clone(), &owner, &middleware, operation.handler);
            debug!(route = %key, owner = %owner, "Controller route registered");
            routes.push(key);
        }

        let descriptor = ControllerDescriptor {
            type_name,
            base_path,
            middleware,
            routes,
        };
        info!(
            controller = %descriptor.type_name,
            base_path = %descriptor.base_path,
            routes = descriptor.routes.len(),
            middleware = ?descriptor.middleware_names(),
            "Controller registered"
        );
        self.routing.install_descriptor(descriptor.clone());
        self.routing.regenerate_route_file();
        descriptor
    }
}
