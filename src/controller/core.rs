use std::fmt;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::pipeline::{Handler, HandlerResult, MiddlewareRef};
use crate::router::RouteKey;
use crate::schema::{Describe, TypeDescriptor};

/// A handler-bearing object whose operations become routes.
///
/// Usually implemented by `#[controller]` on an inherent impl block; a manual
/// implementation only has to list its operations.
pub trait Controller: Send + Sync + 'static {
    /// Type name the base path is derived from (`UserController` -> `/user`).
    fn type_name(&self) -> &str;

    /// Every exposed operation, keyed by its `Handle<Verb><Action>` identifier.
    fn operations(self: Arc<Self>) -> Vec<Operation>;

    /// Controller-level middleware, outermost first.
    fn middleware(&self) -> Vec<MiddlewareRef> {
        Vec::new()
    }
}

/// One exposed operation: identifier, invoker and documentation metadata.
#[derive(Clone)]
pub struct Operation {
    pub identifier: String,
    pub handler: Handler,
    pub description: Option<String>,
    pub name: Option<String>,
    pub request_type: Option<TypeDescriptor>,
    pub response_type: Option<TypeDescriptor>,
}

impl Operation {
    pub fn new(identifier: impl Into<String>, handler: Handler) -> Self {
        Self {
            identifier: identifier.into(),
            handler,
            description: None,
            name: None,
            request_type: None,
            response_type: None,
        }
    }

    pub fn from_fn<F>(identifier: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(identifier, Arc::new(f))
    }

    /// Bind a method of `controller` as the invoker.
    pub fn method<C, F>(controller: &Arc<C>, identifier: impl Into<String>, f: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(&C, &mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        let controller = Arc::clone(controller);
        Self::from_fn(identifier, move |ctx: &mut RequestContext| f(&controller, ctx))
    }

    pub fn request<T: Describe>(mut self) -> Self {
        self.request_type = Some(T::describe());
        self
    }

    pub fn response<T: Describe>(mut self) -> Self {
        self.response_type = Some(T::describe());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("identifier", &self.identifier)
            .field("description", &self.description)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What registering a controller produced.
#[derive(Clone)]
pub struct ControllerDescriptor {
    pub type_name: String,
    /// Base path including any group prefix, e.g. `/api/user`.
    pub base_path: String,
    /// Controller middleware followed by group middleware, in wrapping order.
    pub middleware: Vec<MiddlewareRef>,
    pub routes: Vec<RouteKey>,
}

impl ControllerDescriptor {
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}

impl fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("type_name", &self.type_name)
            .field("base_path", &self.base_path)
            .field("middleware", &self.middleware_names())
            .field("routes", &self.routes)
            .finish()
    }
}
