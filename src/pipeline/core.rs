use std::fmt;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::ApiError;

pub type HandlerResult = Result<(), ApiError>;

/// Type-erased request handler.
pub type Handler = Arc<dyn Fn(&mut RequestContext) -> HandlerResult + Send + Sync>;

pub type MiddlewareRef = Arc<dyn Middleware>;

/// Wrap a closure as a [`Handler`].
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Transforms a handler into a handler that adds behaviour around it.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Handler) -> Handler;

    /// Label used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapter turning a `Fn(Handler) -> Handler` closure into a [`Middleware`].
pub struct FnMiddleware<F> {
    name: &'static str,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Handler) -> Handler + Send + Sync,
{
    fn wrap(&self, next: Handler) -> Handler {
        (self.f)(next)
    }

    fn name(&self) -> &str {
        self.name
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}

pub fn middleware_fn<F>(name: &'static str, f: F) -> MiddlewareRef
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(FnMiddleware { name, f })
}

/// Fold `middleware` around `terminal`; index 0 ends up outermost.
pub fn compose(middleware: &[MiddlewareRef], terminal: Handler) -> Handler {
    middleware
        .iter()
        .rev()
        .fold(terminal, |next, layer| layer.wrap(next))
}
