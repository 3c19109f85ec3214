use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Method;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::context::{AppServices, HandlerResponse, IncomingRequest, RequestContext, RouteBinding};
use crate::error::ApiError;
use crate::pipeline::{compose, handler_fn, Handler, MiddlewareRef};
use crate::router::{RouteKey, RouteLookup, Router};

/// A bound route: the composed handler chain plus what the context needs to know about it.
#[derive(Clone)]
struct Endpoint {
    /// Route-level middleware composed around the terminal handler.
    handler: Handler,
    /// `handler` with the global middleware around it; what requests enter.
    entry: Handler,
    binding: Arc<RouteBinding>,
    layers: usize,
}

/// Immutable snapshot read by every request.
#[derive(Clone, Default)]
struct DispatchTable {
    router: Router,
    endpoints: HashMap<RouteKey, Endpoint>,
    global: Vec<MiddlewareRef>,
}

/// Binds route keys to composed handler chains and runs requests through them.
///
/// Reads are lock-free: each request loads the current [`DispatchTable`]
/// snapshot. Writers serialize on a mutex, copy the table, modify the copy and
/// publish it, so a request always sees either the old or the new binding.
pub struct Dispatcher {
    table: ArcSwap<DispatchTable>,
    writer: Mutex<()>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(DispatchTable::default()),
            writer: Mutex::new(()),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut DispatchTable) -> R) -> R {
        let _guard = self.writer.lock();
        let mut next = DispatchTable::clone(&self.table.load());
        let out = f(&mut next);
        self.table.store(Arc::new(next));
        out
    }

    /// Bind `key` to `terminal` wrapped in `middleware` (index 0 outermost).
    ///
    /// Global middleware is applied around the result. Rebinding an existing
    /// key replaces it.
    pub fn bind(
        &self,
        key: RouteKey,
        owner: &str,
        middleware: &[MiddlewareRef],
        terminal: Handler,
    ) {
        let handler = compose(middleware, terminal);
        let binding = Arc::new(RouteBinding {
            key: key.clone(),
            owner: owner.to_string(),
        });
        let replaced = self.update(|table| {
            let entry = compose(&table.global, Arc::clone(&handler));
            table.router.insert(key.clone());
            table
                .endpoints
                .insert(
                    key.clone(),
                    Endpoint {
                        handler,
                        entry,
                        binding,
                        layers: middleware.len(),
                    },
                )
                .map(|old| old.binding.owner.clone())
        });
        match replaced {
            Some(previous) => debug!(
                route = %key,
                previous_owner = %previous,
                owner = %owner,
                "Route rebound"
            ),
            None => debug!(
                route = %key,
                owner = %owner,
                middleware = middleware.len(),
                "Route bound"
            ),
        }
    }

    /// Remove a binding. Returns whether one existed.
    pub fn unbind(&self, key: &RouteKey) -> bool {
        let removed = self.update(|table| {
            table.router.remove(key);
            table.endpoints.remove(key).is_some()
        });
        if removed {
            info!(route = %key, "Route unbound");
        }
        removed
    }

    /// Append a middleware that wraps every route, including 404/405 answers.
    ///
    /// Existing bindings are recomposed.
    pub fn use_middleware(&self, middleware: MiddlewareRef) {
        let name = middleware.name().to_string();
        let count = self.update(|table| {
            table.global.push(middleware);
            let global = table.global.clone();
            for endpoint in table.endpoints.values_mut() {
                endpoint.entry = compose(&global, Arc::clone(&endpoint.handler));
            }
            table.global.len()
        });
        debug!(middleware = %name, global_middleware = count, "Global middleware added");
    }

    pub fn endpoint_count(&self) -> usize {
        self.table.load().endpoints.len()
    }

    pub fn global_middleware_count(&self) -> usize {
        self.table.load().global.len()
    }

    /// Number of route-level layers bound for `key`.
    pub fn middleware_depth(&self, key: &RouteKey) -> Option<usize> {
        self.table.load().endpoints.get(key).map(|e| e.layers)
    }

    pub fn is_bound(&self, key: &RouteKey) -> bool {
        self.table.load().endpoints.contains_key(key)
    }

    pub fn lookup(&self, method: &Method, path: &str) -> RouteLookup {
        self.table.load().router.route(method, path)
    }

    /// Run one request to completion.
    ///
    /// Matched routes run their chain; a path known for other methods answers
    /// 405 with `Allow` (204 for `OPTIONS`); anything else is 404. Misses
    /// still pass through the global middleware.
    pub fn dispatch(&self, request: IncomingRequest, services: Arc<AppServices>) -> HandlerResponse {
        let mut request = request;
        let table = self.table.load_full();
        match table.router.route(&request.method, &request.path) {
            RouteLookup::Found { key, params } => {
                let Some(endpoint) = table.endpoints.get(&key) else {
                    error!(route = %key, "Router matched a route with no binding");
                    return ApiError::internal("Internal Server Error").into_response();
                };
                request.path_params = params;
                let entry = Arc::clone(&endpoint.entry);
                let mut ctx = RequestContext::new(request, services, Some(Arc::clone(&endpoint.binding)));
                drop(table);
                debug!(
                    request_id = %ctx.request_id(),
                    route = %key,
                    owner = %endpoint_owner(&ctx),
                    "Dispatching request"
                );
                let result = entry(&mut ctx);
                ctx.finish(result)
            }
            RouteLookup::MethodNotAllowed { allowed } => {
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                let preflight = request.method == Method::OPTIONS;
                debug!(method = %request.method, path = %request.path, allow = %allow, "Method not allowed");
                let terminal = if preflight {
                    handler_fn(move |ctx: &mut RequestContext| {
                        ctx.set_header("allow", allow.clone());
                        ctx.no_content()
                    })
                } else {
                    handler_fn(move |_ctx: &mut RequestContext| {
                        Err(ApiError::method_not_allowed("Method Not Allowed")
                            .with_header("Allow", allow.clone()))
                    })
                };
                run_global(&table.global, terminal, request, services)
            }
            RouteLookup::NotFound => {
                debug!(method = %request.method, path = %request.path, "No route");
                let terminal = handler_fn(|_ctx: &mut RequestContext| Err(ApiError::not_found("Not Found")));
                run_global(&table.global, terminal, request, services)
            }
        }
    }
}

fn endpoint_owner(ctx: &RequestContext) -> &str {
    ctx.route().map(|r| r.owner.as_str()).unwrap_or("-")
}

fn run_global(
    global: &[MiddlewareRef],
    terminal: Handler,
    request: IncomingRequest,
    services: Arc<AppServices>,
) -> HandlerResponse {
    let chain = compose(global, terminal);
    let mut ctx = RequestContext::new(request, services, None);
    let result = chain(&mut ctx);
    ctx.finish(result)
}
