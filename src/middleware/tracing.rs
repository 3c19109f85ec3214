use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, info_span, warn};

use crate::context::RequestContext;
use crate::pipeline::{Handler, Middleware};

/// Request logger.
///
/// Runs the inner chain inside a `request` span and emits one event per
/// request with method, path, status, latency and request id. Server errors
/// are logged at `error`, client errors at `warn`, everything else at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        Arc::new(move |ctx: &mut RequestContext| {
            let start = Instant::now();
            let span = info_span!(
                "request",
                method = %ctx.method(),
                path = %ctx.path(),
                request_id = %ctx.request_id()
            );
            let result = span.in_scope(|| next(ctx));
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

            let status = match &result {
                Err(err) if !ctx.is_written() => err.status(),
                _ => ctx.response().status,
            };
            let route = ctx.route().map(|r| r.owner.as_str()).unwrap_or("-");

            match &result {
                Err(err) => error!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    route,
                    status,
                    latency_ms,
                    request_id = %ctx.request_id(),
                    error = %err,
                    "Request failed"
                ),
                Ok(()) if status >= 500 => error!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    route,
                    status,
                    latency_ms,
                    request_id = %ctx.request_id(),
                    "Request completed"
                ),
                Ok(()) if status >= 400 => warn!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    route,
                    status,
                    latency_ms,
                    request_id = %ctx.request_id(),
                    "Request completed"
                ),
                Ok(()) => info!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    route,
                    status,
                    latency_ms,
                    request_id = %ctx.request_id(),
                    "Request completed"
                ),
            }
            result
        })
    }

    fn name(&self) -> &str {
        "logger"
    }
}
