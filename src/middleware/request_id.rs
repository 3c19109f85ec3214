use std::sync::Arc;

use crate::context::RequestContext;
use crate::ids::REQUEST_ID_HEADER;
use crate::pipeline::{Handler, Middleware};

/// Echoes the request id on the response.
///
/// The id itself is fixed when the context is created: an inbound
/// `X-Request-Id` holding a valid ULID is kept, anything else is replaced by
/// a fresh one.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdMiddleware;

impl Middleware for RequestIdMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        Arc::new(move |ctx: &mut RequestContext| {
            let id = ctx.request_id().to_string();
            ctx.set_header(REQUEST_ID_HEADER, id);
            next(ctx)
        })
    }

    fn name(&self) -> &str {
        "request_id"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IncomingRequest;
    use crate::error::ApiError;
    use crate::ids::RequestId;
    use crate::pipeline::{compose, handler_fn, MiddlewareRef};
    use http::Method;

    #[test]
    fn test_inbound_id_is_echoed_even_on_error() {
        let id = RequestId::new();
        let chain = compose(
            &[Arc::new(RequestIdMiddleware) as MiddlewareRef],
            handler_fn(|_ctx: &mut RequestContext| Err(ApiError::bad_request("no"))),
        );
        let req = IncomingRequest::new(Method::GET, "/").with_header("X-Request-Id", id.to_string());
        let mut ctx = RequestContext::detached(req);
        let result = chain(&mut ctx);
        let response = ctx.finish(result);
        assert_eq!(response.status, 400);
        assert_eq!(response.header("x-request-id"), Some(id.to_string().as_str()));
    }

    #[test]
    fn test_garbage_id_is_replaced() {
        let chain = compose(
            &[Arc::new(RequestIdMiddleware) as MiddlewareRef],
            handler_fn(|ctx: &mut RequestContext| ctx.no_content()),
        );
        let req = IncomingRequest::new(Method::GET, "/").with_header("X-Request-Id", "not-a-ulid");
        let mut ctx = RequestContext::detached(req);
        chain(&mut ctx).unwrap();
        let echoed = ctx.response().header("x-request-id").unwrap();
        assert_ne!(echoed, "not-a-ulid");
        assert!(echoed.parse::<RequestId>().is_ok());
    }
}
