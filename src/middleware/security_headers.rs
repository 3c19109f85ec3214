use std::sync::Arc;

use crate::context::RequestContext;
use crate::pipeline::{handler_fn, middleware_fn, Handler, Middleware, MiddlewareRef};

const DEFAULT_CSP: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
style-src 'self' 'unsafe-inline'; img-src 'self' data:; font-src 'self'; connect-src 'self'";

/// Hardening headers on every response.
///
/// `Strict-Transport-Security` is only sent when the request arrived over
/// TLS, as reported by `X-Forwarded-Proto: https` from the fronting proxy.
#[derive(Debug, Clone)]
pub struct SecurityHeadersMiddleware {
    content_security_policy: Arc<str>,
}

impl Default for SecurityHeadersMiddleware {
    fn default() -> Self {
        Self {
            content_security_policy: Arc::from(DEFAULT_CSP),
        }
    }
}

impl SecurityHeadersMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_security_policy(mut self, policy: &str) -> Self {
        self.content_security_policy = Arc::from(policy);
        self
    }
}

impl Middleware for SecurityHeadersMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let csp = Arc::clone(&self.content_security_policy);
        Arc::new(move |ctx: &mut RequestContext| {
            ctx.set_header("x-xss-protection", "1; mode=block")
                .set_header("x-content-type-options", "nosniff")
                .set_header("x-frame-options", "DENY")
                .set_header("referrer-policy", "strict-origin-when-cross-origin")
                .set_header("content-security-policy", csp.to_string())
                .set_header(
                    "permissions-policy",
                    "camera=(), microphone=(), geolocation=(), interest-cohort=()",
                );
            let tls = ctx
                .header("x-forwarded-proto")
                .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
            if tls {
                ctx.set_header(
                    "strict-transport-security",
                    "max-age=31536000; includeSubDomains; preload",
                );
            }
            next(ctx)
        })
    }

    fn name(&self) -> &str {
        "security_headers"
    }
}

/// `Cache-Control: public, max-age=<seconds>`.
pub fn cache_control(max_age: u64) -> MiddlewareRef {
    let value = format!("public, max-age={max_age}");
    middleware_fn("cache_control", move |next: Handler| {
        let value = value.clone();
        handler_fn(move |ctx: &mut RequestContext| {
            ctx.set_header("cache-control", value.clone());
            next(ctx)
        })
    })
}

/// Disable caching by clients and intermediaries.
pub fn no_cache() -> MiddlewareRef {
    middleware_fn("no_cache", |next: Handler| {
        handler_fn(move |ctx: &mut RequestContext| {
            ctx.set_header("cache-control", "no-store, no-cache, must-revalidate, proxy-revalidate")
                .set_header("pragma", "no-cache")
                .set_header("expires", "0");
            next(ctx)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IncomingRequest;
    use crate::pipeline::compose;
    use http::Method;

    fn run(layers: &[MiddlewareRef], req: IncomingRequest) -> RequestContext {
        let handler = compose(layers, handler_fn(|ctx: &mut RequestContext| ctx.ok(&"x")));
        let mut ctx = RequestContext::detached(req);
        handler(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn test_hardening_headers() {
        let ctx = run(
            &[Arc::new(SecurityHeadersMiddleware::new()) as MiddlewareRef],
            IncomingRequest::new(Method::GET, "/"),
        );
        let response = ctx.response();
        assert_eq!(response.header("X-Frame-Options"), Some("DENY"));
        assert_eq!(response.header("X-Content-Type-Options"), Some("nosniff"));
        assert!(response.header("Content-Security-Policy").is_some());
        assert!(response.header("Strict-Transport-Security").is_none());

        let ctx = run(
            &[Arc::new(SecurityHeadersMiddleware::new().content_security_policy("default-src 'none'"))
                as MiddlewareRef],
            IncomingRequest::new(Method::GET, "/").with_header("X-Forwarded-Proto", "https"),
        );
        assert_eq!(
            ctx.response().header("content-security-policy"),
            Some("default-src 'none'")
        );
        assert!(ctx.response().header("strict-transport-security").is_some());
    }

    #[test]
    fn test_cache_headers() {
        let ctx = run(&[cache_control(300)], IncomingRequest::new(Method::GET, "/"));
        assert_eq!(ctx.response().header("cache-control"), Some("public, max-age=300"));

        let ctx = run(&[no_cache()], IncomingRequest::new(Method::GET, "/"));
        assert_eq!(ctx.response().header("pragma"), Some("no-cache"));
    }
}
