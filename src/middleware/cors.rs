use std::sync::Arc;

use http::Method;

use crate::context::RequestContext;
use crate::pipeline::{Handler, Middleware};

/// CORS (Cross-Origin Resource Sharing) middleware
///
/// Sets the `Access-Control-Allow-*` headers on every response and answers
/// preflight `OPTIONS` requests with 204 without running the inner chain.
///
/// With a wildcard origin list the header is `*`. Otherwise the request's
/// `Origin` is echoed back when it is in the list (plus `Vary: Origin`) and
/// omitted when it is not.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    inner: Arc<CorsPolicy>,
}

#[derive(Debug, Clone)]
struct CorsPolicy {
    allowed_origins: Vec<String>,
    allowed_methods: String,
    allowed_headers: String,
    allow_credentials: bool,
    max_age: Option<u64>,
}

impl CorsMiddleware {
    /// Create a CORS middleware with specific configuration
    ///
    /// # Arguments
    ///
    /// * `allowed_origins` - e.g. `["https://example.com"]`, or `["*"]`
    /// * `allowed_headers` - e.g. `["Content-Type", "Authorization"]`
    /// * `allowed_methods` - methods advertised in preflight responses
    pub fn new(
        allowed_origins: Vec<String>,
        allowed_headers: Vec<String>,
        allowed_methods: Vec<Method>,
    ) -> Self {
        Self {
            inner: Arc::new(CorsPolicy {
                allowed_origins,
                allowed_methods: allowed_methods
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                allowed_headers: allowed_headers.join(","),
                allow_credentials: false,
                max_age: None,
            }),
        }
    }

    pub fn allow_credentials(self, allow: bool) -> Self {
        self.with_policy(|p| p.allow_credentials = allow)
    }

    /// Preflight cache lifetime in seconds.
    pub fn max_age(self, seconds: u64) -> Self {
        self.with_policy(|p| p.max_age = Some(seconds))
    }

    fn with_policy(self, f: impl FnOnce(&mut CorsPolicy)) -> Self {
        let mut policy = Arc::unwrap_or_clone(self.inner);
        f(&mut policy);
        Self {
            inner: Arc::new(policy),
        }
    }
}

/// Permissive policy: any origin, the common methods, and the usual request headers.
impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new(
            vec!["*".into()],
            vec![
                "Origin".into(),
                "Content-Type".into(),
                "Accept".into(),
                "Authorization".into(),
            ],
            vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::OPTIONS,
            ],
        )
    }
}

impl CorsPolicy {
    fn allow_origin(&self, request_origin: Option<&str>) -> Option<String> {
        if self.allowed_origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        let origin = request_origin?;
        self.allowed_origins
            .iter()
            .any(|o| o.eq_ignore_ascii_case(origin))
            .then(|| origin.to_string())
    }

    fn apply(&self, ctx: &mut RequestContext) {
        let origin = self.allow_origin(ctx.header("origin"));
        if let Some(origin) = origin {
            if origin != "*" {
                ctx.set_header("vary", "Origin");
            }
            ctx.set_header("access-control-allow-origin", origin);
        }
        ctx.set_header("access-control-allow-methods", self.allowed_methods.clone());
        ctx.set_header("access-control-allow-headers", self.allowed_headers.clone());
        if self.allow_credentials {
            ctx.set_header("access-control-allow-credentials", "true");
        }
        if let Some(max_age) = self.max_age {
            ctx.set_header("access-control-max-age", max_age.to_string());
        }
    }
}

impl Middleware for CorsMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let policy = Arc::clone(&self.inner);
        Arc::new(move |ctx: &mut RequestContext| {
            policy.apply(ctx);
            if ctx.method() == Method::OPTIONS {
                return ctx.no_content();
            }
            next(ctx)
        })
    }

    fn name(&self) -> &str {
        "cors"
    }
}
