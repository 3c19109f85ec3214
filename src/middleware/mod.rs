//! # Middleware Module
//!
//! Stock middleware built on the [`Middleware`](crate::pipeline::Middleware)
//! contract. Each type wraps the next handler in the chain and may act before
//! it, after it, or instead of it.
//!
//! | Middleware | Effect |
//! |---|---|
//! | [`RecoverMiddleware`] | Turns a panic anywhere inside it into a 500 |
//! | [`TracingMiddleware`] | Logs method, path, status and latency |
//! | [`TimeoutMiddleware`] | Answers 408 when the inner chain overruns its budget |
//! | [`RequestIdMiddleware`] | Echoes the request id as `X-Request-Id` |
//! | [`AuthMiddleware`] | Requires a valid bearer token |
//! | [`RoleMiddleware`] | Requires a `role` claim from an allowed set |
//! | [`CorsMiddleware`] | Adds `Access-Control-*` headers, answers preflight |
//! | [`RateLimitMiddleware`] | Sliding-window limit per client |
//! | [`MetricsMiddleware`] | Request counters rendered as Prometheus text |
//! | [`SecurityHeadersMiddleware`] | Hardening headers on every response |
//!
//! `Application::new` installs recover, logger, request id and security
//! headers. When assembling a `RoutingContext` by hand, put
//! [`RecoverMiddleware`] first so it is the outermost layer:
//!
//! ```rust,ignore
//! routing.use_middleware(Arc::new(RecoverMiddleware));
//! routing.use_middleware(Arc::new(TracingMiddleware));
//! routing.use_middleware(Arc::new(CorsMiddleware::default()));
//! ```

mod auth;
mod cors;
mod metrics;
mod rate_limit;
mod recover;
mod request_id;
mod security_headers;
mod timeout;
mod tracing;

pub use auth::{AuthMiddleware, RoleMiddleware};
pub use cors::CorsMiddleware;
pub use metrics::MetricsMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use recover::RecoverMiddleware;
pub use request_id::RequestIdMiddleware;
pub use security_headers::{cache_control, no_cache, SecurityHeadersMiddleware};
pub use timeout::TimeoutMiddleware;
pub use self::tracing::TracingMiddleware;
