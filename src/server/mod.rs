//! # Server Module
//!
//! Transport adapter over `may_minihttp`.
//!
//! [`AppService`] implements `HttpService`: it converts each raw request into
//! an [`IncomingRequest`](crate::context::IncomingRequest), answers the
//! built-in endpoints, strips the configured base path, and hands the rest to
//! the dispatcher. [`HttpServer`] binds a listener and returns a
//! [`ServerHandle`] for readiness checks and shutdown.
//!
//! ## Built-in endpoints
//!
//! | Path | Response |
//! |------|----------|
//! | `/health` | `{"status": "ok"}` |
//! | `/metrics` | Prometheus text, when metrics are enabled |
//! | `docs.openapi_path` | API document as JSON |
//! | same path with `.yaml` | API document as YAML |
//! | `docs.ui_path` | Swagger UI page |
//!
//! Built-in endpoints do not pass through middleware.
//!
//! ```rust,ignore
//! let service = AppService::new(Arc::clone(app.routing()));
//! let handle = HttpServer(service).start("127.0.0.1:3000")?;
//! handle.wait_ready()?;
//! ```

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, strip_base_path};
pub use response::{write_response, MAX_INTERNED_HEADERS, MAX_RESPONSE_HEADERS};
pub use service::{health_endpoint, metrics_endpoint, AppService, HEALTH_PATH, METRICS_PATH};
