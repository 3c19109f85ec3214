//! # convroute
//!
//! **convroute** is a convention-driven HTTP routing layer for Rust, served by
//! `may` coroutines and `may_minihttp`.
//!
//! A controller method named `HandleGetUserById` on `UserController` becomes
//! `GET /user/:id`. There are no route declarations: the name carries the
//! method and path, and the same metadata drives the live server, the API
//! document and a generated route listing.
//!
//! ## Architecture
//!
//! - **[`convention`]** - handler identifier to `(method, path)`
//! - **[`router`]** - route table and the radix matcher used per request
//! - **[`pipeline`]** - handler and middleware contracts, onion composition
//! - **[`dispatcher`]** - lock-free binding table, request execution
//! - **[`controller`]** - controllers, groups and the registrar
//! - **[`app`]** - `RoutingContext` and `Application`
//! - **[`schema`]** - structural type descriptions and schema generation
//! - **[`openapi`]** - API document built from the route table
//! - **[`generator`]** - route listing source file
//! - **[`middleware`]** - recover, logging, timeout, auth, CORS, rate limiting, metrics
//! - **[`server`]** - `may_minihttp` adapter and built-in endpoints
//!
//! ### Request flow
//!
//! ```text
//! TCP -> AppService -> built-in endpoint?
//!                   -> Dispatcher -> Router match -> global middleware
//!                      -> controller middleware -> handler -> HandlerResponse
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use convroute::prelude::*;
//! use serde_json::json;
//!
//! struct HelloController;
//!
//! #[controller]
//! impl HelloController {
//!     // GET /hello
//!     fn handle_get(&self, ctx: &mut RequestContext) -> HandlerResult {
//!         ctx.ok(&json!({ "message": "Hello" }))
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     convroute::logging::init_logging(&LogConfig::from_env())?;
//!     let app = Application::new(AppConfig::from_env());
//!     app.register_controller(Arc::new(HelloController));
//!     let server = app.start()?;
//!     server.join().ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Handlers return [`ApiError`] for anything that should reach the client.
//! Every error renders as `{"message", "status", "code"?, "details"?}` with
//! its status code; a panic becomes a 500 when the recover middleware is
//! installed, which [`Application::new`] does.

extern crate self as convroute;

pub mod app;
pub mod auth;
pub mod config;
pub mod context;
pub mod controller;
pub mod convention;
pub mod dispatcher;
pub mod error;
pub mod generator;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod openapi;
pub mod pipeline;
pub mod router;
pub mod schema;
pub mod server;

pub use app::{Application, RoutingContext};
pub use config::AppConfig;
pub use context::{HandlerResponse, IncomingRequest, RequestContext};
pub use controller::{Controller, ControllerDescriptor, ControllerGroup, Operation};
pub use convroute_macros::{controller, Describe};
pub use error::{ApiError, ErrorKind, FieldError, RouteError};
pub use pipeline::{Handler, HandlerResult, Middleware, MiddlewareRef};

/// The common imports for writing controllers and wiring an application.
pub mod prelude {
    pub use crate::app::{Application, RoutingContext};
    pub use crate::config::AppConfig;
    pub use crate::context::{IncomingRequest, RequestContext};
    pub use crate::controller::{Controller, ControllerGroup, Operation};
    pub use crate::error::{ApiError, FieldError};
    pub use crate::logging::LogConfig;
    pub use crate::pipeline::{handler_fn, middleware_fn, Handler, HandlerResult, MiddlewareRef};
    pub use crate::schema::Describe;
    pub use convroute_macros::{controller, Describe};
}
