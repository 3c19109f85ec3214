//! # Dispatcher Module
//!
//! Binds registered routes to composed handler chains and executes requests
//! against them.
//!
//! ## Overview
//!
//! For each bound route the dispatcher stores two handlers:
//!
//! - the route chain: the controller's middleware composed around the
//!   terminal handler, and
//! - the entry chain: the global middleware composed around the route chain.
//!
//! Adding global middleware recomposes every entry chain, so it applies to
//! routes bound before and after the call.
//!
//! ## Request Flow
//!
//! 1. The router matches method and path to a route key and path parameters
//! 2. A fresh [`RequestContext`](crate::context::RequestContext) is built with
//!    the parameters and the route binding
//! 3. The entry chain runs
//! 4. The outcome is finished into a response: an error becomes its
//!    structured body unless a middleware already wrote a response
//!
//! Unmatched requests still run through the global middleware, so logging,
//! CORS and request ids behave the same for 404 and 405 answers.
//!
//! ## Concurrency
//!
//! The binding table is published through `ArcSwap`. Requests never take a
//! lock; registration takes a writer mutex and swaps in a modified copy.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new();
//! dispatcher.bind(
//!     RouteKey::new(Method::GET, "/hello"),
//!     "HelloController.HandleGetHello",
//!     &[],
//!     handler_fn(|ctx| ctx.ok(&json!({ "message": "Hello" }))),
//! );
//! let response = dispatcher.dispatch(IncomingRequest::new(Method::GET, "/hello"), services);
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::Dispatcher;
