//! # Context Module
//!
//! Per-request state handed to handlers and middleware.
//!
//! [`RequestContext`] bundles the parsed [`IncomingRequest`], the response
//! being built, request-scoped locals (the authenticated user, claims, ...),
//! and the shared [`AppServices`]. Contexts are created by the dispatcher for
//! each request and dropped when the response has been produced.
//!
//! ## Body binding
//!
//! ```rust,ignore
//! #[derive(Deserialize, Validate)]
//! struct CreateUser {
//!     #[validate(email)]
//!     email: String,
//! }
//!
//! fn handle_post(&self, ctx: &mut RequestContext) -> HandlerResult {
//!     let input: CreateUser = ctx.bind_and_validate()?;
//!     ctx.created(&input.email)
//! }
//! ```
//!
//! A malformed body yields 400; validation failures yield 422 with one
//! message per failing field under `details`.

mod core;
mod services;
mod validation;

pub use core::{
    HandlerResponse, HeaderVec, IncomingRequest, RequestContext, ResponseBody, RouteBinding,
    MAX_INLINE_HEADERS,
};
pub use services::AppServices;
pub use validation::{validation_error, validation_message};
