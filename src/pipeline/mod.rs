//! # Pipeline Module
//!
//! Handlers and the middleware that wraps them.
//!
//! A [`Handler`] takes the request context and either writes a response or
//! returns an [`ApiError`](crate::error::ApiError). A [`Middleware`] turns one
//! handler into another; [`compose`] folds a list of them around a terminal
//! handler so the first entry is the outermost layer:
//!
//! ```text
//! compose([A, B], T)  ==  A(B(T))
//!
//! A before -> B before -> T -> B after -> A after
//! ```
//!
//! A middleware short-circuits by returning without calling `next`.

mod core;

pub use core::{
    compose, handler_fn, middleware_fn, FnMiddleware, Handler, HandlerResult, Middleware,
    MiddlewareRef,
};
