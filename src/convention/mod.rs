//! # Convention Module
//!
//! Turns handler identifiers into routes. A controller method called
//! `HandleGetUserById` on `UserController` becomes `GET /user/:id` without any
//! route annotation.
//!
//! ## Rules
//!
//! 1. The identifier must start with `Handle`; anything else is not a handler.
//! 2. The first verb prefix (`Get`, `Post`, `Put`, `Delete`, `Patch`, `Options`,
//!    `Head`) selects the HTTP method. No verb means `GET`.
//! 3. The rest is split at every upper-case letter and lower-cased with `-`
//!    separators (`UserPosts` becomes `user-posts`).
//! 4. An empty action or `index` maps to the controller base path, an action
//!    containing `by-id` maps to `<base>/:id`, and anything else to
//!    `<base>/<action>`.
//!
//! The controller base path is the type name with its `Controller` suffix
//! removed, lower-cased, and prefixed with `/`.
//!
//! ```rust
//! use convroute::convention::parse_handler_name;
//! use http::Method;
//!
//! let info = parse_handler_name("HandleGetUserById", "/user").unwrap();
//! assert_eq!(info.method, Method::GET);
//! assert_eq!(info.path, "/user/:id");
//! ```
//!
//! Parsing is pure: the same inputs always yield the same route.

mod core;

pub use core::{
    controller_base_path, describe_handler, join_paths, normalize_path, parse_handler_name,
    split_camel_case, RouteInfo, HANDLER_PREFIX, HTTP_VERBS,
};
