//! # Router Module
//!
//! Two halves:
//!
//! - [`RouteTable`]: the authoritative list of registered routes and their
//!   metadata (owner, description, name, request/response shapes). It is what
//!   the API document generator and the route listing read.
//! - [`Router`]: a radix tree used on the request hot path to match
//!   `(method, path)` to a [`RouteKey`] and extract `:param` segments.
//!
//! ## Matching
//!
//! Paths are split on `/`. Static segments match exactly and win over
//! parameter segments (`:id`) at the same depth; the tree backtracks when a
//! static branch dead-ends. A path that exists for some other method yields
//! [`RouteLookup::MethodNotAllowed`] with the allowed set, so the dispatcher can
//! answer 405 with an `Allow` header instead of 404.
//!
//! ```rust
//! use convroute::router::{RouteKey, RouteLookup, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(RouteKey::new(Method::GET, "/user/:id"));
//!
//! match router.route(&Method::GET, "/user/42") {
//!     RouteLookup::Found { key, params } => {
//!         assert_eq!(key.path, "/user/:id");
//!         assert_eq!(params[0].1, "42");
//!     }
//!     _ => unreachable!(),
//! }
//! ```

mod core;
mod table;

pub use core::{ParamVec, RouteLookup, Router, MAX_INLINE_PARAMS};
pub use table::{Route, RouteKey, RouteTable};
