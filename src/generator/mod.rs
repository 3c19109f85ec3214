//! # Generator Module
//!
//! Regenerates a Rust source listing of every registered route, for tooling
//! that wants a static view of what the convention engine produced.
//!
//! ## Output
//!
//! `write_route_file` renders the route table through a minijinja template
//! and writes `<dir>/routes.rs`:
//!
//! ```text
//! pub static ROUTES: &[RouteEntry] = &[
//!     RouteEntry {
//!         method: "GET",
//!         path: "/user/:id",
//!         owner: "UserController.HandleGetUserById",
//!         description: "Get a specific user by ID",
//!         name: Some("HandleGetUserById"),
//!     },
//! ];
//! ```
//!
//! The file is written to a temporary sibling first and renamed into place,
//! so readers never observe a half-written listing.
//!
//! When `routes_file.enabled` is set in the configuration, the routing context
//! calls this after every registration. Failures are logged and never abort
//! registration.

mod routes;

pub use routes::{render_route_listing, write_route_file, ROUTES_FILE_NAME};
